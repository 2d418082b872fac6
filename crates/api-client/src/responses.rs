use crate::error::ApiError;
use chrono::{DateTime, TimeZone, Utc};
use core_types::{Asset, MarketSnapshot};
use serde::Deserialize;
use std::collections::BTreeMap;

/// One historical observation as delivered by the API, before normalization.
///
/// Any value may be missing; the fetcher decides what to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    pub price: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
}

/// A `[timestamp_ms, value]` pair. CoinGecko sends `null` for missing values.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChartPoint(pub f64, pub Option<f64>);

/// The response from `GET /coins/{id}/market_chart/range`.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartResponse {
    pub prices: Vec<ChartPoint>,
    #[serde(default)]
    pub market_caps: Vec<ChartPoint>,
    #[serde(default)]
    pub total_volumes: Vec<ChartPoint>,
}

impl MarketChartResponse {
    /// Joins the three parallel arrays on their timestamps.
    ///
    /// The price array drives the output: a volume or market-cap point with no
    /// matching price is ignored, and a price with no matching point gets `None`.
    pub fn into_records(self) -> Result<Vec<RawRecord>, ApiError> {
        let volumes: BTreeMap<i64, Option<f64>> = self
            .total_volumes
            .iter()
            .map(|p| (p.0.round() as i64, p.1))
            .collect();
        let market_caps: BTreeMap<i64, Option<f64>> = self
            .market_caps
            .iter()
            .map(|p| (p.0.round() as i64, p.1))
            .collect();

        self.prices
            .iter()
            .map(|point| {
                let millis = point.0.round() as i64;
                let timestamp = Utc
                    .timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| ApiError::InvalidData(format!("Invalid timestamp: {}", point.0)))?;
                Ok(RawRecord {
                    timestamp,
                    price: point.1,
                    volume: volumes.get(&millis).copied().flatten(),
                    market_cap: market_caps.get(&millis).copied().flatten(),
                })
            })
            .collect()
    }
}

/// A single coin from `GET /coins/markets`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarketResponse {
    pub id: String,
    pub current_price: Option<f64>,
    pub total_volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl CoinMarketResponse {
    pub fn into_snapshot(self, asset: Asset, now: DateTime<Utc>) -> Result<MarketSnapshot, ApiError> {
        let price = self
            .current_price
            .ok_or_else(|| ApiError::InvalidData(format!("No current price for {}", self.id)))?;

        Ok(MarketSnapshot {
            asset,
            observed_at: self.last_updated.unwrap_or(now),
            price,
            volume_24h: self.total_volume,
            market_cap: self.market_cap,
            price_change_pct_24h: self.price_change_percentage_24h,
            high_24h: self.high_24h,
            low_24h: self.low_24h,
        })
    }
}

/// Represents an error body from the API. Two shapes are in use:
/// `{"error": "coin not found"}` and
/// `{"status": {"error_code": 429, "error_message": "..."}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    pub error: Option<String>,
    pub status: Option<ErrorStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorStatus {
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

impl ApiErrorResponse {
    pub fn message(&self) -> Option<String> {
        self.error.clone().or_else(|| {
            self.status
                .as_ref()
                .and_then(|s| s.error_message.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_arrays_are_joined_by_timestamp() {
        let body = r#"{
            "prices": [[1704067200000, 42000.5], [1704153600000, null], [1704240000000, 43000.0]],
            "market_caps": [[1704067200000, 8.2e11], [1704240000000, 8.4e11]],
            "total_volumes": [[1704067200000, 1.5e10], [1704153600000, 1.6e10]]
        }"#;
        let response: MarketChartResponse = serde_json::from_str(body).unwrap();
        let records = response.into_records().unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].price, Some(42000.5));
        assert_eq!(records[0].volume, Some(1.5e10));
        assert_eq!(records[0].market_cap, Some(8.2e11));
        assert_eq!(records[1].price, None);
        assert_eq!(records[1].market_cap, None);
        assert_eq!(records[2].volume, None);
        assert_eq!(records[2].timestamp.to_rfc3339(), "2024-01-03T00:00:00+00:00");
    }

    #[test]
    fn missing_volume_arrays_are_tolerated() {
        let response: MarketChartResponse =
            serde_json::from_str(r#"{"prices": [[1704067200000, 1.0]]}"#).unwrap();
        let records = response.into_records().unwrap();
        assert_eq!(records[0].volume, None);
    }

    #[test]
    fn error_message_is_read_from_either_shape() {
        let flat: ApiErrorResponse = serde_json::from_str(r#"{"error":"coin not found"}"#).unwrap();
        assert_eq!(flat.message().as_deref(), Some("coin not found"));

        let nested: ApiErrorResponse = serde_json::from_str(
            r#"{"status":{"error_code":10012,"error_message":"Your request exceeds the allowed time range."}}"#,
        )
        .unwrap();
        assert_eq!(
            nested.message().as_deref(),
            Some("Your request exceeds the allowed time range.")
        );
    }

    #[test]
    fn snapshot_requires_a_price() {
        let coin: CoinMarketResponse = serde_json::from_str(
            r#"{"id":"bitcoin","current_price":null,"total_volume":1.0,"market_cap":2.0,
                "price_change_percentage_24h":0.5,"high_24h":null,"low_24h":null,"last_updated":null}"#,
        )
        .unwrap();
        assert!(matches!(
            coin.into_snapshot(Asset::Bitcoin, Utc::now()),
            Err(ApiError::InvalidData(_))
        ));
    }
}
