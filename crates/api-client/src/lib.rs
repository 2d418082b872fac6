use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configuration::ApiSettings;
use core_types::{Asset, MarketSnapshot};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

mod auth;
pub mod error;
pub mod responses;
// --- Public API ---
pub use responses::{ApiErrorResponse, CoinMarketResponse, MarketChartResponse, RawRecord};

/// The abstract interface to a historical market-data provider.
///
/// Every method performs exactly one request attempt and reports a classified
/// `ApiError` on failure. Retrying and pagination are the caller's concern,
/// which keeps implementations trivial to fake in tests.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches every observation for `asset` between `start` and `end` inclusive.
    async fn fetch_range(
        &self,
        asset: Asset,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawRecord>, ApiError>;

    /// Fetches the current price, volume and market cap for `asset`.
    async fn fetch_snapshot(&self, asset: Asset) -> Result<MarketSnapshot, ApiError>;
}

// Lets a caller lend a source to a `Fetcher` and keep inspecting it afterwards.
#[async_trait]
impl<T: MarketDataSource + ?Sized> MarketDataSource for &T {
    async fn fetch_range(
        &self,
        asset: Asset,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawRecord>, ApiError> {
        (**self).fetch_range(asset, start, end).await
    }

    async fn fetch_snapshot(&self, asset: Asset) -> Result<MarketSnapshot, ApiError> {
        (**self).fetch_snapshot(asset).await
    }
}

/// A concrete implementation of `MarketDataSource` for the CoinGecko API.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
    vs_currency: String,
}

impl CoinGeckoClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let headers = auth::auth_headers(settings.plan, settings.api_key.as_deref())?;
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| auth::default_base_url(settings.plan).to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .user_agent(concat!("cryptopair/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            vs_currency: settings.vs_currency.to_lowercase(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, ?query, "Sending request");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let text = response.text().await?;

        check_status(status, retry_after, &text)?;
        serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Maps a non-success response onto the error taxonomy used by the retry loop.
///
/// 429 is a rate limit, 5xx is transient, any other 4xx is a permanent
/// rejection that must not be retried.
pub fn check_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimited { retry_after });
    }
    if status.is_server_error() {
        return Err(ApiError::Server {
            status: status.as_u16(),
            body: truncate(body, 200),
        });
    }

    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|e| e.message())
        .unwrap_or_else(|| truncate(body, 200));
    Err(ApiError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Parses a delay-seconds `Retry-After` value. HTTP-date values are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_range(
        &self,
        asset: Asset,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawRecord>, ApiError> {
        let path = format!("/coins/{}/market_chart/range", asset.api_id());
        let response: MarketChartResponse = self
            .get_json(
                &path,
                &[
                    ("vs_currency", self.vs_currency.clone()),
                    ("from", start.timestamp().to_string()),
                    ("to", end.timestamp().to_string()),
                ],
            )
            .await?;

        let records = response.into_records()?;
        tracing::debug!(%asset, %start, %end, records = records.len(), "Fetched market chart");
        Ok(records)
    }

    async fn fetch_snapshot(&self, asset: Asset) -> Result<MarketSnapshot, ApiError> {
        let coins: Vec<CoinMarketResponse> = self
            .get_json(
                "/coins/markets",
                &[
                    ("vs_currency", self.vs_currency.clone()),
                    ("ids", asset.api_id().to_string()),
                ],
            )
            .await?;

        coins
            .into_iter()
            .find(|c| c.id == asset.api_id())
            .ok_or_else(|| ApiError::InvalidData(format!("No market data returned for {}", asset)))?
            .into_snapshot(asset, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_passes_through() {
        assert!(check_status(StatusCode::OK, None, "{}").is_ok());
    }

    #[test]
    fn too_many_requests_is_rate_limit_with_hint() {
        let err = check_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            "",
        )
        .unwrap_err();
        assert!(err.is_rate_limit());
        assert!(!err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = check_status(StatusCode::BAD_GATEWAY, None, "upstream down").unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, ApiError::Server { status: 502, .. }));
    }

    #[test]
    fn other_client_errors_are_permanent() {
        let err = check_status(StatusCode::NOT_FOUND, None, r#"{"error":"coin not found"}"#)
            .unwrap_err();
        assert!(!err.is_transient());
        assert!(!err.is_rate_limit());
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "coin not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn retry_after_accepts_seconds_only() {
        assert_eq!(parse_retry_after(" 30 "), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn client_uses_configured_base_url() {
        let settings = ApiSettings {
            base_url: Some("http://localhost:8080/api/v3/".to_string()),
            ..ApiSettings::default()
        };
        let client = CoinGeckoClient::new(&settings).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api/v3");
    }

    #[tokio::test]
    async fn connection_failures_are_transient() {
        // Port 9 (discard) is closed on any ordinary test machine.
        let settings = ApiSettings {
            base_url: Some("http://127.0.0.1:9".to_string()),
            request_timeout: Duration::from_secs(2),
            ..ApiSettings::default()
        };
        let client = CoinGeckoClient::new(&settings).unwrap();

        let err = client.fetch_snapshot(Asset::Bitcoin).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.is_transient());
    }
}
