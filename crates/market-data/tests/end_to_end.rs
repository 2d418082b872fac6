//! Fetch, align, analyze and export against an in-memory provider.

use analytics::AnalyticsEngine;
use api_client::error::ApiError;
use api_client::{MarketDataSource, RawRecord};
use approx::assert_abs_diff_eq;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use configuration::{AnalysisParams, FetchSettings, RetryPolicy};
use core_types::{Asset, DateRange, MarketSnapshot};
use market_data::{FetchError, Fetcher, export_dataset, load_dataset};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves fixed daily closes; optionally answers every call with 429.
struct FixedHistory {
    closes: HashMap<Asset, (NaiveDate, Vec<f64>)>,
    rate_limited: bool,
    calls: AtomicUsize,
}

impl FixedHistory {
    fn new(rate_limited: bool) -> Self {
        Self {
            closes: HashMap::new(),
            rate_limited,
            calls: AtomicUsize::new(0),
        }
    }

    fn with(mut self, asset: Asset, start: NaiveDate, closes: Vec<f64>) -> Self {
        self.closes.insert(asset, (start, closes));
        self
    }
}

#[async_trait]
impl MarketDataSource for FixedHistory {
    async fn fetch_range(
        &self,
        asset: Asset,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawRecord>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited {
            return Err(ApiError::RateLimited { retry_after: None });
        }
        let Some((first_day, closes)) = self.closes.get(&asset) else {
            return Ok(Vec::new());
        };

        Ok(closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                // Mid-day timestamps, as the provider reports intraday samples.
                let day = *first_day + chrono::Duration::days(i as i64);
                RawRecord {
                    timestamp: day.and_hms_opt(12, 0, 0).unwrap().and_utc(),
                    price: Some(*close),
                    volume: Some(10.0),
                    market_cap: None,
                }
            })
            .filter(|r| start <= r.timestamp && r.timestamp <= end)
            .collect())
    }

    async fn fetch_snapshot(&self, asset: Asset) -> Result<MarketSnapshot, ApiError> {
        Err(ApiError::InvalidData(format!("no snapshot for {asset}")))
    }
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn fetch_settings() -> FetchSettings {
    FetchSettings {
        max_span_days: 4,
        ..FetchSettings::default()
    }
}

#[tokio::test]
async fn rising_and_falling_pair_end_to_end() {
    let source = FixedHistory::new(false)
        .with(Asset::Bitcoin, jan(1), (0..10).map(|i| 100.0 + i as f64).collect())
        .with(Asset::Ethereum, jan(1), (0..10).map(|i| 100.0 - i as f64).collect());
    let fetcher = Fetcher::new(source, &fetch_settings(), RetryPolicy::immediate(0, 0));

    let range = DateRange::new(jan(1), jan(10)).unwrap();
    let alignment = fetcher
        .fetch_aligned(Asset::Bitcoin, Asset::Ethereum, range)
        .await
        .unwrap();
    assert_eq!(alignment.dataset.len(), 10);

    let report = AnalyticsEngine::new()
        .calculate(&alignment.dataset, &AnalysisParams::default())
        .unwrap();

    assert_abs_diff_eq!(report.scalar("price_corr").unwrap(), -1.0, epsilon = 1e-3);
    assert_eq!(report.scalar("btc_max_drawdown"), Some(0.0));
    assert_abs_diff_eq!(report.scalar("eth_max_drawdown").unwrap(), -0.09, epsilon = 1e-12);
    assert!(report.is_skipped("btc_var_95"));
}

#[tokio::test]
async fn disjoint_histories_halt_before_analysis() {
    let source = FixedHistory::new(false)
        .with(Asset::Bitcoin, jan(1), vec![1.0, 2.0, 3.0])
        .with(Asset::Ethereum, jan(20), vec![1.0, 2.0, 3.0]);
    let fetcher = Fetcher::new(source, &fetch_settings(), RetryPolicy::immediate(0, 0));

    let result = fetcher
        .fetch_aligned(
            Asset::Bitcoin,
            Asset::Ethereum,
            DateRange::new(jan(1), jan(31)).unwrap(),
        )
        .await;

    match result {
        Err(err @ FetchError::AlignmentEmpty { .. }) => assert_eq!(err.kind(), "AlignmentEmpty"),
        other => panic!("expected AlignmentEmpty, got {other:?}"),
    }
}

#[tokio::test]
async fn persistent_rate_limit_surfaces_as_rate_limited() {
    let source = FixedHistory::new(true);
    let fetcher = Fetcher::new(&source, &fetch_settings(), RetryPolicy::immediate(5, 3));

    let err = fetcher
        .fetch_aligned(
            Asset::Bitcoin,
            Asset::Ethereum,
            DateRange::new(jan(1), jan(10)).unwrap(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "RateLimited");
    // The first chunk of each asset gives up after 1 + 5 attempts.
    assert!(source.calls.load(Ordering::SeqCst) <= 12);
}

#[tokio::test]
async fn exported_dataset_reproduces_the_same_metrics() {
    let source = FixedHistory::new(false)
        .with(
            Asset::Bitcoin,
            jan(1),
            (0..31).map(|i| 40_000.0 + 500.0 * (i as f64 * 0.4).sin()).collect(),
        )
        .with(
            Asset::Ethereum,
            jan(1),
            (0..31).map(|i| 2_300.0 + 40.0 * (i as f64 * 0.7).cos()).collect(),
        );
    let fetcher = Fetcher::new(source, &fetch_settings(), RetryPolicy::immediate(0, 0));
    let alignment = fetcher
        .fetch_aligned(
            Asset::Bitcoin,
            Asset::Ethereum,
            DateRange::new(jan(1), jan(31)).unwrap(),
        )
        .await
        .unwrap();

    let params = AnalysisParams {
        rolling_window: 10,
        var_min_samples: 20,
        ..AnalysisParams::default()
    };
    let engine = AnalyticsEngine::new();
    let report = engine.calculate(&alignment.dataset, &params).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let when = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let path = export_dataset(dir.path(), &alignment.dataset, &report, when).unwrap();

    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(document["metrics"]["observations"], 31);
    assert_eq!(document["metrics"]["results"]["static_corr"]["kind"], "scalar");

    let reloaded = load_dataset(&path).unwrap();
    assert_eq!(reloaded.dates(), alignment.dataset.dates());
    let recomputed = engine.calculate(&reloaded, &params).unwrap();
    assert_eq!(recomputed.skipped, report.skipped);
    for (name, value) in report.scalars() {
        assert_abs_diff_eq!(recomputed.scalar(name).unwrap(), value, epsilon = 1e-9);
    }
}
