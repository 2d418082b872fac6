use crate::align::{align, Alignment};
use crate::error::FetchError;
use crate::normalize::normalize;
use api_client::error::ApiError;
use api_client::MarketDataSource;
use configuration::{FetchSettings, RetryPolicy};
use core_types::{Asset, AssetSeries, DateRange, Granularity, MarketSnapshot};
use std::future::Future;

/// Fetches and normalizes historical series from a `MarketDataSource`.
///
/// Ranges longer than `max_span_days` are split into sequential requests.
/// Each request is retried on its own: 429 responses up to
/// `max_rate_limit_retries` times and transient failures up to
/// `max_transient_retries` times, with exponential backoff in between.
/// Permanent rejections are never retried.
pub struct Fetcher<S> {
    source: S,
    max_span_days: u32,
    granularity: Granularity,
    policy: RetryPolicy,
}

impl<S: MarketDataSource> Fetcher<S> {
    pub fn new(source: S, settings: &FetchSettings, policy: RetryPolicy) -> Self {
        Self {
            source,
            max_span_days: settings.max_span_days,
            granularity: settings.granularity,
            policy,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Fetches one asset over `range` and returns its normalized series.
    pub async fn fetch_series(
        &self,
        asset: Asset,
        range: DateRange,
    ) -> Result<AssetSeries, FetchError> {
        if self.max_span_days == 0 {
            return Err(FetchError::InvalidRequest(
                "max_span_days must be at least 1".to_string(),
            ));
        }

        let chunks = range.chunks(self.max_span_days);
        tracing::info!(
            %asset,
            start = %range.start,
            end = %range.end,
            requests = chunks.len(),
            "Fetching historical series"
        );

        let mut raw = Vec::new();
        for chunk in &chunks {
            let records = self
                .with_retry(asset, || {
                    self.source
                        .fetch_range(asset, chunk.start_time(), chunk.end_time())
                })
                .await?;
            tracing::debug!(%asset, start = %chunk.start, end = %chunk.end, records = records.len(), "Chunk fetched");
            raw.extend(records);
        }

        let (series, report) = normalize(asset, self.granularity, range, raw)?;
        tracing::info!(
            %asset,
            observations = series.len(),
            discarded = report.missing_price + report.out_of_range,
            "Series ready"
        );
        Ok(series)
    }

    /// Fetches both assets over the identical range and inner-joins them.
    ///
    /// The two fetches run concurrently; the first error aborts the whole
    /// operation so no partial dataset is ever returned.
    pub async fn fetch_aligned(
        &self,
        first: Asset,
        second: Asset,
        range: DateRange,
    ) -> Result<Alignment, FetchError> {
        if first == second {
            return Err(FetchError::InvalidRequest(format!(
                "the asset pair must be two different assets, got {} twice",
                first
            )));
        }

        let (a, b) = futures::future::try_join(
            self.fetch_series(first, range),
            self.fetch_series(second, range),
        )
        .await?;

        let alignment = align(&a, &b)?;
        tracing::info!(
            rows = alignment.summary.aligned_len,
            start = ?alignment.summary.start,
            end = ?alignment.summary.end,
            "Aligned dataset ready"
        );
        Ok(alignment)
    }

    /// Fetches current market data for `asset`, with the same retry rules.
    pub async fn fetch_snapshot(&self, asset: Asset) -> Result<MarketSnapshot, FetchError> {
        self.with_retry(asset, || self.source.fetch_snapshot(asset))
            .await
    }

    async fn with_retry<T, F, Fut>(&self, asset: Asset, mut attempt: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempts: u32 = 0;
        let mut rate_limit_retries: u32 = 0;
        let mut transient_retries: u32 = 0;

        loop {
            attempts += 1;
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let delay = if err.is_rate_limit() {
                if rate_limit_retries >= self.policy.max_rate_limit_retries {
                    tracing::error!(%asset, attempts, "Giving up: rate limit persists");
                    return Err(FetchError::RateLimited { asset, attempts });
                }
                let delay = self.policy.backoff(rate_limit_retries, err.retry_after());
                rate_limit_retries += 1;
                delay
            } else if err.is_transient() {
                if transient_retries >= self.policy.max_transient_retries {
                    tracing::error!(%asset, attempts, error = %err, "Giving up after transient failures");
                    return Err(FetchError::FetchFailed {
                        asset,
                        attempts,
                        cause: err,
                    });
                }
                let delay = self.policy.backoff(transient_retries, None);
                transient_retries += 1;
                delay
            } else {
                return Err(match err {
                    ApiError::Rejected { status, message } => FetchError::InvalidRequest(format!(
                        "{} rejected by the API (HTTP {}): {}",
                        asset, status, message
                    )),
                    ApiError::Configuration(message) => FetchError::InvalidRequest(message),
                    other => FetchError::FetchFailed {
                        asset,
                        attempts,
                        cause: other,
                    },
                });
            };

            tracing::warn!(%asset, attempts, error = %err, delay_ms = delay.as_millis() as u64, "Request failed, retrying");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
