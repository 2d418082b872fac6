use crate::error::ConfigError;
use chrono::NaiveDate;
use core_types::{DateRange, Granularity};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSettings,
    pub fetch: FetchSettings,
    pub retry: RetryPolicy,
    pub analysis: AnalysisParams,
    pub export: ExportSettings,
    pub logging: LoggingSettings,
}

impl Config {
    /// Checks every section, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.fetch.validate()?;
        self.retry.validate()?;
        self.analysis.validate()?;

        if self.export.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "export.output_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which CoinGecko access tier the API key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiPlan {
    /// Keyless public access.
    #[default]
    Public,
    Demo,
    Pro,
}

/// Connection settings for the market-data API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub plan: ApiPlan,
    pub api_key: Option<String>,
    /// Overrides the plan's default host, e.g. for a local stub.
    pub base_url: Option<String>,
    /// Quote currency for every price (e.g. "usd").
    pub vs_currency: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            plan: ApiPlan::Public,
            api_key: None,
            base_url: None,
            vs_currency: "usd".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        let has_key = self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        if self.plan != ApiPlan::Public && !has_key {
            return Err(ConfigError::ValidationError(format!(
                "api.api_key is required for the {:?} plan",
                self.plan
            )));
        }
        if self.vs_currency.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api.vs_currency must not be empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "api.request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Controls which window is fetched and how it is split into requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// The longest span a single request may cover.
    pub max_span_days: u32,
    pub granularity: Granularity,
    /// Size of the trailing window used when no start date is given.
    pub lookback_days: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_span_days: 365,
            granularity: Granularity::Daily,
            lookback_days: 365,
            start_date: None,
            end_date: None,
        }
    }
}

impl FetchSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_span_days == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.max_span_days must be at least 1".to_string(),
            ));
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.lookback_days must be at least 1".to_string(),
            ));
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                DateRange::new(start, end)?;
            }
            (None, Some(end)) => {
                DateRange::trailing(self.lookback_days, end)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolves the configured bounds into a concrete range.
    ///
    /// Missing bounds fall back to a trailing `lookback_days` window ending at
    /// `end_date` (or `today`).
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange, ConfigError> {
        let range = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => DateRange::new(start, end)?,
            (Some(start), None) => DateRange::new(start, today)?,
            (None, Some(end)) => DateRange::trailing(self.lookback_days, end)?,
            (None, None) => DateRange::trailing(self.lookback_days, today)?,
        };
        Ok(range)
    }
}

/// Bounded exponential backoff for failed requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries allowed after HTTP 429 responses before giving up.
    pub max_rate_limit_retries: u32,
    /// Retries allowed after 5xx responses and network failures.
    pub max_transient_retries: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Use the server's `Retry-After` header instead of the computed delay.
    pub honor_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 5,
            max_transient_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            honor_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries the same number of times but never waits.
    pub fn immediate(max_rate_limit_retries: u32, max_transient_retries: u32) -> Self {
        Self {
            max_rate_limit_retries,
            max_transient_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            honor_retry_after: false,
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn backoff(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        if self.honor_retry_after {
            if let Some(hint) = retry_after {
                return hint.min(self.max_delay);
            }
        }
        let factor = 2u32.saturating_pow(retry);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_delay > self.max_delay {
            return Err(ConfigError::ValidationError(format!(
                "retry.base_delay ({:?}) exceeds retry.max_delay ({:?})",
                self.base_delay, self.max_delay
            )));
        }
        Ok(())
    }
}

/// Parameters for the metrics engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Window lengths for the simple moving averages.
    pub sma_windows: Vec<usize>,
    /// Window used by rolling volatility and rolling correlation.
    pub rolling_window: usize,
    pub var_confidence: f64,
    /// Fewer return observations than this and VaR is not reported.
    pub var_min_samples: usize,
    /// Annual risk-free rate used by the Sharpe and Sortino ratios.
    pub risk_free_rate: f64,
    pub lag_min: i32,
    pub lag_max: i32,
    /// Minimum paired observations for any correlation to be reported.
    pub min_correlation_samples: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            sma_windows: vec![7, 30],
            rolling_window: 30,
            var_confidence: 0.95,
            var_min_samples: 30,
            risk_free_rate: 0.0,
            lag_min: -10,
            lag_max: 10,
            min_correlation_samples: 3,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sma_windows.iter().any(|w| *w == 0) {
            return Err(ConfigError::ValidationError(
                "analysis.sma_windows must contain only positive windows".to_string(),
            ));
        }
        if self.rolling_window < 2 {
            return Err(ConfigError::ValidationError(format!(
                "analysis.rolling_window must be at least 2, got {}",
                self.rolling_window
            )));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "analysis.var_confidence must lie strictly between 0 and 1, got {}",
                self.var_confidence
            )));
        }
        if self.var_min_samples == 0 {
            return Err(ConfigError::ValidationError(
                "analysis.var_min_samples must be at least 1".to_string(),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::ValidationError(
                "analysis.risk_free_rate must be finite".to_string(),
            ));
        }
        if self.lag_min > self.lag_max {
            return Err(ConfigError::ValidationError(format!(
                "analysis.lag_min ({}) is greater than analysis.lag_max ({})",
                self.lag_min, self.lag_max
            )));
        }
        if self.min_correlation_samples < 2 {
            return Err(ConfigError::ValidationError(
                "analysis.min_correlation_samples must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the aligned dataset and metrics are written when export is on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub enabled: bool,
    pub output_dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: PathBuf::from("crypto_data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Directory for a daily rolling log file. Stderr only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            honor_retry_after: false,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(0, None), Duration::from_secs(1));
        assert_eq!(policy.backoff(1, None), Duration::from_secs(2));
        assert_eq!(policy.backoff(2, None), Duration::from_secs(4));
        assert_eq!(policy.backoff(3, None), Duration::from_secs(5));
        assert_eq!(policy.backoff(40, None), Duration::from_secs(5));
    }

    #[test]
    fn retry_after_hint_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.backoff(0, Some(Duration::from_secs(12))),
            Duration::from_secs(12)
        );
        assert_eq!(
            policy.backoff(0, Some(Duration::from_secs(600))),
            policy.max_delay
        );
    }

    #[test]
    fn paid_plans_require_a_key() {
        let mut config = Config::default();
        config.api.plan = ApiPlan::Pro;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
        config.api.api_key = Some("secret".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn analysis_params_reject_bad_confidence_and_window() {
        let mut params = AnalysisParams {
            var_confidence: 1.0,
            ..AnalysisParams::default()
        };
        assert!(params.validate().is_err());

        params.var_confidence = 0.99;
        params.rolling_window = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn date_range_falls_back_to_trailing_window() {
        let fetch = FetchSettings {
            lookback_days: 30,
            ..FetchSettings::default()
        };
        let range = fetch.date_range(date(2024, 6, 30)).unwrap();
        assert_eq!(range.start, date(2024, 6, 1));
        assert_eq!(range.end, date(2024, 6, 30));
    }

    #[test]
    fn lookback_beyond_calendar_is_an_error() {
        let fetch = FetchSettings {
            lookback_days: 200_000_000,
            ..FetchSettings::default()
        };
        assert!(matches!(
            fetch.date_range(date(2024, 6, 30)),
            Err(ConfigError::DateRange(_))
        ));

        let pinned = FetchSettings {
            end_date: Some(date(2024, 6, 30)),
            ..fetch
        };
        assert!(matches!(pinned.validate(), Err(ConfigError::DateRange(_))));
    }

    #[test]
    fn inverted_configured_range_is_rejected() {
        let fetch = FetchSettings {
            start_date: Some(date(2024, 6, 30)),
            end_date: Some(date(2024, 6, 1)),
            ..FetchSettings::default()
        };
        assert!(matches!(fetch.validate(), Err(ConfigError::DateRange(_))));
    }
}
