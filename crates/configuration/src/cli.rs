//! Command-line overrides for the `[fetch]`, `[analysis]` and `[export]` sections.

use crate::settings::Config;
use chrono::NaiveDate;
use clap::Args;
use core_types::Granularity;
use std::path::PathBuf;

/// Flags accepted by the `run` command. Anything left unset keeps the value
/// from the config file or environment.
#[derive(Debug, Clone, Default, Args)]
pub struct RunOverrides {
    /// First day to fetch (format: YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day to fetch (format: YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Length of the trailing window when --start is not given.
    #[arg(long)]
    pub days: Option<u32>,

    /// Sampling interval: daily or weekly.
    #[arg(long)]
    pub granularity: Option<Granularity>,

    /// Confidence level for historical VaR, e.g. 0.95.
    #[arg(long)]
    pub var_confidence: Option<f64>,

    /// Window size for rolling volatility and correlation.
    #[arg(long)]
    pub rolling_window: Option<usize>,

    /// Export the aligned dataset and metrics as JSON, optionally into DIR.
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    pub export: Option<Option<PathBuf>>,
}

impl RunOverrides {
    /// Writes every flag that was given into `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(start) = self.start {
            config.fetch.start_date = Some(start);
        }
        if let Some(end) = self.end {
            config.fetch.end_date = Some(end);
        }
        if let Some(days) = self.days {
            config.fetch.lookback_days = days;
        }
        if let Some(granularity) = self.granularity {
            config.fetch.granularity = granularity;
        }
        if let Some(confidence) = self.var_confidence {
            config.analysis.var_confidence = confidence;
        }
        if let Some(window) = self.rolling_window {
            config.analysis.rolling_window = window;
        }
        if let Some(export) = &self.export {
            config.export.enabled = true;
            if let Some(dir) = export {
                config.export.output_dir = dir.clone();
            }
        }
    }
}
