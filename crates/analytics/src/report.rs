use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One dated value of a derived series. `None` marks a date for which the
/// metric is undefined (e.g. inside the leading window), never zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Correlation of the first asset's returns with the second asset's returns
/// shifted by `lag` periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LagCorrelation {
    pub lag: i32,
    pub observations: usize,
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadLagProfile {
    /// The lag whose correlation has the largest magnitude.
    pub best_lag: i32,
    pub best_correlation: f64,
    pub by_lag: Vec<LagCorrelation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyCorrelation {
    pub year: i32,
    pub month: u32,
    pub observations: usize,
    /// `None` when the month has too few pairs or a flat series.
    pub correlation: Option<f64>,
}

/// The value of a single named metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricResult {
    Scalar(f64),
    Series(Vec<SeriesPoint>),
    LeadLag(LeadLagProfile),
    Monthly(Vec<MonthlyCorrelation>),
}

/// Every metric computed for one aligned dataset, keyed by metric name
/// (e.g. `btc_sma_7`, `rolling_corr_30`).
///
/// Metrics that could not be computed are listed in `skipped` with the reason
/// instead of appearing in `results`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsReport {
    pub observations: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub results: BTreeMap<String, MetricResult>,
    pub skipped: BTreeMap<String, String>,
}

impl MetricsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&MetricResult> {
        self.results.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        match self.results.get(name) {
            Some(MetricResult::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn series(&self, name: &str) -> Option<&[SeriesPoint]> {
        match self.results.get(name) {
            Some(MetricResult::Series(points)) => Some(points),
            _ => None,
        }
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skipped.contains_key(name)
    }

    /// All scalar metrics in name order.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, f64)> {
        self.results.iter().filter_map(|(name, result)| match result {
            MetricResult::Scalar(v) => Some((name.as_str(), *v)),
            _ => None,
        })
    }

    pub(crate) fn insert(&mut self, name: String, result: MetricResult) {
        self.results.insert(name, result);
    }

    pub(crate) fn skip(&mut self, name: String, reason: String) {
        tracing::warn!(metric = %name, %reason, "Metric skipped");
        self.skipped.insert(name, reason);
    }
}
