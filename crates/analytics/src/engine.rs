use crate::error::AnalyticsError;
use crate::report::{MetricResult, MetricsReport, SeriesPoint};
use crate::stats;
use chrono::NaiveDate;
use configuration::AnalysisParams;
use core_types::{AlignedDataset, AlignedRow, Asset};

/// A stateless calculator for deriving comparative statistics from an aligned pair.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

/// One side of the pair, borrowed from the dataset for the duration of a run.
struct AssetView<'a> {
    asset: Asset,
    dates: &'a [NaiveDate],
    prices: Vec<f64>,
    returns: Vec<f64>,
}

impl AssetView<'_> {
    fn prefix(&self) -> &'static str {
        self.asset.ticker()
    }

    /// Dates on which a return is realized.
    fn return_dates(&self) -> &[NaiveDate] {
        &self.dates[1..]
    }
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating metrics.
    ///
    /// # Arguments
    ///
    /// * `dataset` - The aligned pair. It is only read.
    /// * `params` - Window lengths, confidence level and lag range.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `MetricsReport`. Only invalid parameters or
    /// an empty dataset fail the whole call; a metric without enough data is
    /// listed in `MetricsReport::skipped` instead.
    pub fn calculate(
        &self,
        dataset: &AlignedDataset,
        params: &AnalysisParams,
    ) -> Result<MetricsReport, AnalyticsError> {
        params
            .validate()
            .map_err(|e| AnalyticsError::InvalidParameter(e.to_string()))?;
        if dataset.is_empty() {
            return Err(AnalyticsError::EmptyDataset);
        }

        let dates = dataset.dates();
        let mut report = MetricsReport::new();
        report.observations = dataset.len();
        report.start = dates.first().copied();
        report.end = dates.last().copied();

        let first = Self::view(dataset, &dates, dataset.first(), |row| row.first.price);
        let second = Self::view(dataset, &dates, dataset.second(), |row| row.second.price);
        let periods_per_year = dataset.granularity().periods_per_year();

        for view in [&first, &second] {
            self.calculate_trend(view, params, &mut report);
            self.calculate_risk(view, params, periods_per_year, &mut report);
        }
        self.calculate_correlation(&first, &second, params, &mut report);

        tracing::info!(
            observations = report.observations,
            computed = report.results.len(),
            skipped = report.skipped.len(),
            "Metrics calculated"
        );
        Ok(report)
    }

    fn view<'a>(
        dataset: &AlignedDataset,
        dates: &'a [NaiveDate],
        asset: Asset,
        price: impl Fn(&AlignedRow) -> f64,
    ) -> AssetView<'a> {
        let prices: Vec<f64> = dataset.rows().iter().map(price).collect();
        let returns = stats::simple_returns(&prices);
        AssetView {
            asset,
            dates,
            prices,
            returns,
        }
    }

    /// Returns, cumulative return and moving averages.
    fn calculate_trend(&self, view: &AssetView, params: &AnalysisParams, report: &mut MetricsReport) {
        let p = view.prefix();

        let returns = std::iter::once(None).chain(view.returns.iter().copied().map(Some));
        report.insert(format!("{p}_return"), dated(view.dates, returns));

        let cumulative = stats::cumulative_value(&view.returns)
            .into_iter()
            .map(|v| Some(v - 1.0));
        report.insert(format!("{p}_cumulative_return"), dated(view.dates, cumulative));

        for &n in &params.sma_windows {
            let name = format!("{p}_sma_{n}");
            if n > view.prices.len() {
                report.skip(name, insufficient("simple_moving_average", n, view.prices.len()));
                continue;
            }
            let sma = stats::simple_moving_average(&view.prices, n);
            report.insert(name, dated(view.dates, sma));
        }
    }

    /// Volatility, VaR, drawdown and the risk-adjusted ratios.
    fn calculate_risk(
        &self,
        view: &AssetView,
        params: &AnalysisParams,
        periods_per_year: f64,
        report: &mut MetricsReport,
    ) {
        let p = view.prefix();
        let w = params.rolling_window;

        let name = format!("{p}_volatility_{w}");
        if w > view.returns.len() {
            report.skip(name, insufficient("rolling_volatility", w, view.returns.len()));
        } else {
            let log_returns = stats::log_returns(&view.prices);
            let volatility = stats::rolling_std(&log_returns, w);
            report.insert(name, dated(view.return_dates(), volatility));
        }

        record(
            report,
            format!("{p}_var_{}", confidence_label(params.var_confidence)),
            stats::historical_var(&view.returns, params.var_confidence, params.var_min_samples),
        );

        report.insert(
            format!("{p}_max_drawdown"),
            MetricResult::Scalar(stats::max_drawdown(&view.returns)),
        );

        record(
            report,
            format!("{p}_sharpe"),
            stats::sharpe_ratio(&view.returns, params.risk_free_rate, periods_per_year),
        );
        record(
            report,
            format!("{p}_sortino"),
            stats::sortino_ratio(&view.returns, params.risk_free_rate, periods_per_year),
        );
    }

    /// Correlation structure of the pair, mostly over the two return series.
    fn calculate_correlation(
        &self,
        first: &AssetView,
        second: &AssetView,
        params: &AnalysisParams,
        report: &mut MetricsReport,
    ) {
        let (a, b) = (&first.returns, &second.returns);

        let static_corr = stats::pearson(a, b).ok_or_else(|| {
            if a.len() < 2 {
                AnalyticsError::insufficient("static_correlation", 2, a.len())
            } else {
                AnalyticsError::DivisionByZero("static_correlation".to_string())
            }
        });
        record(report, "static_corr".to_string(), static_corr);

        // Levels rather than returns; trending pairs can disagree in sign.
        let price_corr = stats::pearson(&first.prices, &second.prices).ok_or_else(|| {
            if first.prices.len() < 2 {
                AnalyticsError::insufficient("price_correlation", 2, first.prices.len())
            } else {
                AnalyticsError::DivisionByZero("price_correlation".to_string())
            }
        });
        record(report, "price_corr".to_string(), price_corr);

        let w = params.rolling_window;
        let name = format!("rolling_corr_{w}");
        if w > a.len() {
            report.skip(name, insufficient("rolling_correlation", w, a.len()));
        } else {
            let rolling = stats::rolling_correlation(a, b, w);
            report.insert(name, dated(first.return_dates(), rolling));
        }

        let lead_lag = stats::lead_lag(
            a,
            b,
            params.lag_min..=params.lag_max,
            params.min_correlation_samples,
        )
        .map(MetricResult::LeadLag);
        match lead_lag {
            Ok(result) => report.insert("lead_lag_corr".to_string(), result),
            Err(e) => report.skip("lead_lag_corr".to_string(), e.to_string()),
        }

        let monthly = stats::monthly_correlation(
            first.return_dates(),
            a,
            b,
            params.min_correlation_samples,
        );
        if monthly.is_empty() {
            report.skip(
                "monthly_corr".to_string(),
                insufficient("monthly_correlation", 1, 0),
            );
        } else {
            report.insert("monthly_corr".to_string(), MetricResult::Monthly(monthly));
        }
    }
}

fn dated(dates: &[NaiveDate], values: impl IntoIterator<Item = Option<f64>>) -> MetricResult {
    MetricResult::Series(
        dates
            .iter()
            .zip(values)
            .map(|(&date, value)| SeriesPoint { date, value })
            .collect(),
    )
}

fn record(report: &mut MetricsReport, name: String, value: Result<f64, AnalyticsError>) {
    match value {
        Ok(v) => report.insert(name, MetricResult::Scalar(v)),
        Err(e) => report.skip(name, e.to_string()),
    }
}

fn insufficient(metric: &str, required: usize, available: usize) -> String {
    AnalyticsError::insufficient(metric, required, available).to_string()
}

/// `0.95` -> `95`, `0.975` -> `97_5`.
fn confidence_label(confidence: f64) -> String {
    let pct = confidence * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}", pct.round() as u32)
    } else {
        format!("{}", (pct * 1e6).round() / 1e6).replace('.', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_labels() {
        assert_eq!(confidence_label(0.95), "95");
        assert_eq!(confidence_label(0.99), "99");
        assert_eq!(confidence_label(0.975), "97_5");
    }

    #[test]
    fn single_row_skips_price_correlation_as_insufficient() {
        let obs = |price| core_types::Observation {
            price,
            volume: 1.0,
            market_cap: None,
        };
        let dataset = AlignedDataset::new(
            Asset::Bitcoin,
            Asset::Ethereum,
            core_types::Granularity::Daily,
            vec![core_types::AlignedRow {
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                first: obs(40_000.0),
                second: obs(2_000.0),
            }],
        )
        .unwrap();

        let report = AnalyticsEngine::new()
            .calculate(&dataset, &AnalysisParams::default())
            .unwrap();
        let reason = &report.skipped["price_corr"];
        assert!(reason.contains("needs 2 observations, have 1"), "{reason}");
        assert!(!reason.contains("zero"), "{reason}");
    }

    #[test]
    fn invalid_params_fail_the_whole_run() {
        let dataset = AlignedDataset::new(
            Asset::Bitcoin,
            Asset::Ethereum,
            core_types::Granularity::Daily,
            Vec::new(),
        )
        .unwrap();
        let params = AnalysisParams {
            var_confidence: 1.5,
            ..AnalysisParams::default()
        };
        assert!(matches!(
            AnalyticsEngine::new().calculate(&dataset, &params),
            Err(AnalyticsError::InvalidParameter(_))
        ));
        assert_eq!(
            AnalyticsEngine::new().calculate(&dataset, &AnalysisParams::default()),
            Err(AnalyticsError::EmptyDataset)
        );
    }
}
