//! Standard formulas over plain slices.
//!
//! Rolling functions return one value per input element. The value at index
//! `t` summarizes `values[t-window+1..=t]` and is `None` for the first
//! `window - 1` elements, so no output ever depends on later input.

use crate::error::AnalyticsError;
use crate::report::{LagCorrelation, LeadLagProfile, MonthlyCorrelation};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Period-over-period returns `p_t / p_{t-1} - 1`. One shorter than `prices`:
/// element `i` is the return realized on date `i + 1`.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Log returns `ln(p_t / p_{t-1})`, indexed like `simple_returns`.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn simple_moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| mean(w))
}

/// Rolling sample standard deviation.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

fn rolling<F>(values: &[f64], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|t| {
            if t + 1 < window {
                None
            } else {
                f(&values[t + 1 - window..=t])
            }
        })
        .collect()
}

/// The value path implied by compounding `returns` from a starting value of 1.
/// One longer than `returns`; the first element is the starting value.
pub fn cumulative_value(returns: &[f64]) -> Vec<f64> {
    let mut path = Vec::with_capacity(returns.len() + 1);
    let mut value = 1.0;
    path.push(value);
    for r in returns {
        value *= 1.0 + r;
        path.push(value);
    }
    path
}

/// Linearly interpolated empirical quantile of already sorted data.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Historical-simulation Value-at-Risk.
///
/// The `1 - confidence` empirical quantile of `returns`, negated so that a
/// loss is reported as a positive number.
pub fn historical_var(
    returns: &[f64],
    confidence: f64,
    min_samples: usize,
) -> Result<f64, AnalyticsError> {
    if returns.len() < min_samples.max(1) {
        return Err(AnalyticsError::insufficient(
            "value_at_risk",
            min_samples.max(1),
            returns.len(),
        ));
    }
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(AnalyticsError::InvalidParameter(format!(
            "VaR confidence must lie strictly between 0 and 1, got {confidence}"
        )));
    }

    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(-quantile_sorted(&sorted, 1.0 - confidence))
}

/// Largest peak-to-trough decline of the compounded value path, as a
/// fraction: `min_t(v_t / max_{s<=t} v_s) - 1`. Zero for a path that never
/// declines, negative otherwise.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst: f64 = 0.0;
    for value in cumulative_value(returns) {
        peak = peak.max(value);
        worst = worst.min(value / peak - 1.0);
    }
    worst
}

/// Annualized Sharpe ratio: mean excess return over its standard deviation,
/// scaled by `sqrt(periods_per_year)`. `risk_free_rate` is annual.
pub fn sharpe_ratio(
    returns: &[f64],
    risk_free_rate: f64,
    periods_per_year: f64,
) -> Result<f64, AnalyticsError> {
    let excess = excess_returns(returns, risk_free_rate, periods_per_year);
    let (Some(m), Some(sd)) = (mean(&excess), sample_std(&excess)) else {
        return Err(AnalyticsError::insufficient("sharpe_ratio", 2, returns.len()));
    };
    if sd <= f64::EPSILON {
        return Err(AnalyticsError::DivisionByZero("sharpe_ratio".to_string()));
    }
    Ok(m / sd * periods_per_year.sqrt())
}

/// Annualized Sortino ratio. Only shortfalls below the per-period risk-free
/// rate contribute to the denominator (downside deviation).
pub fn sortino_ratio(
    returns: &[f64],
    risk_free_rate: f64,
    periods_per_year: f64,
) -> Result<f64, AnalyticsError> {
    if returns.len() < 2 {
        return Err(AnalyticsError::insufficient("sortino_ratio", 2, returns.len()));
    }
    let excess = excess_returns(returns, risk_free_rate, periods_per_year);
    let m = mean(&excess).unwrap_or(0.0);
    let downside: f64 = excess.iter().map(|e| e.min(0.0).powi(2)).sum::<f64>();
    let dd = (downside / excess.len() as f64).sqrt();
    if dd <= f64::EPSILON {
        return Err(AnalyticsError::DivisionByZero("sortino_ratio".to_string()));
    }
    Ok(m / dd * periods_per_year.sqrt())
}

fn excess_returns(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Vec<f64> {
    let per_period = risk_free_rate / periods_per_year;
    returns.iter().map(|r| r - per_period).collect()
}

/// Pearson correlation of two equally long slices. `None` with fewer than two
/// pairs or when either side has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let ma = mean(a)?;
    let mb = mean(b)?;

    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }
    let denom = (va * vb).sqrt();
    if denom <= f64::EPSILON * f64::EPSILON || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

pub fn rolling_correlation(a: &[f64], b: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = a.len().min(b.len());
    (0..n)
        .map(|t| {
            if window < 2 || t + 1 < window {
                None
            } else {
                pearson(&a[t + 1 - window..=t], &b[t + 1 - window..=t])
            }
        })
        .collect()
}

/// Correlates `a_t` with `b_{t+k}` for every `k` in `lags`.
///
/// Positive `k` asks whether `a` leads `b`. The best lag maximizes the
/// correlation's magnitude; ties go to the lag nearest zero.
pub fn lead_lag(
    a: &[f64],
    b: &[f64],
    lags: RangeInclusive<i32>,
    min_samples: usize,
) -> Result<LeadLagProfile, AnalyticsError> {
    let n = a.len().min(b.len()) as i64;
    let mut by_lag = Vec::new();
    let mut best: Option<(i32, f64)> = None;

    for k in lags {
        let shift = i64::from(k);
        let t_start = 0.max(-shift);
        let t_end = n.min(n - shift);
        let (xs, ys): (Vec<f64>, Vec<f64>) = (t_start..t_end.max(t_start))
            .map(|t| (a[t as usize], b[(t + shift) as usize]))
            .unzip();

        let correlation = if xs.len() >= min_samples.max(2) {
            pearson(&xs, &ys)
        } else {
            None
        };

        if let Some(c) = correlation {
            let better = match best {
                None => true,
                Some((best_k, best_c)) => {
                    c.abs() > best_c.abs() + 1e-12
                        || ((c.abs() - best_c.abs()).abs() <= 1e-12 && k.abs() < best_k.abs())
                }
            };
            if better {
                best = Some((k, c));
            }
        }

        by_lag.push(LagCorrelation {
            lag: k,
            observations: xs.len(),
            correlation,
        });
    }

    let (best_lag, best_correlation) = best.ok_or_else(|| {
        AnalyticsError::insufficient("lead_lag_correlation", min_samples.max(2), n as usize)
    })?;

    Ok(LeadLagProfile {
        best_lag,
        best_correlation,
        by_lag,
    })
}

/// Correlation computed independently inside each calendar month.
///
/// `dates[i]` is the date of the pair `(a[i], b[i])`. Months with fewer than
/// `min_samples` pairs are reported with `correlation: None`.
pub fn monthly_correlation(
    dates: &[NaiveDate],
    a: &[f64],
    b: &[f64],
    min_samples: usize,
) -> Vec<MonthlyCorrelation> {
    let mut buckets: BTreeMap<(i32, u32), (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for ((date, x), y) in dates.iter().zip(a).zip(b) {
        let entry = buckets.entry((date.year(), date.month())).or_default();
        entry.0.push(*x);
        entry.1.push(*y);
    }

    buckets
        .into_iter()
        .map(|((year, month), (xs, ys))| MonthlyCorrelation {
            year,
            month,
            observations: xs.len(),
            correlation: if xs.len() >= min_samples.max(2) {
                pearson(&xs, &ys)
            } else {
                None
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn moving_average_leaves_leading_window_undefined() {
        let sma = simple_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(sma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn window_longer_than_input_is_all_undefined() {
        assert!(rolling_std(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }

    #[test]
    fn rolling_output_ignores_future_values() {
        let mut values = vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0];
        let before = rolling_std(&values, 3);
        values[5] = 1_000.0;
        let after = rolling_std(&values, 3);
        assert_eq!(before[..5], after[..5]);
        assert_ne!(before[5], after[5]);
    }

    #[test]
    fn returns_are_one_shorter_than_prices() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert_abs_diff_eq!(r[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(r[1], -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(log_returns(&[1.0, std::f64::consts::E])[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn var_interpolates_the_lower_tail() {
        let returns: Vec<f64> = (1..=100).map(|i| i as f64 / 1000.0 - 0.05).collect();
        // 5% quantile of -0.049..=0.05 with linear interpolation.
        let var = historical_var(&returns, 0.95, 30).unwrap();
        assert_abs_diff_eq!(var, 0.04405, epsilon = 1e-9);
    }

    #[test]
    fn var_needs_minimum_sample() {
        let err = historical_var(&[0.01; 29], 0.95, 30).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::InsufficientData {
                metric: "value_at_risk".to_string(),
                required: 30,
                available: 29
            }
        );
    }

    #[test]
    fn drawdown_is_zero_for_rising_path_and_negative_otherwise() {
        assert_eq!(max_drawdown(&[0.01, 0.02, 0.0, 0.03]), 0.0);
        // 1 -> 1.2 -> 0.9 -> 1.0: worst is 0.9 / 1.2 - 1.
        let dd = max_drawdown(&[0.2, -0.25, 1.0 / 9.0]);
        assert_abs_diff_eq!(dd, -0.25, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_annualizes_with_square_root_of_periods() {
        let returns = [0.01, 0.03, 0.02, 0.02];
        let per_period = 0.02 / sample_std(&returns).unwrap();
        let sharpe = sharpe_ratio(&returns, 0.0, 365.0).unwrap();
        assert_abs_diff_eq!(sharpe, per_period * 365f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn constant_returns_have_no_sharpe() {
        assert_eq!(
            sharpe_ratio(&[0.01, 0.01, 0.01], 0.0, 365.0),
            Err(AnalyticsError::DivisionByZero("sharpe_ratio".to_string()))
        );
    }

    #[test]
    fn sortino_only_penalizes_downside() {
        let returns = [0.02, -0.01, 0.03, -0.02];
        let downside = ((0.01f64.powi(2) + 0.02f64.powi(2)) / 4.0).sqrt();
        let expected = 0.005 / downside * 365f64.sqrt();
        assert_abs_diff_eq!(
            sortino_ratio(&returns, 0.0, 365.0).unwrap(),
            expected,
            epsilon = 1e-9
        );
        assert!(sortino_ratio(&[0.01, 0.02], 0.0, 365.0).is_err());
    }

    #[test]
    fn pearson_is_one_with_itself_and_symmetric() {
        let a = [0.1, -0.2, 0.05, 0.3, -0.1];
        let b = [0.2, 0.1, -0.3, 0.0, 0.4];
        assert_abs_diff_eq!(pearson(&a, &a).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            pearson(&a, &b).unwrap(),
            pearson(&b, &a).unwrap(),
            epsilon = 1e-15
        );
        assert_eq!(pearson(&a, &[1.0; 5]), None);
    }

    #[test]
    fn lead_lag_finds_shifted_copy() {
        // b repeats a two periods later, so a_t lines up with b_{t+2}.
        let a: Vec<f64> = (0..40).map(|i| ((i * 7 % 11) as f64).sin()).collect();
        let mut b = vec![0.0, 0.0];
        b.extend_from_slice(&a[..38]);

        let profile = lead_lag(&a, &b, -5..=5, 3).unwrap();
        assert_eq!(profile.best_lag, 2);
        assert_abs_diff_eq!(profile.best_correlation, 1.0, epsilon = 1e-9);
        assert_eq!(profile.by_lag.len(), 11);
        assert_eq!(profile.by_lag[7].observations, 38);
    }

    #[test]
    fn lead_lag_without_enough_pairs_is_insufficient() {
        assert!(matches!(
            lead_lag(&[0.1, 0.2], &[0.3, 0.1], 0..=0, 3),
            Err(AnalyticsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn monthly_buckets_follow_calendar_months() {
        let dates: Vec<NaiveDate> = (0..40)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 15).unwrap() + chrono::Duration::days(i))
            .collect();
        let a: Vec<f64> = (0..40).map(|i| (i as f64).cos()).collect();
        let b: Vec<f64> = a.iter().map(|x| -2.0 * x).collect();

        let months = monthly_correlation(&dates, &a, &b, 3);
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month, months[0].observations), (2024, 1, 17));
        assert_eq!((months[1].month, months[1].observations), (2, 23));
        assert_abs_diff_eq!(months[0].correlation.unwrap(), -1.0, epsilon = 1e-9);
    }
}
