//! Terminal tables for the run summary and the computed metrics.

use analytics::{MetricResult, MetricsReport};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use core_types::MarketSnapshot;
use market_data::AlignmentSummary;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.decimals$}"))
}

pub fn print_alignment(summary: &AlignmentSummary) {
    let mut t = table(vec!["Asset", "Fetched", "Dropped by join"]);
    t.add_row(vec![
        summary.first.to_string(),
        summary.first_len.to_string(),
        summary.first_dropped.to_string(),
    ]);
    t.add_row(vec![
        summary.second.to_string(),
        summary.second_len.to_string(),
        summary.second_dropped.to_string(),
    ]);
    let span = match (summary.start, summary.end) {
        (Some(start), Some(end)) => format!("{start} .. {end}"),
        _ => "-".to_string(),
    };
    println!("Aligned {} shared dates ({span})", summary.aligned_len);
    println!("{t}");
}

pub fn print_report(report: &MetricsReport) {
    let mut scalars = table(vec!["Metric", "Value"]);
    for (name, value) in report.scalars() {
        scalars.add_row(vec![Cell::new(name), Cell::new(format!("{value:.6}"))]);
    }
    // Latest defined value of each series, e.g. the current 30-period volatility.
    for (name, result) in &report.results {
        if let MetricResult::Series(points) = result {
            let latest = points.iter().rev().find_map(|p| p.value);
            scalars.add_row(vec![
                Cell::new(format!("{name} (latest)")),
                Cell::new(opt(latest, 6)),
            ]);
        }
    }
    println!("{scalars}");

    if let Some(MetricResult::LeadLag(profile)) = report.get("lead_lag_corr") {
        let mut t = table(vec!["Lag", "Pairs", "Correlation"]);
        for lag in &profile.by_lag {
            t.add_row(vec![
                lag.lag.to_string(),
                lag.observations.to_string(),
                opt(lag.correlation, 4),
            ]);
        }
        println!(
            "Lead-lag: best lag {} (correlation {:.4})",
            profile.best_lag, profile.best_correlation
        );
        println!("{t}");
    }

    if let Some(MetricResult::Monthly(months)) = report.get("monthly_corr") {
        let mut t = table(vec!["Month", "Pairs", "Correlation"]);
        for m in months {
            t.add_row(vec![
                format!("{}-{:02}", m.year, m.month),
                m.observations.to_string(),
                opt(m.correlation, 4),
            ]);
        }
        println!("{t}");
    }

    if !report.skipped.is_empty() {
        let mut t = table(vec!["Skipped metric", "Reason"]);
        for (name, reason) in &report.skipped {
            t.add_row(vec![name.as_str(), reason.as_str()]);
        }
        println!("{t}");
    }
}

pub fn print_snapshots(snapshots: &[MarketSnapshot], vs_currency: &str) {
    let price_header = format!("Price ({})", vs_currency.to_uppercase());
    let mut t = table(vec![
        "Asset",
        price_header.as_str(),
        "24h change %",
        "24h high",
        "24h low",
        "24h volume",
        "Market cap",
    ]);
    for s in snapshots {
        t.add_row(vec![
            s.asset.to_string(),
            format!("{:.2}", s.price),
            opt(s.price_change_pct_24h, 2),
            opt(s.high_24h, 2),
            opt(s.low_24h, 2),
            opt(s.volume_24h, 0),
            opt(s.market_cap, 0),
        ]);
    }
    println!("{t}");
}
