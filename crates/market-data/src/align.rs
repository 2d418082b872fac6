use crate::error::FetchError;
use chrono::NaiveDate;
use core_types::{AlignedDataset, AlignedRow, Asset, AssetSeries, MarketRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// How much of each series survived the join.
///
/// The inner join silently drops dates that only one asset has; this is the
/// place to see how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentSummary {
    pub first: Asset,
    pub second: Asset,
    pub first_len: usize,
    pub second_len: usize,
    pub aligned_len: usize,
    pub first_dropped: usize,
    pub second_dropped: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Alignment {
    pub dataset: AlignedDataset,
    pub summary: AlignmentSummary,
}

/// Inner-joins two series on their dates.
///
/// A date survives only if both series have it, so no row is ever partial.
/// Swapping the arguments yields the same dates with each asset's values still
/// attached to that asset.
pub fn align(first: &AssetSeries, second: &AssetSeries) -> Result<Alignment, FetchError> {
    if first.asset() == second.asset() {
        return Err(FetchError::InvalidRequest(format!(
            "cannot align {} with itself",
            first.asset()
        )));
    }
    if first.granularity() != second.granularity() {
        return Err(FetchError::InvalidRequest(format!(
            "cannot align {} ({}) with {} ({})",
            first.asset(),
            first.granularity(),
            second.asset(),
            second.granularity()
        )));
    }

    let by_date: BTreeMap<NaiveDate, &MarketRecord> =
        second.records().iter().map(|r| (r.date, r)).collect();

    let rows: Vec<AlignedRow> = first
        .records()
        .iter()
        .filter_map(|a| {
            by_date.get(&a.date).map(|b| AlignedRow {
                date: a.date,
                first: a.observation(),
                second: b.observation(),
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(FetchError::AlignmentEmpty {
            first: first.asset(),
            second: second.asset(),
        });
    }

    let summary = AlignmentSummary {
        first: first.asset(),
        second: second.asset(),
        first_len: first.len(),
        second_len: second.len(),
        aligned_len: rows.len(),
        first_dropped: first.len() - rows.len(),
        second_dropped: second.len() - rows.len(),
        start: rows.first().map(|r| r.date),
        end: rows.last().map(|r| r.date),
    };

    if summary.first_dropped > 0 || summary.second_dropped > 0 {
        tracing::warn!(
            first = %summary.first,
            first_dropped = summary.first_dropped,
            second = %summary.second,
            second_dropped = summary.second_dropped,
            "Dates present in only one series were dropped by the join"
        );
    }

    let dataset = AlignedDataset::new(first.asset(), second.asset(), first.granularity(), rows)?;
    Ok(Alignment { dataset, summary })
}
