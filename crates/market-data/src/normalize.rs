use api_client::RawRecord;
use chrono::{DateTime, Utc};
use core_types::{Asset, AssetSeries, CoreError, DateRange, Granularity, MarketRecord};

/// Counts of what normalization discarded, for logging and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub received: usize,
    /// Records whose price was missing, non-finite or not positive.
    pub missing_price: usize,
    pub out_of_range: usize,
    /// Records replaced by a later record for the same date.
    pub duplicates: usize,
    pub kept: usize,
}

/// Converts raw provider records into a clean `AssetSeries`.
///
/// Each timestamp is mapped to its UTC calendar date and then to the
/// granularity's bucket. When several records share a bucket the one with the
/// latest timestamp wins; among identical timestamps the one received last
/// wins, which resolves overlap between paginated requests.
pub fn normalize(
    asset: Asset,
    granularity: Granularity,
    range: DateRange,
    raw: Vec<RawRecord>,
) -> Result<(AssetSeries, NormalizeReport), CoreError> {
    let mut report = NormalizeReport {
        received: raw.len(),
        ..NormalizeReport::default()
    };

    let mut candidates: Vec<(DateTime<Utc>, MarketRecord)> = Vec::with_capacity(raw.len());
    for record in raw {
        let price = match record.price {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => {
                report.missing_price += 1;
                continue;
            }
        };

        let date = record.timestamp.date_naive();
        if !range.contains(date) {
            report.out_of_range += 1;
            continue;
        }

        candidates.push((
            record.timestamp,
            MarketRecord {
                date: granularity.bucket(date),
                price,
                volume: record
                    .volume
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .unwrap_or(0.0),
                market_cap: record.market_cap.filter(|m| m.is_finite() && *m >= 0.0),
            },
        ));
    }

    // Stable, so equal timestamps keep their arrival order.
    candidates.sort_by_key(|(ts, _)| *ts);

    let mut records: Vec<MarketRecord> = Vec::with_capacity(candidates.len());
    for (_, record) in candidates {
        match records.last_mut() {
            Some(last) if last.date == record.date => {
                *last = record;
                report.duplicates += 1;
            }
            _ => records.push(record),
        }
    }
    report.kept = records.len();

    if report.missing_price > 0 {
        tracing::warn!(
            %asset,
            dropped = report.missing_price,
            "Discarded records without a usable price"
        );
    }

    let series = AssetSeries::new(asset, granularity, records)?;
    for (before, after) in series.gaps() {
        tracing::warn!(%asset, %before, %after, "Gap in series exceeds the sampling interval");
    }
    tracing::debug!(%asset, ?report, "Normalized series");

    Ok((series, report))
}
