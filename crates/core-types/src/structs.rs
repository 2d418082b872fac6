use crate::enums::{Asset, Granularity};
use crate::error::CoreError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending at (and including) `today`.
    pub fn trailing(days: u32, today: NaiveDate) -> Result<Self, CoreError> {
        if days == 0 {
            return Err(CoreError::InvalidInput(
                "lookback_days".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let start = today
            .checked_sub_signed(Duration::days(i64::from(days) - 1))
            .ok_or_else(|| {
                CoreError::InvalidInput(
                    "lookback_days".to_string(),
                    format!("{} days before {} is outside the calendar", days, today),
                )
            })?;
        Self::new(start, today)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both bounds included.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Midnight UTC of the first day.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Last second of the final day, UTC.
    pub fn end_time(&self) -> DateTime<Utc> {
        (self.end.and_time(chrono::NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1))
            .and_utc()
    }

    /// Splits the range into consecutive sub-ranges of at most `max_span_days`
    /// days each, in ascending order, covering the range exactly once.
    pub fn chunks(&self, max_span_days: u32) -> Vec<DateRange> {
        let span = i64::from(max_span_days.max(1));
        let mut ranges = Vec::new();
        let mut from = self.start;

        while from <= self.end {
            let to = from
                .checked_add_signed(Duration::days(span - 1))
                .map_or(self.end, |to| to.min(self.end));
            ranges.push(DateRange { start: from, end: to });
            match to.succ_opt() {
                Some(next) => from = next,
                None => break,
            }
        }

        ranges
    }
}

/// A single normalized observation for one asset on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub date: NaiveDate,
    /// Price in the quote currency. Always positive.
    pub price: f64,
    pub volume: f64,
    pub market_cap: Option<f64>,
}

impl MarketRecord {
    pub fn observation(&self) -> Observation {
        Observation {
            price: self.price,
            volume: self.volume,
            market_cap: self.market_cap,
        }
    }
}

/// Ordered per-date market observations for one asset.
///
/// Dates are strictly increasing and every price is positive; both are
/// checked on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    asset: Asset,
    granularity: Granularity,
    records: Vec<MarketRecord>,
}

impl AssetSeries {
    pub fn new(
        asset: Asset,
        granularity: Granularity,
        records: Vec<MarketRecord>,
    ) -> Result<Self, CoreError> {
        for pair in records.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(CoreError::UnorderedSeries {
                    asset: asset.to_string(),
                    date: pair[1].date,
                });
            }
        }
        if let Some(bad) = records.iter().find(|r| !(r.price.is_finite() && r.price > 0.0)) {
            return Err(CoreError::InvalidInput(
                format!("{} price on {}", asset, bad.date),
                format!("{} is not a positive number", bad.price),
            ));
        }

        Ok(Self {
            asset,
            granularity,
            records,
        })
    }

    pub fn asset(&self) -> Asset {
        self.asset
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn records(&self) -> &[MarketRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.price).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Consecutive date pairs further apart than the native sampling interval.
    pub fn gaps(&self) -> Vec<(NaiveDate, NaiveDate)> {
        let interval = self.granularity.interval_days();
        self.records
            .windows(2)
            .filter(|w| (w[1].date - w[0].date).num_days() > interval)
            .map(|w| (w[0].date, w[1].date))
            .collect()
    }
}

/// The values of one asset on one row of an `AlignedDataset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub price: f64,
    pub volume: f64,
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub first: Observation,
    pub second: Observation,
}

/// Two asset series joined on their shared dates.
///
/// Every row carries both assets' observations and rows are strictly
/// ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedDataset {
    first: Asset,
    second: Asset,
    granularity: Granularity,
    rows: Vec<AlignedRow>,
}

impl AlignedDataset {
    pub fn new(
        first: Asset,
        second: Asset,
        granularity: Granularity,
        rows: Vec<AlignedRow>,
    ) -> Result<Self, CoreError> {
        if first == second {
            return Err(CoreError::InvalidInput(
                "asset pair".to_string(),
                format!("{} cannot be aligned with itself", first),
            ));
        }
        for pair in rows.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(CoreError::UnorderedSeries {
                    asset: format!("{}/{}", first, second),
                    date: pair[1].date,
                });
            }
        }
        for row in &rows {
            for (asset, obs) in [(first, &row.first), (second, &row.second)] {
                if !(obs.price.is_finite() && obs.price > 0.0) {
                    return Err(CoreError::InvalidInput(
                        format!("{} price on {}", asset, row.date),
                        format!("{} is not a positive number", obs.price),
                    ));
                }
            }
        }
        Ok(Self {
            first,
            second,
            granularity,
            rows,
        })
    }

    pub fn first(&self) -> Asset {
        self.first
    }

    pub fn second(&self) -> Asset {
        self.second
    }

    pub fn assets(&self) -> [Asset; 2] {
        [self.first, self.second]
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// The observation for `asset` on a row, if the asset is part of this dataset.
    pub fn observation<'a>(&self, row: &'a AlignedRow, asset: Asset) -> Option<&'a Observation> {
        if asset == self.first {
            Some(&row.first)
        } else if asset == self.second {
            Some(&row.second)
        } else {
            None
        }
    }

    /// Price column for `asset`, or `None` if it is not one of the pair.
    pub fn prices(&self, asset: Asset) -> Option<Vec<f64>> {
        if asset != self.first && asset != self.second {
            return None;
        }
        Some(
            self.rows
                .iter()
                .filter_map(|row| self.observation(row, asset).map(|o| o.price))
                .collect(),
        )
    }
}

/// Point-in-time market data for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub asset: Asset,
    pub observed_at: DateTime<Utc>,
    pub price: f64,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_change_pct_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
}
