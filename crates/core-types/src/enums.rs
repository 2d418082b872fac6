use crate::error::CoreError;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The assets this system knows how to fetch and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Bitcoin,
    Ethereum,
}

impl Asset {
    /// The identifier the market-data API uses for this asset.
    pub fn api_id(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "bitcoin",
            Asset::Ethereum => "ethereum",
        }
    }

    /// Lowercase ticker, used as the prefix of every per-asset metric name.
    pub fn ticker(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "btc",
            Asset::Ethereum => "eth",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker().to_uppercase().as_str())
    }
}

impl FromStr for Asset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Asset::Bitcoin),
            "ethereum" | "eth" => Ok(Asset::Ethereum),
            _ => Err(CoreError::UnknownAsset(s.to_string())),
        }
    }
}

/// The sampling interval of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
}

impl Granularity {
    /// Maps a calendar date onto the bucket it belongs to.
    ///
    /// Daily buckets are the date itself; weekly buckets are keyed by the
    /// Monday of the ISO week.
    pub fn bucket(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => date,
            Granularity::Weekly => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
        }
    }

    /// The native distance between two consecutive observations, in days.
    pub fn interval_days(&self) -> i64 {
        match self {
            Granularity::Daily => 1,
            Granularity::Weekly => 7,
        }
    }

    /// Number of periods in a year. Crypto trades every calendar day, so the
    /// daily factor is 365 rather than the 252 used for equities.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Granularity::Daily => 365.0,
            Granularity::Weekly => 52.0,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Daily => f.write_str("daily"),
            Granularity::Weekly => f.write_str("weekly"),
        }
    }
}

impl FromStr for Granularity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "1d" | "day" => Ok(Granularity::Daily),
            "weekly" | "1w" | "week" => Ok(Granularity::Weekly),
            _ => Err(CoreError::UnknownGranularity(s.to_string())),
        }
    }
}
