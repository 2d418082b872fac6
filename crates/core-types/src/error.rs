use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown asset identifier: '{0}'")]
    UnknownAsset(String),

    #[error("Unknown granularity: '{0}' (expected 'daily' or 'weekly')")]
    UnknownGranularity(String),

    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Series for {asset} is not strictly increasing at {date}")]
    UnorderedSeries { asset: String, date: NaiveDate },
}
