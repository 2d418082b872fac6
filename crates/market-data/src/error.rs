use api_client::error::ApiError;
use core_types::{Asset, CoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(
        "Rate limit still exceeded for {asset} after {attempts} attempts; back off and retry later"
    )]
    RateLimited { asset: Asset, attempts: u32 },

    #[error("Fetching {asset} failed after {attempts} attempt(s): {cause}")]
    FetchFailed {
        asset: Asset,
        attempts: u32,
        #[source]
        cause: ApiError,
    },

    #[error("{first} and {second} share no dates in the requested range")]
    AlignmentEmpty { first: Asset, second: Asset },
}

impl FetchError {
    /// Stable name of the error kind, as printed by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidRequest(_) => "InvalidRequest",
            FetchError::RateLimited { .. } => "RateLimited",
            FetchError::FetchFailed { .. } => "FetchFailed",
            FetchError::AlignmentEmpty { .. } => "AlignmentEmpty",
        }
    }
}

impl From<CoreError> for FetchError {
    fn from(err: CoreError) -> Self {
        FetchError::InvalidRequest(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write or read export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode export document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Exported dataset is invalid: {0}")]
    Invalid(#[from] CoreError),
}
