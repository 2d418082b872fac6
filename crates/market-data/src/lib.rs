//! # Market Data Pipeline
//!
//! Turns a provider's raw, possibly paginated and rate-limited history into
//! clean per-asset series, and joins two of them into an `AlignedDataset` that
//! the analytics crate can assume is complete and ordered.
//!
//! - `Fetcher`: validation, range chunking and bounded retry around any
//!   `MarketDataSource`.
//! - `normalize`: raw records to an `AssetSeries` (missing prices dropped,
//!   sorted, one record per date).
//! - `align`: inner join of two series on their shared dates.
//! - `export`: JSON export and re-import of an aligned dataset.

pub mod align;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod normalize;

pub use align::{align, Alignment, AlignmentSummary};
pub use error::{ExportError, FetchError};
pub use export::{export_dataset, load_dataset};
pub use fetcher::Fetcher;
pub use normalize::{normalize, NormalizeReport};
