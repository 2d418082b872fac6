//! # Analytics Engine
//!
//! Derives trend, risk and correlation statistics from an `AlignedDataset`.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** no I/O and no knowledge of where the data came from. It
//!   depends only on `core-types` and on the parameters handed to it.
//! - **Stateless calculation:** `AnalyticsEngine` reads its input immutably
//!   and returns a fresh `MetricsReport` every time. Identical input and
//!   parameters give identical output.
//! - **Local failure:** a metric that lacks data is recorded as skipped; the
//!   others are still computed.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: orchestrates the full battery of metrics.
//! - `stats`: the individual formulas, usable on plain slices.
//! - `MetricsReport` / `MetricResult`: the named results.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;
pub mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::{
    LagCorrelation, LeadLagProfile, MetricResult, MetricsReport, MonthlyCorrelation, SeriesPoint,
};
