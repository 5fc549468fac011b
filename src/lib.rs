//! Filtered summary statistics over a table of Bebras Challenge results.
//!
//! The pipeline is load once, index the filter options, then filter and aggregate on every
//! selection change. [`dashboard::recompute`] is the pure entry point; [`dashboard::Dashboard`]
//! bundles the loaded dataset with its option index.

pub mod aggregate;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod loader;
pub mod models;
pub mod options;
pub mod report;

pub use aggregate::{AggregateResults, AggregateSettings};
pub use dashboard::{recompute, Dashboard};
pub use error::{LoadError, Notice};
pub use filter::{apply_filters, Dimension, FilterSelection, FilteredView};
pub use models::{Config, Dataset, Record};
pub use options::OptionIndex;
