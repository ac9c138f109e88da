//! Core pipeline: parsing, trend fitting, aggregation and testing

pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod error;
pub mod fetch;
pub mod log;
pub mod regression;
pub mod series;
pub mod welch;

// Re-export main types for cleaner imports
pub use aggregate::{CategorySlopes, SymbolOutcome};
pub use error::TrendError;
pub use fetch::SeriesFetcher;
pub use welch::{Verdict, WelchTest};
