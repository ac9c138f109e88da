//! Retrieval abstraction for raw price tables

use crate::core::error::TrendError;
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    /// Downloads the raw table for `symbol` and stores it under `category`,
    /// returning where it was written.
    async fn fetch(&self, symbol: &str, category: &str) -> Result<PathBuf, TrendError>;
}
