//! Per-category slope collection.

use crate::core::config::FailurePolicy;
use crate::core::error::TrendError;
use crate::core::fetch::SeriesFetcher;
use crate::core::regression::{self, TrendFit};
use crate::core::series;
use crate::store::SeriesStore;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

/// What happened to one configured symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    /// Positive slope, counted in the category's collection.
    Retained { fit: TrendFit },
    /// Slope `<= 0.0`, left out of the collection.
    NonPositive { fit: TrendFit },
    /// Fetch, parse or fit failed and the symbol was skipped.
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolResult {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: SymbolOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySlopes {
    pub category: String,
    /// Positive slopes, in configuration order. Duplicated symbols count twice.
    pub slopes: Vec<f64>,
    /// One entry per configured symbol.
    pub results: Vec<SymbolResult>,
}

impl CategorySlopes {
    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SymbolOutcome::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub anchor: NaiveDate,
    pub failure_policy: FailurePolicy,
    /// Skip the download and use the tables already on disk.
    pub offline: bool,
}

async fn fit_symbol(
    symbol: &str,
    category: &str,
    fetcher: &dyn SeriesFetcher,
    store: &SeriesStore,
    options: &AggregateOptions,
) -> Result<TrendFit, TrendError> {
    if !options.offline {
        fetcher.fetch(symbol, category).await?;
    }
    let parsed = series::parse(store, symbol, category, options.anchor)?;
    regression::fit(&parsed)
}

/// Fetches, parses and fits every symbol of a category in order, collecting
/// the positive slopes. Symbols are processed one at a time.
pub async fn aggregate(
    symbols: &[String],
    category: &str,
    fetcher: &dyn SeriesFetcher,
    store: &SeriesStore,
    options: &AggregateOptions,
    update_callback: &(dyn Fn() + Send + Sync),
) -> Result<CategorySlopes, TrendError> {
    let mut collected = CategorySlopes {
        category: category.to_string(),
        slopes: Vec::new(),
        results: Vec::with_capacity(symbols.len()),
    };

    for symbol in symbols {
        let outcome = match fit_symbol(symbol, category, fetcher, store, options).await {
            Ok(fit) if fit.slope > 0.0 => {
                debug!(symbol = %symbol, slope = fit.slope, "Retained");
                collected.slopes.push(fit.slope);
                SymbolOutcome::Retained { fit }
            }
            Ok(fit) => {
                debug!(symbol = %symbol, slope = fit.slope, "Dropped non-positive slope");
                SymbolOutcome::NonPositive { fit }
            }
            Err(e) => match options.failure_policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::Isolate => {
                    warn!(symbol = %symbol, category, error = %e, "Skipping symbol");
                    SymbolOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            },
        };

        collected.results.push(SymbolResult {
            symbol: symbol.clone(),
            outcome,
        });
        update_callback();
    }

    Ok(collected)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2011, 2, 9).unwrap()
    }

    /// Newest-first table whose adjusted close grows by `slope` per day.
    pub(crate) fn synthetic_table(slope: f64, days: i64) -> String {
        let mut csv = String::from("Date,Adj Close\n");
        for day in (1..=days).rev() {
            let date = anchor() + chrono::Duration::days(day);
            csv.push_str(&format!(
                "{},{}\n",
                date.format("%Y-%m-%d"),
                100.0 + slope * day as f64
            ));
        }
        csv
    }

    /// Writes synthetic tables into the store instead of going to the network.
    pub(crate) struct MockFetcher {
        store: SeriesStore,
        slopes: HashMap<String, f64>,
        errors: HashMap<String, String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub(crate) fn new(store: SeriesStore) -> Self {
            MockFetcher {
                store,
                slopes: HashMap::new(),
                errors: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn add_slope(&mut self, symbol: &str, slope: f64) {
            self.slopes.insert(symbol.to_string(), slope);
        }

        pub(crate) fn add_error(&mut self, symbol: &str, error_msg: &str) {
            self.errors
                .insert(symbol.to_string(), error_msg.to_string());
        }
    }

    #[async_trait]
    impl SeriesFetcher for MockFetcher {
        async fn fetch(&self, symbol: &str, category: &str) -> Result<PathBuf, TrendError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            if let Some(msg) = self.errors.get(symbol) {
                return Err(TrendError::Retrieval {
                    symbol: symbol.to_string(),
                    reason: msg.clone(),
                });
            }
            let slope = self.slopes.get(symbol).copied().unwrap_or(0.0);
            self.store
                .write(category, symbol, synthetic_table(slope, 30).as_bytes())
        }
    }

    fn options(policy: FailurePolicy) -> AggregateOptions {
        AggregateOptions {
            anchor: anchor(),
            failure_policy: policy,
            offline: false,
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_keeps_only_positive_slopes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        store.create_category_dirs(["US_bond"]).unwrap();

        let mut fetcher = MockFetcher::new(store.clone());
        fetcher.add_slope("UP", 1.0);
        fetcher.add_slope("DOWN", -1.0);
        fetcher.add_slope("FLAT", 0.0);
        fetcher.add_slope("UP2", 2.0);

        let progress = AtomicUsize::new(0);
        let result = aggregate(
            &symbols(&["UP", "DOWN", "FLAT", "UP2"]),
            "US_bond",
            &fetcher,
            &store,
            &options(FailurePolicy::Isolate),
            &|| {
                progress.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await
        .unwrap();

        assert_eq!(result.slopes.len(), 2);
        approx::assert_relative_eq!(result.slopes[0], 1.0, epsilon = 1e-9);
        approx::assert_relative_eq!(result.slopes[1], 2.0, epsilon = 1e-9);
        assert_eq!(result.results.len(), 4);
        assert!(matches!(
            result.results[1].outcome,
            SymbolOutcome::NonPositive { .. }
        ));
        assert!(matches!(
            result.results[2].outcome,
            SymbolOutcome::NonPositive { .. }
        ));
        assert_eq!(progress.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_duplicates_are_counted_twice() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        store.create_category_dirs(["US_bond"]).unwrap();

        let mut fetcher = MockFetcher::new(store.clone());
        fetcher.add_slope("LBND", 0.5);

        let result = aggregate(
            &symbols(&["LBND", "LBND"]),
            "US_bond",
            &fetcher,
            &store,
            &options(FailurePolicy::Isolate),
            &|| (),
        )
        .await
        .unwrap();

        assert_eq!(result.slopes.len(), 2);
        assert_eq!(*fetcher.calls.lock().unwrap(), vec!["LBND", "LBND"]);
    }

    #[tokio::test]
    async fn test_isolate_records_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        store.create_category_dirs(["emerging_market"]).unwrap();

        let mut fetcher = MockFetcher::new(store.clone());
        fetcher.add_slope("EMB", 0.3);
        fetcher.add_error("BAD", "HTTP error: 404 Not Found");
        fetcher.add_slope("PCY", 0.1);

        let result = aggregate(
            &symbols(&["EMB", "BAD", "PCY"]),
            "emerging_market",
            &fetcher,
            &store,
            &options(FailurePolicy::Isolate),
            &|| (),
        )
        .await
        .unwrap();

        assert_eq!(result.slopes.len(), 2);
        assert_eq!(result.failed(), 1);
        match &result.results[1].outcome {
            SymbolOutcome::Failed { error } => assert!(error.contains("404")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_abort_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        store.create_category_dirs(["emerging_market"]).unwrap();

        let mut fetcher = MockFetcher::new(store.clone());
        fetcher.add_error("BAD", "connection refused");
        fetcher.add_slope("PCY", 0.1);

        let err = aggregate(
            &symbols(&["BAD", "PCY"]),
            "emerging_market",
            &fetcher,
            &store,
            &options(FailurePolicy::Abort),
            &|| (),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TrendError::Retrieval { .. }));
        assert_eq!(*fetcher.calls.lock().unwrap(), vec!["BAD"]);
    }

    #[tokio::test]
    async fn test_offline_uses_stored_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        store.create_category_dirs(["US_bond"]).unwrap();
        store
            .write("US_bond", "TMF", synthetic_table(0.25, 10).as_bytes())
            .unwrap();

        let fetcher = MockFetcher::new(store.clone());
        let opts = AggregateOptions {
            offline: true,
            ..options(FailurePolicy::Isolate)
        };

        let result = aggregate(
            &symbols(&["TMF", "MISSING"]),
            "US_bond",
            &fetcher,
            &store,
            &opts,
            &|| (),
        )
        .await
        .unwrap();

        assert!(fetcher.calls.lock().unwrap().is_empty());
        assert_eq!(result.slopes.len(), 1);
        approx::assert_relative_eq!(result.slopes[0], 0.25, epsilon = 1e-9);
        match &result.results[1].outcome {
            SymbolOutcome::Failed { error } => assert!(error.contains("not found")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_finite_table_is_failed_not_non_positive() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        store.create_category_dirs(["US_bond"]).unwrap();
        store
            .write(
                "US_bond",
                "ODD",
                b"Date,Adj Close\n2012-01-02,NaN\n2012-01-01,1.0\n",
            )
            .unwrap();

        let fetcher = MockFetcher::new(store.clone());
        let opts = AggregateOptions {
            offline: true,
            ..options(FailurePolicy::Isolate)
        };

        let result = aggregate(&symbols(&["ODD"]), "US_bond", &fetcher, &store, &opts, &|| ())
            .await
            .unwrap();

        assert!(result.slopes.is_empty());
        assert_eq!(result.failed(), 1);
        match &result.results[0].outcome {
            SymbolOutcome::Failed { error } => assert!(error.contains("non-finite")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
