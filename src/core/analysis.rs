//! Runs the full comparison: both categories, then the Welch test.
use crate::core::aggregate::{self, AggregateOptions, CategorySlopes};
use crate::core::config::AppConfig;
use crate::core::fetch::SeriesFetcher;
use crate::core::welch::{self, Verdict, WelchTest};
use crate::store::SeriesStore;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

/// Everything a caller needs to report on one comparison run.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub first: CategorySlopes,
    pub second: CategorySlopes,
    pub test: WelchTest,
    pub alpha: f64,
    pub verdict: Verdict,
}

/// Aggregates the two compared categories in order and tests the difference
/// of their mean slopes.
pub async fn run_comparison(
    config: &AppConfig,
    fetcher: &dyn SeriesFetcher,
    store: &SeriesStore,
    offline: bool,
    update_callback: &(dyn Fn() + Send + Sync),
) -> Result<ComparisonReport> {
    let (first_category, second_category) = config.compared_categories()?;
    let options = AggregateOptions {
        anchor: config.anchor_date,
        failure_policy: config.failure_policy,
        offline,
    };

    let mut collected = Vec::with_capacity(2);
    for category in [first_category, second_category] {
        info!(
            "Collecting slopes for {} ({} symbols)",
            category.name,
            category.symbols.len()
        );
        let slopes = aggregate::aggregate(
            &category.symbols,
            &category.name,
            fetcher,
            store,
            &options,
            update_callback,
        )
        .await
        .with_context(|| format!("Failed to collect slopes for {}", category.name))?;
        info!(
            "{}: {} of {} symbols retained, {} failed",
            category.name,
            slopes.slopes.len(),
            category.symbols.len(),
            slopes.failed()
        );
        collected.push(slopes);
    }
    let second = collected.pop().context("missing second category")?;
    let first = collected.pop().context("missing first category")?;

    let test = welch::compare(&first.slopes, &second.slopes).with_context(|| {
        format!(
            "Cannot compare {} ({} slopes) with {} ({} slopes)",
            first.category,
            first.slopes.len(),
            second.category,
            second.slopes.len()
        )
    })?;
    let verdict = welch::interpret(&test, config.alpha);
    info!(
        statistic = test.statistic,
        p_value = test.p_value,
        %verdict,
        "Comparison complete"
    );

    Ok(ComparisonReport {
        first,
        second,
        test,
        alpha: config.alpha,
        verdict,
    })
}
