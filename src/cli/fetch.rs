use super::ui;
use crate::core::config::{AppConfig, FailurePolicy};
use crate::core::{SeriesFetcher, TrendError};
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct FetchResult {
    pub category: String,
    pub symbol: String,
    pub result: Result<PathBuf, TrendError>,
}

/// Downloads every configured symbol, one at a time, in configuration order.
pub async fn fetch_all(
    config: &AppConfig,
    fetcher: &dyn SeriesFetcher,
    update_callback: &(dyn Fn() + Send + Sync),
) -> Result<Vec<FetchResult>> {
    let mut results = Vec::new();
    for category in &config.categories {
        for symbol in &category.symbols {
            let result = match fetcher.fetch(symbol, &category.name).await {
                Err(e) if config.failure_policy == FailurePolicy::Abort => {
                    return Err(e)
                        .with_context(|| format!("Failed to fetch {symbol} ({})", category.name));
                }
                other => other,
            };
            update_callback();
            if let Err(e) = &result {
                warn!(symbol = %symbol, category = %category.name, error = %e, "Fetch failed");
            }
            results.push(FetchResult {
                category: category.name.clone(),
                symbol: symbol.clone(),
                result,
            });
        }
    }
    Ok(results)
}

pub fn display_fetch_results(results: &[FetchResult]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell("Symbol"),
        ui::header_cell("Stored at"),
    ]);
    for r in results {
        let location = match &r.result {
            Ok(path) => Cell::new(path.display()),
            Err(e) => ui::error_cell(&e.to_string()),
        };
        table.add_row(vec![Cell::new(&r.category), Cell::new(&r.symbol), location]);
    }

    let failed = results.iter().filter(|r| r.result.is_err()).count();
    let status = if failed == 0 {
        ui::style_text("all symbols fetched", ui::StyleType::Positive)
    } else {
        ui::style_text(&format!("{failed} symbols failed"), ui::StyleType::Error)
    };
    format!("{table}\n\n{status}")
}

pub async fn run(config: &AppConfig, fetcher: &dyn SeriesFetcher) -> Result<()> {
    let total: usize = config.categories.iter().map(|c| c.symbols.len()).sum();
    info!("Fetching {total} price tables");

    let pb = ui::new_progress_bar(total as u64, true);
    pb.set_message("Fetching price tables...");
    let pb_tick = pb.clone();
    let results = fetch_all(config, fetcher, &move || pb_tick.inc(1)).await;
    pb.finish_and_clear();

    println!("{}", display_fetch_results(&results?));
    Ok(())
}
