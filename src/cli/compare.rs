use super::ui;
use crate::core::analysis::{self, ComparisonReport};
use crate::core::config::AppConfig;
use crate::core::{CategorySlopes, SeriesFetcher, SymbolOutcome, Verdict};
use crate::store::SeriesStore;
use anyhow::{Context, Result};
use comfy_table::Cell;

impl CategorySlopes {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell("Points"),
            ui::header_cell("Slope (/day)"),
            ui::header_cell("Intercept"),
            ui::header_cell("R²"),
            ui::header_cell("Status"),
        ]);

        for result in &self.results {
            let (fit, status) = match &result.outcome {
                SymbolOutcome::Retained { fit } => (Some(fit), Cell::new("retained")),
                SymbolOutcome::NonPositive { fit } => (
                    Some(fit),
                    Cell::new(ui::style_text("non-positive", ui::StyleType::Subtle)),
                ),
                SymbolOutcome::Failed { error } => (None, ui::error_cell(error)),
            };

            table.add_row(vec![
                Cell::new(&result.symbol),
                ui::format_optional_cell(fit.map(|f| f.points), |p| p.to_string()),
                fit.map_or_else(ui::na_cell, |f| ui::slope_cell(f.slope)),
                ui::format_optional_cell(fit.map(|f| f.intercept), |v| format!("{v:.4}")),
                ui::format_optional_cell(fit.map(|f| f.r_squared), |v| format!("{v:.3}")),
                status,
            ]);
        }

        format!(
            "Category: {}\n\n{}\n\nRetained {} of {} symbols",
            ui::style_text(&self.category, ui::StyleType::Title),
            table,
            ui::style_text(&self.slopes.len().to_string(), ui::StyleType::Label),
            self.results.len()
        )
    }
}

impl ComparisonReport {
    pub fn display_summary(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Category"),
            ui::header_cell("Slopes"),
            ui::header_cell("Mean slope (/day)"),
        ]);
        table.add_row(vec![
            Cell::new(&self.first.category),
            Cell::new(self.test.n_a),
            Cell::new(format!("{:.6}", self.test.mean_a)),
        ]);
        table.add_row(vec![
            Cell::new(&self.second.category),
            Cell::new(self.test.n_b),
            Cell::new(format!("{:.6}", self.test.mean_b)),
        ]);

        let verdict = match self.verdict {
            Verdict::NoSignificantDifference => ui::style_text(
                "no significant difference between the groups",
                ui::StyleType::Negative,
            ),
            Verdict::FirstOutperforms => ui::style_text(
                &format!("{} outperforms {}", self.first.category, self.second.category),
                ui::StyleType::Positive,
            ),
            Verdict::SecondOutperforms => ui::style_text(
                &format!("{} outperforms {}", self.second.category, self.first.category),
                ui::StyleType::Positive,
            ),
        };

        format!(
            "{}\n\n{}\n\nWelch's t = {:.4}, df = {:.2}, p = {:.6}\nAt alpha = {}: {}",
            ui::style_text("Welch's t-test", ui::StyleType::Title),
            table,
            self.test.statistic,
            self.test.degrees_of_freedom,
            self.test.p_value,
            self.alpha,
            verdict
        )
    }
}

pub async fn run(
    config: &AppConfig,
    fetcher: &dyn SeriesFetcher,
    store: &SeriesStore,
    offline: bool,
    json: bool,
) -> Result<()> {
    let (first, second) = config.compared_categories()?;
    let total = (first.symbols.len() + second.symbols.len()) as u64;

    let pb = ui::new_progress_bar(total, true);
    pb.set_message(if offline {
        "Parsing stored tables..."
    } else {
        "Fetching price tables..."
    });
    let pb_tick = pb.clone();
    let result =
        analysis::run_comparison(config, fetcher, store, offline, &move || pb_tick.inc(1)).await;
    pb.finish_and_clear();
    let report = result?;

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{out}");
        return Ok(());
    }

    println!("{}", report.first.display_as_table());
    ui::print_separator();
    println!("{}", report.second.display_as_table());
    ui::print_separator();
    println!("{}", report.display_summary());
    Ok(())
}
