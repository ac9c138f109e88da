//! Parsing of raw price tables into day-offset series.

use crate::core::error::TrendError;
use crate::store::SeriesStore;
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// One sample of a parsed series: days since the anchor date and the adjusted close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub offset: i64,
    pub value: f64,
}

/// Samples ordered by ascending offset, all strictly after the anchor date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSeries {
    points: Vec<PricePoint>,
}

impl ParsedSeries {
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.offset);
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Adj Close")]
    adj_close: f64,
}

/// Reads the persisted table for `symbol` in `category` and parses it.
pub fn parse(
    store: &SeriesStore,
    symbol: &str,
    category: &str,
    anchor: NaiveDate,
) -> Result<ParsedSeries, TrendError> {
    let (file, path) = store.open(category, symbol)?;
    let series = parse_reader(file, anchor, &path)?;
    debug!(
        symbol,
        category,
        points = series.len(),
        "Parsed raw table {}",
        path.display()
    );
    Ok(series)
}

/// Parses a CSV table with `Date` (`YYYY-MM-DD`) and `Adj Close` columns.
///
/// Rows dated on or before `anchor` are dropped. The source lists the newest
/// row first, so the result is re-ordered by ascending offset. `path` is only
/// used in error messages.
pub fn parse_reader<R: Read>(
    reader: R,
    anchor: NaiveDate,
    path: &Path,
) -> Result<ParsedSeries, TrendError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| TrendError::Parse {
        path: path.to_path_buf(),
        row: 0,
        reason: e.to_string(),
    })?;
    for column in ["Date", "Adj Close"] {
        if !headers.iter().any(|h| h == column) {
            return Err(TrendError::Parse {
                path: path.to_path_buf(),
                row: 0,
                reason: format!("missing column '{column}'"),
            });
        }
    }

    let mut points = Vec::new();
    for (i, result) in rdr.deserialize::<RawRecord>().enumerate() {
        let record = result.map_err(|e| TrendError::Parse {
            path: path.to_path_buf(),
            row: i + 1,
            reason: e.to_string(),
        })?;
        if !record.adj_close.is_finite() {
            return Err(TrendError::Parse {
                path: path.to_path_buf(),
                row: i + 1,
                reason: "non-finite adjusted close".to_string(),
            });
        }

        let offset = (record.date - anchor).num_days();
        if offset > 0 {
            points.push(PricePoint {
                offset,
                value: record.adj_close,
            });
        }
    }

    Ok(ParsedSeries::from_points(points))
}
