//! Least-squares trend fitting.

use crate::core::error::TrendError;
use crate::core::series::ParsedSeries;
use serde::Serialize;

/// Result of a simple linear regression of value against day offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendFit {
    /// Change in adjusted close per day.
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub points: usize,
}

/// Fits `value = intercept + slope * offset` by ordinary least squares.
///
/// Needs at least two distinct offsets.
pub fn fit(series: &ParsedSeries) -> Result<TrendFit, TrendError> {
    let points = series.points();
    let n = points.len();
    if n < 2 {
        return Err(TrendError::insufficient("trend fit (points)", n, 2));
    }

    let nf = n as f64;
    let mean_x = points.iter().map(|p| p.offset as f64).sum::<f64>() / nf;
    let mean_y = points.iter().map(|p| p.value).sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for p in points {
        let dx = p.offset as f64 - mean_x;
        let dy = p.value - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    // All offsets equal
    if sxx == 0.0 {
        return Err(TrendError::insufficient("trend fit (distinct offsets)", 1, 2));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };

    Ok(TrendFit {
        slope,
        intercept,
        r_squared,
        points: n,
    })
}

pub fn slope(series: &ParsedSeries) -> Result<f64, TrendError> {
    fit(series).map(|f| f.slope)
}
