//! Welch's two-sample t-test on slope collections.

use crate::core::error::TrendError;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WelchTest {
    pub statistic: f64,
    /// Two-tailed.
    pub p_value: f64,
    pub degrees_of_freedom: f64,
    pub n_a: usize,
    pub n_b: usize,
    pub mean_a: f64,
    pub mean_b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NoSignificantDifference,
    FirstOutperforms,
    SecondOutperforms,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Verdict::NoSignificantDifference => "no significant difference",
                Verdict::FirstOutperforms => "first group outperforms",
                Verdict::SecondOutperforms => "second group outperforms",
            }
        )
    }
}

/// Mean and unbiased (n - 1) variance.
fn mean_and_variance(sample: &[f64]) -> (f64, f64) {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let ss = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    (mean, ss / (n - 1.0))
}

/// Two-sample test for a difference in means without assuming equal variances.
pub fn compare(a: &[f64], b: &[f64]) -> Result<WelchTest, TrendError> {
    if a.len() < 2 {
        return Err(TrendError::insufficient("first sample", a.len(), 2));
    }
    if b.len() < 2 {
        return Err(TrendError::insufficient("second sample", b.len(), 2));
    }

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (mean_a, var_a) = mean_and_variance(a);
    let (mean_b, var_b) = mean_and_variance(b);

    let se_a = var_a / na;
    let se_b = var_b / nb;
    let se2 = se_a + se_b;

    if se2 == 0.0 {
        if mean_a == mean_b {
            return Ok(WelchTest {
                statistic: 0.0,
                p_value: 1.0,
                degrees_of_freedom: na + nb - 2.0,
                n_a: a.len(),
                n_b: b.len(),
                mean_a,
                mean_b,
            });
        }
        return Err(TrendError::DegenerateVariance);
    }

    let statistic = (mean_a - mean_b) / se2.sqrt();
    // Welch-Satterthwaite
    let degrees_of_freedom = se2.powi(2) / (se_a.powi(2) / (na - 1.0) + se_b.powi(2) / (nb - 1.0));

    let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map_err(|e| TrendError::Distribution(e.to_string()))?;
    let p_value = (2.0 * dist.sf(statistic.abs())).min(1.0);

    Ok(WelchTest {
        statistic,
        p_value,
        degrees_of_freedom,
        n_a: a.len(),
        n_b: b.len(),
        mean_a,
        mean_b,
    })
}

/// Reads a test result at significance `alpha`. The two-tailed p-value must be
/// strictly below `alpha / 2`, and the sign of the statistic picks the direction.
pub fn interpret(test: &WelchTest, alpha: f64) -> Verdict {
    if test.p_value >= alpha / 2.0 {
        Verdict::NoSignificantDifference
    } else if test.statistic > 0.0 {
        Verdict::FirstOutperforms
    } else {
        Verdict::SecondOutperforms
    }
}
