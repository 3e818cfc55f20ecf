//! Robust velocity noise estimates used as detection thresholds
//!
//! All statistics ignore NaN samples and are computed independently for the
//! horizontal and vertical axis.

use crate::types::{GazeError, Result};
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Method for estimating the per-axis velocity noise level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// Standard deviation
    Std,
    /// Median absolute deviation from the median
    Mad,
    /// `sqrt(median(x²) - median(x)²)` (Engbert & Kliegl, 2003)
    Engbert2003,
    /// `sqrt(median((x - median(x))²))` (Engbert et al., 2015)
    #[default]
    Engbert2015,
}

impl ThresholdMethod {
    pub const VALID: &'static [&'static str] = &["std", "mad", "engbert2003", "engbert2015"];
}

impl FromStr for ThresholdMethod {
    type Err = GazeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "std" => Ok(ThresholdMethod::Std),
            "mad" => Ok(ThresholdMethod::Mad),
            "engbert2003" => Ok(ThresholdMethod::Engbert2003),
            "engbert2015" => Ok(ThresholdMethod::Engbert2015),
            other => Err(GazeError::unknown_option("threshold method", other, Self::VALID)),
        }
    }
}

impl fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThresholdMethod::Std => "std",
            ThresholdMethod::Mad => "mad",
            ThresholdMethod::Engbert2003 => "engbert2003",
            ThresholdMethod::Engbert2015 => "engbert2015",
        };
        write!(f, "{}", name)
    }
}

/// Compute the velocity threshold of both axes
///
/// # Arguments
/// * `velocities` - Velocities of shape `(N, 2)`
/// * `method` - Noise estimate to use
///
/// # Returns
/// * `[thx, thy]`; an axis without any valid sample yields NaN
pub fn compute_threshold(velocities: ArrayView2<'_, f64>, method: ThresholdMethod) -> Result<[f64; 2]> {
    if velocities.ncols() != 2 {
        return Err(GazeError::InvalidShape {
            name: "velocities",
            message: format!("velocities must have shape (N, 2) but have shape {:?}", velocities.shape()),
        });
    }

    let thx = axis_threshold(velocities.index_axis(Axis(1), 0), method);
    let thy = axis_threshold(velocities.index_axis(Axis(1), 1), method);

    log::debug!("threshold ({}): [{}, {}]", method, thx, thy);
    Ok([thx, thy])
}

fn axis_threshold(axis: ArrayView1<'_, f64>, method: ThresholdMethod) -> f64 {
    let values: Vec<f64> = axis.iter().copied().filter(|v| !v.is_nan()).collect();

    match method {
        ThresholdMethod::Std => nanstd(&values),
        ThresholdMethod::Mad => {
            let center = median(&values);
            median(&values.iter().map(|v| (v - center).abs()).collect::<Vec<_>>())
        }
        ThresholdMethod::Engbert2003 => {
            let squared: Vec<f64> = values.iter().map(|v| v * v).collect();
            (median(&squared) - median(&values).powi(2)).sqrt()
        }
        ThresholdMethod::Engbert2015 => {
            let center = median(&values);
            median(&values.iter().map(|v| (v - center).powi(2)).collect::<Vec<_>>()).sqrt()
        }
    }
}

/// Median of NaN-free values; the mean of the two middle values for even counts
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation of NaN-free values
fn nanstd(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
