//! NaN-aware summary statistics of recovered property maps.
//!
//! Inversion marks out-of-domain pixels NaN; the aggregator skips them and
//! reports how many valid samples remain.

use nalgebra::DMatrix;

/// Errors from aggregating a property map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    /// Every pixel of the map is NaN.
    AllInvalid,
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllInvalid => write!(f, "no valid pixels to aggregate"),
        }
    }
}

impl std::error::Error for StatsError {}

/// Mean and spread of the valid pixels of one map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    /// Population standard deviation of the valid pixels.
    pub std_dev: f64,
    /// Number of non-NaN pixels that entered the summary.
    pub n_valid: usize,
}

/// Summarize the non-NaN pixels of `map`.
pub fn summarize(map: &DMatrix<f64>) -> Result<Summary, StatsError> {
    let mut n = 0usize;
    let mut sum = 0.0;
    for &v in map.iter() {
        if !v.is_nan() {
            n += 1;
            sum += v;
        }
    }
    if n == 0 {
        return Err(StatsError::AllInvalid);
    }
    let mean = sum / n as f64;

    let mut ss = 0.0;
    for &v in map.iter() {
        if !v.is_nan() {
            let d = v - mean;
            ss += d * d;
        }
    }
    Ok(Summary {
        mean,
        std_dev: (ss / n as f64).sqrt(),
        n_valid: n,
    })
}
