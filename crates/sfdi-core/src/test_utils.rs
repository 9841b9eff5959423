//! Shared helpers for unit tests.

use nalgebra::DMatrix;
use std::f64::consts::PI;

/// A uniform `n`-step fringe sequence: every pixel of image `i` holds
/// `offset + amplitude·cos(2π·i/n − phi0)`.
pub(crate) fn cosine_sequence(
    n: usize,
    rows: usize,
    cols: usize,
    offset: f64,
    amplitude: f64,
    phi0: f64,
) -> Vec<DMatrix<f64>> {
    (0..n)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / n as f64;
            DMatrix::from_element(rows, cols, offset + amplitude * (theta - phi0).cos())
        })
        .collect()
}
