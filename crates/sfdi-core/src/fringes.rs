//! Projector pattern generation.
//!
//! Produces the phase-stepped patterns displayed during acquisition:
//! sinusoidal fringes at a given spatial frequency and orientation,
//! normalized into the projector's [0, 1] intensity range, plus a
//! thresholded binary variant for projectors without gray levels.

use nalgebra::DMatrix;
use std::f64::consts::PI;

/// Generate `phase_count` sinusoidal fringe patterns of `width` x `height`
/// pixels (rows x columns follow image convention: `height` rows).
///
/// `freq` is in cycles per pixel along the modulation axis; `orientation`
/// rotates that axis (0 modulates along x). Each pattern is min-max
/// normalized into [0, 1]; a zero-frequency pattern degenerates to a
/// uniform field of 0.5.
pub fn sinusoidal_patterns(
    freq: f64,
    phase_count: usize,
    orientation: f64,
    width: usize,
    height: usize,
) -> Vec<DMatrix<f64>> {
    let (sin_o, cos_o) = orientation.sin_cos();
    (0..phase_count)
        .map(|i| {
            let phase = 2.0 * PI * i as f64 / phase_count as f64;
            let raw = DMatrix::from_fn(height, width, |r, c| {
                let axis = sin_o * c as f64 - cos_o * r as f64;
                (2.0 * PI * freq * axis + phase).cos()
            });
            normalize_unit(raw)
        })
        .collect()
}

/// Binary variant of [`sinusoidal_patterns`]: each pixel thresholded at 0.5.
pub fn binary_patterns(
    freq: f64,
    phase_count: usize,
    orientation: f64,
    width: usize,
    height: usize,
) -> Vec<DMatrix<f64>> {
    sinusoidal_patterns(freq, phase_count, orientation, width, height)
        .into_iter()
        .map(|p| p.map(|v| if v >= 0.5 { 1.0 } else { 0.0 }))
        .collect()
}

/// Min-max normalize into [0, 1]; a flat pattern maps to 0.5 everywhere.
fn normalize_unit(m: DMatrix<f64>) -> DMatrix<f64> {
    let min = m.min();
    let max = m.max();
    let range = max - min;
    if range <= 0.0 {
        return DMatrix::from_element(m.nrows(), m.ncols(), 0.5);
    }
    m.map(|v| (v - min) / range)
}
