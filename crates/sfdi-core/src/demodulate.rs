//! N-step phase-shifting demodulation of fringe image sequences.
//!
//! Converts N intensity images captured at equally spaced phase steps
//! (phase_i = 2π·i/N) into the two components of diffuse reflectance used by
//! the rest of the pipeline:
//!
//! - `ac` — the plain N-frame mean, `(1/N)·Σ I_i`.
//! - `dc` — the phase-energy term, `(2/N)·sqrt(P² + Q²)` with
//!   `P = Σ I_i·sin(phase_i)` and `Q = Σ I_i·cos(phase_i)`.
//!
//! Wrapped-phase recovery and Itoh unwrapping are provided for workflows
//! that need absolute phase; the reflectance path does not use them.

use nalgebra::DMatrix;
use std::f64::consts::PI;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors produced while validating a fringe sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemodulateError {
    /// Images in the sequence differ in shape.
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// Fewer than three phase steps: the quadrature sums are ambiguous.
    InsufficientSamples { got: usize },
}

impl std::fmt::Display for DemodulateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShapeMismatch { expected, got } => write!(
                f,
                "image shape mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, got.0, got.1
            ),
            Self::InsufficientSamples { got } => {
                write!(f, "insufficient phase steps: need at least 3, got {}", got)
            }
        }
    }
}

impl std::error::Error for DemodulateError {}

// ── Demodulation ───────────────────────────────────────────────────────────

/// AC and DC reflectance maps recovered from one fringe sequence.
#[derive(Debug, Clone)]
pub struct Demodulated {
    /// Mean-intensity component, `(1/N)·Σ I_i`.
    pub ac: DMatrix<f64>,
    /// Phase-energy component, `(2/N)·sqrt(P² + Q²)`.
    pub dc: DMatrix<f64>,
}

fn check_sequence(images: &[DMatrix<f64>]) -> Result<(usize, usize), DemodulateError> {
    if images.len() < 3 {
        return Err(DemodulateError::InsufficientSamples { got: images.len() });
    }
    let expected = images[0].shape();
    for img in &images[1..] {
        if img.shape() != expected {
            return Err(DemodulateError::ShapeMismatch {
                expected,
                got: img.shape(),
            });
        }
    }
    Ok(expected)
}

/// Accumulate the sine/cosine quadrature sums over a validated sequence.
fn quadrature_sums(images: &[DMatrix<f64>]) -> (DMatrix<f64>, DMatrix<f64>) {
    let (rows, cols) = images[0].shape();
    let n = images.len() as f64;
    let mut p = DMatrix::zeros(rows, cols);
    let mut q = DMatrix::zeros(rows, cols);
    for (i, img) in images.iter().enumerate() {
        let phase = 2.0 * PI * i as f64 / n;
        p += img * phase.sin();
        q += img * phase.cos();
    }
    (p, q)
}

/// Demodulate a phase-stepped fringe sequence into AC/DC reflectance maps.
///
/// All images must share one shape and the sequence must hold at least
/// three phase steps. Pure function of its input.
pub fn demodulate(images: &[DMatrix<f64>]) -> Result<Demodulated, DemodulateError> {
    check_sequence(images)?;
    let n = images.len() as f64;

    let (p, q) = quadrature_sums(images);
    let dc = p.zip_map(&q, |p, q| (2.0 / n) * (p * p + q * q).sqrt());

    let mut ac = images[0].clone();
    for img in &images[1..] {
        ac += img;
    }
    ac /= n;

    Ok(Demodulated { ac, dc })
}

// ── Phase recovery ─────────────────────────────────────────────────────────

/// Wrapped phase map `−atan2(P, Q)` of a fringe sequence.
pub fn wrapped_phase(images: &[DMatrix<f64>]) -> Result<DMatrix<f64>, DemodulateError> {
    check_sequence(images)?;
    let (p, q) = quadrature_sums(images);
    Ok(p.zip_map(&q, |p, q| -p.atan2(q)))
}

/// Wrap a phase difference into (−π, π].
fn wrap_to_pi(x: f64) -> f64 {
    let mut y = (x + PI).rem_euclid(2.0 * PI);
    if y <= 0.0 {
        y += 2.0 * PI;
    }
    y - PI
}

/// Itoh 2-D phase unwrapping.
///
/// Integrates wrapped phase differences down the first column, then along
/// each row. Valid when the true phase changes by less than π between
/// adjacent pixels.
pub fn unwrap_phase_itoh(wrapped: &DMatrix<f64>) -> DMatrix<f64> {
    let (rows, cols) = wrapped.shape();
    let mut out = wrapped.clone_owned();
    for r in 1..rows {
        let d = wrap_to_pi(wrapped[(r, 0)] - wrapped[(r - 1, 0)]);
        out[(r, 0)] = out[(r - 1, 0)] + d;
    }
    for r in 0..rows {
        for c in 1..cols {
            let d = wrap_to_pi(wrapped[(r, c)] - wrapped[(r, c - 1)]);
            out[(r, c)] = out[(r, c - 1)] + d;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::cosine_sequence;
    use approx::assert_relative_eq;

    #[test]
    fn test_roundtrip_three_step() {
        // I_i = offset + amplitude·cos(2π·i/N − φ0). The offset lands in the
        // mean channel (`ac`), the modulation amplitude in the phase-energy
        // channel (`dc`).
        let offset = 0.7;
        let amplitude = 0.25;
        let phi0 = 1.1;
        let imgs = cosine_sequence(3, 4, 5, offset, amplitude, phi0);

        let d = demodulate(&imgs).expect("valid sequence");
        for &v in d.ac.iter() {
            assert_relative_eq!(v, offset, max_relative = 1e-9);
        }
        for &v in d.dc.iter() {
            assert_relative_eq!(v, amplitude, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_roundtrip_many_steps() {
        for n in [4, 5, 8] {
            let imgs = cosine_sequence(n, 3, 3, 1.3, 0.4, -0.6);
            let d = demodulate(&imgs).expect("valid sequence");
            assert_relative_eq!(d.ac[(1, 2)], 1.3, max_relative = 1e-9);
            assert_relative_eq!(d.dc[(1, 2)], 0.4, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let imgs = vec![
            DMatrix::zeros(4, 4),
            DMatrix::zeros(4, 4),
            DMatrix::zeros(4, 5),
        ];
        let err = demodulate(&imgs).unwrap_err();
        assert_eq!(
            err,
            DemodulateError::ShapeMismatch {
                expected: (4, 4),
                got: (4, 5)
            }
        );
    }

    #[test]
    fn test_too_few_samples_rejected() {
        let imgs = vec![DMatrix::zeros(4, 4), DMatrix::zeros(4, 4)];
        let err = demodulate(&imgs).unwrap_err();
        assert_eq!(err, DemodulateError::InsufficientSamples { got: 2 });
    }

    #[test]
    fn test_wrapped_phase_recovers_offset() {
        let phi0 = 0.8;
        let imgs = cosine_sequence(5, 2, 2, 1.0, 0.5, phi0);
        let phase = wrapped_phase(&imgs).expect("valid sequence");
        // For I_i = o + a·cos(θ_i − φ0) the quadrature sums give
        // P ∝ sin φ0 and Q ∝ cos φ0, so −atan2(P, Q) = −φ0.
        let expected = wrap_to_pi(-phi0);
        for &v in phase.iter() {
            assert_relative_eq!(v, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_itoh_unwraps_smooth_ramp() {
        // A linear ramp exceeding π in total but not between neighbors.
        let rows = 6;
        let cols = 8;
        let truth = DMatrix::from_fn(rows, cols, |r, c| 0.9 * r as f64 + 0.5 * c as f64);
        let wrapped = truth.map(wrap_to_pi);
        let unwrapped = unwrap_phase_itoh(&wrapped);
        // Unwrapping recovers the truth up to a global 2π·k shift anchored
        // at (0, 0).
        let shift = truth[(0, 0)] - unwrapped[(0, 0)];
        for (u, t) in unwrapped.iter().zip(truth.iter()) {
            assert_relative_eq!(u + shift, t, epsilon = 1e-9);
        }
    }
}
