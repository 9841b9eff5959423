//! Diffusion-approximation forward model.
//!
//! Predicts the effective diffuse reflectance of a homogeneous turbid medium
//! under spatially modulated illumination as a function of absorption,
//! reduced scattering, refractive index and spatial frequency. Pure and
//! deterministic; one model instance fixes the refractive index and the
//! DC/AC frequency pair for every evaluation.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors from forward-model evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardError {
    /// The transport coefficient mu_a + mu_sp is not positive.
    DegenerateMedium,
}

impl std::fmt::Display for ForwardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegenerateMedium => {
                write!(f, "degenerate medium: mu_a + mu_sp must be positive")
            }
        }
    }
}

impl std::error::Error for ForwardError {}

// ── Types ──────────────────────────────────────────────────────────────────

/// The DC/AC spatial-frequency pair a measurement is modulated at.
///
/// One frequency unit (cycles per length, with the same length unit as
/// mu_a and mu_sp) is used end-to-end; the DC member is typically zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPair {
    /// Baseline spatial frequency.
    pub dc: f64,
    /// Modulated spatial frequency.
    pub ac: f64,
}

impl FrequencyPair {
    pub fn new(dc: f64, ac: f64) -> Self {
        Self { dc, ac }
    }
}

/// Predicted diffuse reflectance at the model's two frequencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectancePair {
    pub ac: f64,
    pub dc: f64,
}

/// Diffusion-approximation reflectance model at a fixed refractive index
/// and spatial-frequency pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffusionModel {
    /// Refractive index of the medium (> 0).
    pub refr_index: f64,
    /// Spatial-frequency pair shared by every evaluation of this model.
    pub freq: FrequencyPair,
}

// ── Model ──────────────────────────────────────────────────────────────────

/// Effective attenuation coefficient at spatial frequency `f`:
/// absorption decay combined with the frequency-dependent diffusion term.
fn mu_eff(mu_a: f64, mu_tr: f64, f: f64) -> f64 {
    let k = 2.0 * PI * f;
    (3.0 * mu_a * mu_tr + k * k).sqrt()
}

/// Diffuse reflectance for a medium with proportionality constant `a`,
/// reduced albedo `albedo` and transport coefficient `mu_tr` at frequency
/// `f`. Top-level on purpose: every parameter is explicit, so grid sweeps
/// cannot capture stale loop state.
fn diffuse_reflectance(a: f64, albedo: f64, mu_a: f64, mu_tr: f64, f: f64) -> f64 {
    let ratio = mu_eff(mu_a, mu_tr, f) / mu_tr;
    3.0 * a * albedo / ((ratio + 1.0) * (ratio + 3.0 * a))
}

impl DiffusionModel {
    pub fn new(refr_index: f64, freq: FrequencyPair) -> Self {
        Self { refr_index, freq }
    }

    /// Effective reflection coefficient R_eff for the model's refractive
    /// index (empirical polynomial fit in n).
    pub fn effective_reflection(&self) -> f64 {
        let n = self.refr_index;
        0.0636 * n + 0.668 + 0.710 / n - 1.44 / (n * n)
    }

    /// Predict `(R_AC, R_DC)` for a candidate `(mu_a, mu_sp)` medium.
    pub fn reflectance(&self, mu_a: f64, mu_sp: f64) -> Result<ReflectancePair, ForwardError> {
        let mu_tr = mu_a + mu_sp;
        if mu_tr <= 0.0 {
            return Err(ForwardError::DegenerateMedium);
        }
        let r_eff = self.effective_reflection();
        let a = (1.0 - r_eff) / (2.0 * (1.0 + r_eff));
        let albedo = mu_sp / mu_tr;
        Ok(ReflectancePair {
            ac: diffuse_reflectance(a, albedo, mu_a, mu_tr, self.freq.ac),
            dc: diffuse_reflectance(a, albedo, mu_a, mu_tr, self.freq.dc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tissue_model() -> DiffusionModel {
        DiffusionModel::new(1.43, FrequencyPair::new(0.0, 0.2))
    }

    #[test]
    fn test_degenerate_medium_rejected() {
        let m = tissue_model();
        assert_eq!(
            m.reflectance(0.0, 0.0).unwrap_err(),
            ForwardError::DegenerateMedium
        );
        assert!(m.reflectance(0.0, 0.1).is_ok());
    }

    #[test]
    fn test_reflectance_bounded_and_ordered() {
        // R_AC, R_DC ∈ [0, 1] and R_AC ≤ R_DC over the reference grid:
        // the modulated component attenuates at least as fast as the
        // baseline at nonzero spatial frequency.
        let m = tissue_model();
        let mut mu_a = 0.0;
        while mu_a < 0.5 {
            let mut mu_sp = 0.1;
            while mu_sp < 5.0 {
                let r = m.reflectance(mu_a, mu_sp).expect("non-degenerate");
                assert!((0.0..=1.0).contains(&r.ac), "R_AC out of range: {}", r.ac);
                assert!((0.0..=1.0).contains(&r.dc), "R_DC out of range: {}", r.dc);
                assert!(
                    r.ac <= r.dc + 1e-15,
                    "R_AC {} exceeds R_DC {} at mu_a={}, mu_sp={}",
                    r.ac,
                    r.dc,
                    mu_a,
                    mu_sp
                );
                mu_sp += 0.05;
            }
            mu_a += 0.01;
        }
    }

    #[test]
    fn test_zero_frequency_pair_collapses() {
        // With f_low == f_high both components are the same number.
        let m = DiffusionModel::new(1.4, FrequencyPair::new(0.0, 0.0));
        let r = m.reflectance(0.03, 1.1).expect("non-degenerate");
        assert_relative_eq!(r.ac, r.dc, epsilon = 1e-15);
    }

    #[test]
    fn test_absorption_decreases_reflectance() {
        let m = tissue_model();
        let lo = m.reflectance(0.01, 1.2).unwrap();
        let hi = m.reflectance(0.10, 1.2).unwrap();
        assert!(hi.dc < lo.dc);
        assert!(hi.ac < lo.ac);
    }
}
