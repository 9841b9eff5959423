//! Forward-model lookup table over a (mu_a, mu_sp) grid.
//!
//! The table is the dense sampling inverted by [`crate::invert`]: every
//! grid cell of the Cartesian product of the two ranges is mapped through
//! the diffusion model once. Construction is deterministic, so a table can
//! be cached and reused for any number of inversions that share its
//! configuration.

use serde::{Deserialize, Serialize};

use crate::forward::{DiffusionModel, ForwardError, FrequencyPair};

/// Half-open sampling range: `start`, `start + step`, … strictly below
/// `stop` (arange semantics).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl GridRange {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    /// Number of samples the range produces.
    pub fn len(&self) -> usize {
        if self.step <= 0.0 || self.stop <= self.start {
            return 0;
        }
        ((self.stop - self.start) / self.step).ceil() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the sample values in ascending order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |i| self.start + i as f64 * self.step)
    }
}

/// One precomputed grid sample: optical properties and their model
/// reflectance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForwardPoint {
    pub mu_a: f64,
    pub mu_sp: f64,
    pub r_ac: f64,
    pub r_dc: f64,
}

/// Dense forward-model sampling of a (mu_a, mu_sp) grid.
///
/// The generating model (refractive index + frequency pair) is recorded
/// with the points: a whole table is valid for exactly one configuration,
/// and consumers compare [`LookupTable::model`] before reusing a cached
/// instance. Point ordering carries no meaning; the inverter treats the
/// table as an unordered point set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTable {
    model: DiffusionModel,
    points: Vec<ForwardPoint>,
}

impl LookupTable {
    /// Evaluate the forward model over the Cartesian product of the ranges.
    ///
    /// Identical inputs produce an identical table. Fails only if some grid
    /// cell has a non-positive transport coefficient (both ranges start at
    /// zero).
    pub fn build(
        mu_a_range: GridRange,
        mu_sp_range: GridRange,
        refr_index: f64,
        freq: FrequencyPair,
    ) -> Result<Self, ForwardError> {
        let model = DiffusionModel::new(refr_index, freq);
        let mut points = Vec::with_capacity(mu_a_range.len() * mu_sp_range.len());
        for mu_a in mu_a_range.values() {
            for mu_sp in mu_sp_range.values() {
                let r = model.reflectance(mu_a, mu_sp)?;
                points.push(ForwardPoint {
                    mu_a,
                    mu_sp,
                    r_ac: r.ac,
                    r_dc: r.dc,
                });
            }
        }
        Ok(Self { model, points })
    }

    /// The generating model configuration.
    pub fn model(&self) -> &DiffusionModel {
        &self.model
    }

    /// The sampled forward points.
    pub fn points(&self) -> &[ForwardPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_range_arange_semantics() {
        let r = GridRange::new(0.0, 0.5, 0.001);
        assert_eq!(r.len(), 500);
        let r = GridRange::new(0.1, 5.0, 0.01);
        assert_eq!(r.len(), 490);

        let vals: Vec<f64> = GridRange::new(0.0, 1.0, 0.25).values().collect();
        assert_eq!(vals.len(), 4);
        assert_relative_eq!(vals[3], 0.75, epsilon = 1e-15);
    }

    #[test]
    fn test_degenerate_ranges_are_empty() {
        assert!(GridRange::new(0.0, 1.0, 0.0).is_empty());
        assert!(GridRange::new(1.0, 1.0, 0.1).is_empty());
        assert!(GridRange::new(2.0, 1.0, 0.1).is_empty());
    }

    #[test]
    fn test_build_covers_cartesian_product() {
        let mu_a = GridRange::new(0.0, 0.05, 0.01);
        let mu_sp = GridRange::new(0.5, 2.5, 0.5);
        let freq = FrequencyPair::new(0.0, 0.2);
        let table = LookupTable::build(mu_a, mu_sp, 1.43, freq).expect("buildable");

        assert_eq!(table.len(), mu_a.len() * mu_sp.len());

        // Every point's reflectance must match a direct model evaluation.
        let model = DiffusionModel::new(1.43, freq);
        for p in table.points() {
            let r = model.reflectance(p.mu_a, p.mu_sp).unwrap();
            assert_relative_eq!(p.r_ac, r.ac, epsilon = 1e-15);
            assert_relative_eq!(p.r_dc, r.dc, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let mu_a = GridRange::new(0.0, 0.1, 0.02);
        let mu_sp = GridRange::new(0.5, 1.5, 0.25);
        let freq = FrequencyPair::new(0.0, 0.2);
        let a = LookupTable::build(mu_a, mu_sp, 1.43, freq).unwrap();
        let b = LookupTable::build(mu_a, mu_sp, 1.43, freq).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_json_roundtrip_preserves_table() {
        let table = LookupTable::build(
            GridRange::new(0.01, 0.05, 0.01),
            GridRange::new(0.5, 1.5, 0.5),
            1.43,
            FrequencyPair::new(0.0, 0.2),
        )
        .unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let back: LookupTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_degenerate_cell_fails_fast() {
        // Both ranges touching zero produce a mu_tr == 0 cell.
        let mu_a = GridRange::new(0.0, 0.1, 0.05);
        let mu_sp = GridRange::new(0.0, 1.0, 0.5);
        let err = LookupTable::build(mu_a, mu_sp, 1.43, FrequencyPair::new(0.0, 0.2)).unwrap_err();
        assert_eq!(err, ForwardError::DegenerateMedium);
    }
}
