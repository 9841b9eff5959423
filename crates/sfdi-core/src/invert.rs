//! Per-pixel optical-property recovery from reflectance maps.
//!
//! Inverts the forward model by scattered-data interpolation: the lookup
//! table's `(R_DC, R_AC)` samples triangulate the measurable reflectance
//! domain, and each pixel's measured pair is interpolated back to the
//! `(mu_a, mu_sp)` that generated it. Pixels outside the convex hull of
//! the table (measurement noise, calibration drift) come back NaN rather
//! than being clamped to the nearest table edge.

use nalgebra::DMatrix;

use crate::interp::{InterpError, InterpMethod, ScatteredInterpolator};
use crate::table::LookupTable;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors from building or applying the inverse mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum InvertError {
    /// The lookup table holds no points.
    EmptyTable,
    /// AC and DC maps differ in shape.
    ShapeMismatch {
        ac: (usize, usize),
        dc: (usize, usize),
    },
    /// The table's reflectance samples do not span a 2-D domain.
    DegenerateTable(InterpError),
}

impl std::fmt::Display for InvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTable => write!(f, "lookup table holds no points"),
            Self::ShapeMismatch { ac, dc } => write!(
                f,
                "reflectance map shape mismatch: AC {}x{}, DC {}x{}",
                ac.0, ac.1, dc.0, dc.1
            ),
            Self::DegenerateTable(e) => write!(f, "degenerate lookup table: {}", e),
        }
    }
}

impl std::error::Error for InvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DegenerateTable(e) => Some(e),
            _ => None,
        }
    }
}

// ── Inversion ──────────────────────────────────────────────────────────────

/// Recovered per-pixel optical-property maps.
#[derive(Debug, Clone)]
pub struct PropertyMap {
    /// Absorption coefficient per pixel; NaN where inversion failed.
    pub mu_a: DMatrix<f64>,
    /// Reduced scattering coefficient per pixel; NaN where inversion failed.
    pub mu_sp: DMatrix<f64>,
}

/// The table-backed inverse mapping `(R_DC, R_AC) -> (mu_a, mu_sp)`.
pub struct Inverter {
    interp: ScatteredInterpolator,
}

impl Inverter {
    /// Triangulate the table's reflectance samples.
    pub fn new(table: &LookupTable) -> Result<Self, InvertError> {
        if table.is_empty() {
            return Err(InvertError::EmptyTable);
        }
        let points: Vec<[f64; 2]> = table.points().iter().map(|p| [p.r_dc, p.r_ac]).collect();
        let mu_a: Vec<f64> = table.points().iter().map(|p| p.mu_a).collect();
        let mu_sp: Vec<f64> = table.points().iter().map(|p| p.mu_sp).collect();
        let interp = ScatteredInterpolator::new(&points, &[mu_a, mu_sp])
            .map_err(InvertError::DegenerateTable)?;
        Ok(Self { interp })
    }

    /// Map measured AC/DC reflectance maps to optical-property maps.
    ///
    /// Rows are processed with one shared location hint: neighboring pixels
    /// land in neighboring triangles, so each walk is a handful of steps.
    pub fn invert(
        &self,
        ac: &DMatrix<f64>,
        dc: &DMatrix<f64>,
        method: InterpMethod,
    ) -> Result<PropertyMap, InvertError> {
        if ac.shape() != dc.shape() {
            return Err(InvertError::ShapeMismatch {
                ac: ac.shape(),
                dc: dc.shape(),
            });
        }
        let (rows, cols) = ac.shape();
        let mut mu_a = DMatrix::zeros(rows, cols);
        let mut mu_sp = DMatrix::zeros(rows, cols);

        let mut hint = self.interp.start_hint();
        let mut out = [0.0; 2];
        for r in 0..rows {
            for c in 0..cols {
                let q = [dc[(r, c)], ac[(r, c)]];
                self.interp.eval_into(q, method, &mut hint, &mut out);
                mu_a[(r, c)] = out[0];
                mu_sp[(r, c)] = out[1];
            }
        }
        Ok(PropertyMap { mu_a, mu_sp })
    }
}

/// One-shot inversion: build the table's interpolator and apply it.
///
/// Callers inverting many frames against one table should hold an
/// [`Inverter`] instead and amortize the triangulation.
pub fn invert(
    ac: &DMatrix<f64>,
    dc: &DMatrix<f64>,
    table: &LookupTable,
    method: InterpMethod,
) -> Result<PropertyMap, InvertError> {
    Inverter::new(table)?.invert(ac, dc, method)
}
