//! Scattered-data interpolation over a triangulated 2-D domain.
//!
//! Builds one Delaunay triangulation of the sample sites and evaluates any
//! number of value fields on it. Three methods are offered:
//!
//! - `nearest` — value of the closest sample site,
//! - `linear` — barycentric blend inside the containing triangle,
//! - `cubic` — C¹ Clough–Tocher patches with least-squares gradients.
//!
//! Queries outside the convex hull of the sites return NaN for every
//! method; callers sort valid from invalid pixels by `is_nan`.

pub mod delaunay;

mod cubic;

use serde::{Deserialize, Serialize};

use delaunay::{Location, Triangulation};

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors from building a scattered-data interpolator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpError {
    /// Not enough distinct finite sample sites to span a 2-D domain.
    TooFewPoints { needed: usize, got: usize },
    /// A value field's length differs from the number of sample sites.
    LengthMismatch { points: usize, values: usize },
    /// The sample sites are collinear or coincident.
    DegenerateDomain,
}

impl std::fmt::Display for InterpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few sample points: need {}, got {}", needed, got)
            }
            Self::LengthMismatch { points, values } => write!(
                f,
                "field length mismatch: {} points but {} values",
                points, values
            ),
            Self::DegenerateDomain => {
                write!(f, "sample points are collinear or coincident")
            }
        }
    }
}

impl std::error::Error for InterpError {}

// ── Method selection ───────────────────────────────────────────────────────

/// Interpolation method applied at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpMethod {
    /// C¹ cubic Clough–Tocher patches.
    #[default]
    Cubic,
    /// Barycentric blend inside the containing triangle.
    Linear,
    /// Value of the closest sample site.
    Nearest,
}

// ── Interpolator ───────────────────────────────────────────────────────────

/// One value field resampled onto the internal vertex order.
struct Field {
    /// Value at each internal vertex (zero at the synthetic ones).
    values: Vec<f64>,
    /// Least-squares gradient at each internal vertex.
    gradients: Vec<[f64; 2]>,
}

/// Multi-field scattered-data interpolator over one point set.
///
/// Immutable after construction: evaluation threads a caller-owned triangle
/// hint, so one interpolator serves any number of concurrent query streams.
pub struct ScatteredInterpolator {
    tri: Triangulation,
    /// Real-vertex adjacency from the finite triangles.
    adjacency: Vec<Vec<usize>>,
    fields: Vec<Field>,
}

impl ScatteredInterpolator {
    /// Build the triangulation of `points` and attach one or more value
    /// fields, each parallel to `points`.
    pub fn new(points: &[[f64; 2]], fields: &[Vec<f64>]) -> Result<Self, InterpError> {
        for field in fields {
            if field.len() != points.len() {
                return Err(InterpError::LengthMismatch {
                    points: points.len(),
                    values: field.len(),
                });
            }
        }

        let tri = Triangulation::new(points)?;
        let n = tri.n_vertices();

        let mut adjacency = vec![Vec::new(); n];
        for t in tri.finite_triangles() {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                if !adjacency[a].contains(&b) {
                    adjacency[a].push(b);
                }
                if !adjacency[b].contains(&a) {
                    adjacency[b].push(a);
                }
            }
        }

        let fields = fields
            .iter()
            .map(|field| {
                let mut values = vec![0.0; n];
                for v in 0..n {
                    if let Some(i) = tri.input_of_vertex(v) {
                        values[v] = field[i];
                    }
                }
                let gradients = cubic::estimate_gradients(&tri, &adjacency, &values);
                Field { values, gradients }
            })
            .collect();

        Ok(Self {
            tri,
            adjacency,
            fields,
        })
    }

    /// Number of attached value fields.
    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    /// Initial triangle hint for a fresh query stream.
    pub fn start_hint(&self) -> usize {
        self.tri.start()
    }

    /// Evaluate every field at `q`, writing one value per field into `out`.
    ///
    /// Non-finite queries and queries outside the convex hull produce NaN
    /// across all fields. `hint` carries the walk start between calls;
    /// seed it with [`ScatteredInterpolator::start_hint`].
    pub fn eval_into(&self, q: [f64; 2], method: InterpMethod, hint: &mut usize, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.fields.len());

        if !q[0].is_finite() || !q[1].is_finite() {
            out.fill(f64::NAN);
            return;
        }
        let Location::Inside { tri: t, bary } = self.tri.locate(q, hint) else {
            out.fill(f64::NAN);
            return;
        };
        let verts = self.tri.triangle(t);

        match method {
            InterpMethod::Linear => {
                for (slot, field) in out.iter_mut().zip(&self.fields) {
                    *slot = (0..3).map(|k| bary[k] * field.values[verts[k]]).sum();
                }
            }
            InterpMethod::Nearest => {
                let v = self.descend_to_nearest(q, verts);
                for (slot, field) in out.iter_mut().zip(&self.fields) {
                    *slot = field.values[v];
                }
            }
            InterpMethod::Cubic => {
                let p = [
                    self.tri.point(verts[0]),
                    self.tri.point(verts[1]),
                    self.tri.point(verts[2]),
                ];
                for (slot, field) in out.iter_mut().zip(&self.fields) {
                    let f = [
                        field.values[verts[0]],
                        field.values[verts[1]],
                        field.values[verts[2]],
                    ];
                    let g = [
                        field.gradients[verts[0]],
                        field.gradients[verts[1]],
                        field.gradients[verts[2]],
                    ];
                    *slot = cubic::clough_tocher(p, f, g, bary);
                }
            }
        }
    }

    /// Evaluate every field at `q` into a fresh vector.
    pub fn eval(&self, q: [f64; 2], method: InterpMethod) -> Vec<f64> {
        let mut hint = self.start_hint();
        let mut out = vec![0.0; self.fields.len()];
        self.eval_into(q, method, &mut hint, &mut out);
        out
    }

    /// Greedy walk over the vertex adjacency toward the sample nearest `q`.
    ///
    /// On a Delaunay graph greedy descent from any vertex of the containing
    /// triangle reaches the true nearest neighbor.
    fn descend_to_nearest(&self, q: [f64; 2], verts: [usize; 3]) -> usize {
        let d2 = |v: usize| {
            let p = self.tri.point(v);
            let dx = p[0] - q[0];
            let dy = p[1] - q[1];
            dx * dx + dy * dy
        };

        let mut cur = verts[0];
        let mut best = d2(cur);
        for &v in &verts[1..] {
            let d = d2(v);
            if d < best {
                cur = v;
                best = d;
            }
        }

        loop {
            let mut improved = false;
            for &v in &self.adjacency[cur] {
                let d = d2(v);
                if d < best {
                    cur = v;
                    best = d;
                    improved = true;
                }
            }
            if !improved {
                return cur;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn unit_grid(n: usize) -> Vec<[f64; 2]> {
        let mut pts = Vec::new();
        for i in 0..n {
            for j in 0..n {
                pts.push([i as f64 / (n - 1) as f64, j as f64 / (n - 1) as f64]);
            }
        }
        pts
    }

    #[test]
    fn test_field_length_mismatch_rejected() {
        let pts = unit_grid(3);
        let short = vec![0.0; pts.len() - 1];
        assert!(matches!(
            ScatteredInterpolator::new(&pts, &[short]),
            Err(InterpError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_linear_field_exact_for_all_methods() {
        // A linear field is reproduced exactly by linear and cubic
        // interpolation at any interior point, and by all three methods at
        // the sample sites themselves.
        let pts = unit_grid(6);
        let lin = |p: [f64; 2]| 1.5 + 2.0 * p[0] - 0.5 * p[1];
        let field: Vec<f64> = pts.iter().map(|p| lin(*p)).collect();
        let interp = ScatteredInterpolator::new(&pts, &[field]).expect("buildable");

        let mut rng = StdRng::seed_from_u64(3);
        let mut hint = interp.start_hint();
        let mut out = [0.0];
        for _ in 0..50 {
            let q = [rng.gen::<f64>(), rng.gen::<f64>()];
            for method in [InterpMethod::Linear, InterpMethod::Cubic] {
                interp.eval_into(q, method, &mut hint, &mut out);
                assert_relative_eq!(out[0], lin(q), epsilon = 1e-9);
            }
        }
        for p in &pts {
            for method in [
                InterpMethod::Linear,
                InterpMethod::Cubic,
                InterpMethod::Nearest,
            ] {
                interp.eval_into(*p, method, &mut hint, &mut out);
                assert_relative_eq!(out[0], lin(*p), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_hull_boundary_sites_evaluate_exactly() {
        // Sample sites on the convex hull boundary are part of the domain:
        // each must reproduce its own value, not NaN, even when the query
        // starts from a cold hint.
        let pts = unit_grid(5);
        let lin = |p: [f64; 2]| 0.2 + 1.1 * p[0] + 0.7 * p[1];
        let field: Vec<f64> = pts.iter().map(|p| lin(*p)).collect();
        let interp = ScatteredInterpolator::new(&pts, &[field]).expect("buildable");

        let mut out = [0.0];
        for p in pts.iter().filter(|p| {
            p[0] == 0.0 || p[0] == 1.0 || p[1] == 0.0 || p[1] == 1.0
        }) {
            for method in [
                InterpMethod::Linear,
                InterpMethod::Cubic,
                InterpMethod::Nearest,
            ] {
                let mut hint = interp.start_hint();
                interp.eval_into(*p, method, &mut hint, &mut out);
                assert!(
                    !out[0].is_nan(),
                    "hull site {:?} evaluated to NaN with {:?}",
                    p,
                    method
                );
                assert_relative_eq!(out[0], lin(*p), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_out_of_hull_is_nan() {
        let pts = unit_grid(4);
        let field = vec![1.0; pts.len()];
        let interp = ScatteredInterpolator::new(&pts, &[field]).expect("buildable");

        let mut hint = interp.start_hint();
        let mut out = [0.0];
        for q in [[-0.2, 0.5], [1.3, 0.5], [0.5, -0.7], [f64::NAN, 0.5]] {
            for method in [
                InterpMethod::Linear,
                InterpMethod::Cubic,
                InterpMethod::Nearest,
            ] {
                interp.eval_into(q, method, &mut hint, &mut out);
                assert!(out[0].is_nan(), "expected NaN at {:?}", q);
            }
        }
    }

    #[test]
    fn test_nearest_picks_closest_site() {
        let pts = unit_grid(5);
        let field: Vec<f64> = (0..pts.len()).map(|i| i as f64).collect();
        let interp = ScatteredInterpolator::new(&pts, &[field.clone()]).expect("buildable");

        let mut rng = StdRng::seed_from_u64(9);
        let mut hint = interp.start_hint();
        let mut out = [0.0];
        for _ in 0..40 {
            let q = [rng.gen::<f64>(), rng.gen::<f64>()];
            interp.eval_into(q, InterpMethod::Nearest, &mut hint, &mut out);

            let brute = pts
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let da = (a[0] - q[0]).powi(2) + (a[1] - q[1]).powi(2);
                    let db = (b[0] - q[0]).powi(2) + (b[1] - q[1]).powi(2);
                    da.partial_cmp(&db).unwrap()
                })
                .map(|(i, _)| i)
                .unwrap();
            assert_relative_eq!(out[0], field[brute], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cubic_approximates_smooth_field() {
        // Cubic interpolation of a smooth nonlinear field on a moderately
        // dense grid should track the truth far better than the grid
        // spacing would suggest.
        let pts = unit_grid(12);
        let f = |p: [f64; 2]| (2.0 * p[0]).sin() * (1.5 * p[1]).cos();
        let field: Vec<f64> = pts.iter().map(|p| f(*p)).collect();
        let interp = ScatteredInterpolator::new(&pts, &[field]).expect("buildable");

        let mut rng = StdRng::seed_from_u64(21);
        let mut hint = interp.start_hint();
        let mut out = [0.0];
        for _ in 0..100 {
            // Stay away from the hull boundary where one-sided gradient
            // stencils are least accurate.
            let q = [
                0.1 + 0.8 * rng.gen::<f64>(),
                0.1 + 0.8 * rng.gen::<f64>(),
            ];
            interp.eval_into(q, InterpMethod::Cubic, &mut hint, &mut out);
            assert!(
                (out[0] - f(q)).abs() < 0.05,
                "cubic error too large at {:?}: {} vs {}",
                q,
                out[0],
                f(q)
            );
        }
    }

    #[test]
    fn test_multiple_fields_evaluate_together() {
        let pts = unit_grid(4);
        let a: Vec<f64> = pts.iter().map(|p| p[0]).collect();
        let b: Vec<f64> = pts.iter().map(|p| p[1]).collect();
        let interp = ScatteredInterpolator::new(&pts, &[a, b]).expect("buildable");
        assert_eq!(interp.n_fields(), 2);

        let out = interp.eval([0.3, 0.6], InterpMethod::Linear);
        assert_relative_eq!(out[0], 0.3, epsilon = 1e-9);
        assert_relative_eq!(out[1], 0.6, epsilon = 1e-9);
    }
}
