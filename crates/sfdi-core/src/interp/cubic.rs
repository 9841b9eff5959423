//! C¹ cubic Clough–Tocher evaluation on a triangulated scattered domain.
//!
//! Each macro triangle is split at its centroid into three cubic Bezier
//! patches. Corner ordinates come from the vertex values and gradients;
//! the `b111` ordinate of each patch is fixed by requiring the derivative
//! normal to the outer edge to vary linearly along it (reduced
//! Hsieh–Clough–Tocher element); the ordinates around the centroid follow
//! from the C¹ coplanarity conditions across the three interior edges.

use super::delaunay::Triangulation;

/// Gradient of the barycentric coordinate of vertex `A` in triangle
/// `(A, B, C)`, dotted with direction `d`.
fn bary_dir_component(b: [f64; 2], c: [f64; 2], denom: f64, d: [f64; 2]) -> f64 {
    let ux = c[0] - b[0];
    let uy = c[1] - b[1];
    (-uy * d[0] + ux * d[1]) / denom
}

/// Evaluate the reduced Clough–Tocher interpolant on one macro triangle.
///
/// `p` are the macro corners (CCW), `f` the corner values, `g` the corner
/// gradients and `bary` the query's barycentric coordinates w.r.t. the
/// macro triangle.
pub(super) fn clough_tocher(
    p: [[f64; 2]; 3],
    f: [f64; 3],
    g: [[f64; 2]; 3],
    bary: [f64; 3],
) -> f64 {
    let p0 = [
        (p[0][0] + p[1][0] + p[2][0]) / 3.0,
        (p[0][1] + p[1][1] + p[2][1]) / 3.0,
    ];

    let dot = |v: [f64; 2], d: [f64; 2]| v[0] * d[0] + v[1] * d[1];
    let sub = |a: [f64; 2], b: [f64; 2]| [a[0] - b[0], a[1] - b[1]];

    // Ordinates fixed directly by the corner data: toward the centroid and
    // along each outer edge.
    let mut q = [0.0; 3];
    for i in 0..3 {
        q[i] = f[i] + dot(g[i], sub(p0, p[i])) / 3.0;
    }
    // e[i][j]: ordinate near corner i along the edge toward corner j.
    let mut e = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            if i != j {
                e[i][j] = f[i] + dot(g[i], sub(p[j], p[i])) / 3.0;
            }
        }
    }

    // b111 of patch m (outer edge between corners i = m+1 and j = m+2):
    // the derivative normal to the outer edge must be linear along it.
    let mut s = [0.0; 3];
    for m in 0..3 {
        let i = (m + 1) % 3;
        let j = (m + 2) % 3;
        let (pi, pj) = (p[i], p[j]);

        // Inward normal of the outer edge expressed as a barycentric
        // direction (a, b, c) of the patch (Pi, Pj, P0).
        let edge = sub(pj, pi);
        let nrm = [-edge[1], edge[0]];
        let denom = {
            // Twice the signed area of (Pi, Pj, P0).
            (pj[0] - pi[0]) * (p0[1] - pi[1]) - (pj[1] - pi[1]) * (p0[0] - pi[0])
        };
        let a = bary_dir_component(pj, p0, denom, nrm);
        let b = bary_dir_component(p0, pi, denom, nrm);
        let c = bary_dir_component(pi, pj, denom, nrm);

        // Quadratic Bezier coefficients of the cross-edge derivative.
        let d0 = a * f[i] + b * e[i][j] + c * q[i];
        let d2 = a * e[j][i] + b * f[j] + c * q[j];
        s[m] = ((d0 + d2) / 2.0 - a * e[i][j] - b * e[j][i]) / c;
    }

    // Interior-edge C¹ conditions pin the ring around the centroid, then
    // the centroid ordinate itself.
    let s_sum = s[0] + s[1] + s[2];
    let mut r = [0.0; 3];
    for i in 0..3 {
        r[i] = (s_sum - s[i] + q[i]) / 3.0;
    }
    let c0 = (r[0] + r[1] + r[2]) / 3.0;

    // Pick the sub-patch: patch m covers the region where bary[m] is the
    // smallest component.
    let mut m = 0;
    for k in 1..3 {
        if bary[k] < bary[m] {
            m = k;
        }
    }
    let i = (m + 1) % 3;
    let j = (m + 2) % 3;

    // Barycentric coordinates w.r.t. the sub-patch (Pi, Pj, P0).
    let u = bary[i] - bary[m];
    let v = bary[j] - bary[m];
    let w = 3.0 * bary[m];

    // Cubic Bernstein expansion of the patch.
    let b300 = f[i];
    let b030 = f[j];
    let b003 = c0;
    let b210 = e[i][j];
    let b120 = e[j][i];
    let b201 = q[i];
    let b021 = q[j];
    let b102 = r[i];
    let b012 = r[j];
    let b111 = s[m];

    b300 * u * u * u
        + b030 * v * v * v
        + b003 * w * w * w
        + 3.0 * (b210 * u * u * v + b201 * u * u * w)
        + 3.0 * (b120 * u * v * v + b021 * v * v * w)
        + 3.0 * (b102 * u * w * w + b012 * v * w * w)
        + 6.0 * b111 * u * v * w
}

/// Estimate per-vertex gradients by weighted least squares over the
/// Delaunay 1-ring of each real vertex (weights 1/|d|²). Exact for linear
/// fields; falls back to a zero gradient when the ring is degenerate.
pub(super) fn estimate_gradients(
    tri: &Triangulation,
    adjacency: &[Vec<usize>],
    values: &[f64],
) -> Vec<[f64; 2]> {
    let n = tri.n_vertices();
    let mut gradients = vec![[0.0; 2]; n];

    for v in 0..n {
        if tri.input_of_vertex(v).is_none() || adjacency[v].is_empty() {
            continue;
        }
        let pv = tri.point(v);
        let fv = values[v];

        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        let (mut bx, mut by) = (0.0, 0.0);
        for &u in &adjacency[v] {
            let pu = tri.point(u);
            let dx = pu[0] - pv[0];
            let dy = pu[1] - pv[1];
            let d2 = dx * dx + dy * dy;
            if d2 <= 0.0 {
                continue;
            }
            let w = 1.0 / d2;
            let df = values[u] - fv;
            sxx += w * dx * dx;
            sxy += w * dx * dy;
            syy += w * dy * dy;
            bx += w * dx * df;
            by += w * dy * df;
        }

        let det = sxx * syy - sxy * sxy;
        if det.abs() > 1e-14 * (sxx + syy).powi(2).max(f64::MIN_POSITIVE) {
            gradients[v] = [(syy * bx - sxy * by) / det, (sxx * by - sxy * bx) / det];
        }
    }
    gradients
}
