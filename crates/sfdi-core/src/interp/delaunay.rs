//! Incremental Delaunay triangulation with walk-based point location.
//!
//! Insertion splits the containing triangle (or the pair of triangles
//! sharing an edge, for on-edge points) and restores the Delaunay property
//! by recursive edge flips. Three synthetic far-away vertices bound the
//! domain during construction; any triangle touching them is exterior, so
//! the convex-hull test falls out of point location for free.

use super::InterpError;

/// Internal indices 0..SUPER_VERTS are the synthetic bounding vertices.
const SUPER_VERTS: usize = 3;

#[derive(Debug, Clone, Copy)]
struct Triangle {
    /// Vertex indices, counter-clockwise.
    v: [usize; 3],
    /// Neighbor sharing the edge opposite `v[k]`.
    n: [Option<usize>; 3],
}

/// Result of locating a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location {
    /// Containing triangle and barycentric coordinates of the query.
    Inside { tri: usize, bary: [f64; 3] },
    /// The query lies outside the convex hull of the input points.
    Outside,
}

/// Delaunay triangulation of a 2-D scattered point set.
///
/// Immutable after construction; point location takes a caller-owned hint
/// so concurrent queries never contend.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<[f64; 2]>,
    tris: Vec<Triangle>,
    /// Input index each internal vertex came from (`usize::MAX` for the
    /// synthetic vertices).
    input_of_vertex: Vec<usize>,
    /// Characteristic length of the input cloud, used to scale tolerances.
    span: f64,
    /// A finite triangle to start query walks from.
    start: usize,
}

// ── Predicates ─────────────────────────────────────────────────────────────

/// Twice the signed area of (a, b, c); positive for counter-clockwise.
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// True if `d` lies strictly inside the circumcircle of CCW (a, b, c).
fn in_circumcircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> bool {
    let ax = a[0] - d[0];
    let ay = a[1] - d[1];
    let bx = b[0] - d[0];
    let by = b[1] - d[1];
    let cx = c[0] - d[0];
    let cy = c[1] - d[1];

    let det = (ax * ax + ay * ay) * (bx * cy - by * cx)
        - (bx * bx + by * by) * (ax * cy - ay * cx)
        + (cx * cx + cy * cy) * (ax * by - ay * bx);

    let scale = ax
        .abs()
        .max(ay.abs())
        .max(bx.abs())
        .max(by.abs())
        .max(cx.abs())
        .max(cy.abs());
    det > 1e-12 * scale.powi(4)
}

// ── Construction ───────────────────────────────────────────────────────────

impl Triangulation {
    /// Triangulate `points`. Non-finite entries are ignored; duplicates
    /// (within a relative tolerance) collapse onto the first occurrence.
    pub fn new(points: &[[f64; 2]]) -> Result<Self, InterpError> {
        if points.len() < 3 {
            return Err(InterpError::TooFewPoints {
                needed: 3,
                got: points.len(),
            });
        }

        let finite: Vec<&[f64; 2]> = points
            .iter()
            .filter(|p| p[0].is_finite() && p[1].is_finite())
            .collect();
        if finite.len() < 3 {
            return Err(InterpError::TooFewPoints {
                needed: 3,
                got: finite.len(),
            });
        }

        let (mut lo, mut hi) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
        for p in &finite {
            for k in 0..2 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
        }
        let span = (hi[0] - lo[0]).max(hi[1] - lo[1]);
        if span <= 0.0 {
            return Err(InterpError::DegenerateDomain);
        }

        let cx = 0.5 * (lo[0] + hi[0]);
        let cy = 0.5 * (lo[1] + hi[1]);
        let m = 20.0 * span;
        let mut tri = Self {
            points: vec![
                [cx - m, cy - 0.5 * m],
                [cx + m, cy - 0.5 * m],
                [cx, cy + m],
            ],
            tris: vec![Triangle {
                v: [0, 1, 2],
                n: [None; 3],
            }],
            input_of_vertex: vec![usize::MAX; SUPER_VERTS],
            span,
            start: 0,
        };

        for (i, p) in points.iter().enumerate() {
            if p[0].is_finite() && p[1].is_finite() {
                tri.insert(*p, i);
            }
        }

        tri.start = tri
            .tris
            .iter()
            .position(|t| t.v.iter().all(|&v| v >= SUPER_VERTS))
            .ok_or(InterpError::DegenerateDomain)?;
        Ok(tri)
    }

    fn insert(&mut self, p: [f64; 2], input_idx: usize) {
        let Some(t) = self.walk(p, self.start_hint_build()) else {
            return;
        };

        // Collapse onto an existing vertex if the point duplicates one.
        let tol2 = (1e-12 * self.span).powi(2);
        for &v in &self.tris[t].v {
            let d = self.points[v];
            let dx = p[0] - d[0];
            let dy = p[1] - d[1];
            if dx * dx + dy * dy <= tol2 {
                return;
            }
        }

        let v = self.points.len();
        self.points.push(p);
        self.input_of_vertex.push(input_idx);

        let eps_area = self.span * self.span * 1e-14;
        let verts = self.tris[t].v;
        let mut on_edge = None;
        for k in 0..3 {
            let o = orient(
                self.points[verts[(k + 1) % 3]],
                self.points[verts[(k + 2) % 3]],
                p,
            );
            if o.abs() <= eps_area && self.tris[t].n[k].is_some() {
                on_edge = Some(k);
            }
        }

        let mut stack = match on_edge {
            Some(k) => self.split_edge(t, k, v),
            None => self.split_triangle(t, v),
        };
        self.legalize(&mut stack);
    }

    /// Split triangle `t` into three at interior vertex `v`.
    fn split_triangle(&mut self, t: usize, v: usize) -> Vec<(usize, usize)> {
        let Triangle {
            v: [a, b, c],
            n: [na, nb, nc],
        } = self.tris[t];
        let t1 = self.tris.len();
        let t2 = t1 + 1;

        self.tris[t] = Triangle {
            v: [a, b, v],
            n: [Some(t1), Some(t2), nc],
        };
        self.tris.push(Triangle {
            v: [b, c, v],
            n: [Some(t2), Some(t), na],
        });
        self.tris.push(Triangle {
            v: [c, a, v],
            n: [Some(t), Some(t1), nb],
        });

        if let Some(na) = na {
            self.replace_neighbor(na, t, t1);
        }
        if let Some(nb) = nb {
            self.replace_neighbor(nb, t, t2);
        }
        vec![(t, 2), (t1, 2), (t2, 2)]
    }

    /// Split the two triangles sharing the edge opposite `t.v[k]` into four
    /// at vertex `v` lying on that edge.
    fn split_edge(&mut self, t: usize, k: usize, v: usize) -> Vec<(usize, usize)> {
        let o = match self.tris[t].n[k] {
            Some(o) => o,
            None => return self.split_triangle(t, v),
        };
        let Some(j) = self.opposite_index(o, t) else {
            return self.split_triangle(t, v);
        };

        let p = self.tris[t].v[k];
        let u = self.tris[t].v[(k + 1) % 3];
        let w = self.tris[t].v[(k + 2) % 3];
        let q = self.tris[o].v[j];

        let n_pu = self.tris[t].n[(k + 2) % 3];
        let n_pw = self.tris[t].n[(k + 1) % 3];
        let n_qu = self.tris[o].n[(j + 1) % 3];
        let n_qw = self.tris[o].n[(j + 2) % 3];

        let b = self.tris.len();
        let d = b + 1;
        // A reuses slot t, C reuses slot o.
        self.tris[t] = Triangle {
            v: [p, u, v],
            n: [Some(d), Some(b), n_pu],
        };
        self.tris[o] = Triangle {
            v: [q, w, v],
            n: [Some(b), Some(d), n_qw],
        };
        self.tris.push(Triangle {
            v: [p, v, w],
            n: [Some(o), n_pw, Some(t)],
        });
        self.tris.push(Triangle {
            v: [q, v, u],
            n: [Some(t), n_qu, Some(o)],
        });

        if let Some(n_pw) = n_pw {
            self.replace_neighbor(n_pw, t, b);
        }
        if let Some(n_qu) = n_qu {
            self.replace_neighbor(n_qu, o, d);
        }
        vec![(t, 2), (b, 1), (o, 2), (d, 1)]
    }

    /// Flip the edge opposite `t.v[k]` shared with its neighbor.
    fn flip(&mut self, t: usize, k: usize) -> Option<(usize, usize)> {
        let o = self.tris[t].n[k]?;
        let j = self.opposite_index(o, t)?;

        let p = self.tris[t].v[k];
        let u = self.tris[t].v[(k + 1) % 3];
        let w = self.tris[t].v[(k + 2) % 3];
        let q = self.tris[o].v[j];

        let n_wp = self.tris[t].n[(k + 1) % 3];
        let n_pu = self.tris[t].n[(k + 2) % 3];
        let n_uq = self.tris[o].n[(j + 1) % 3];
        let n_qw = self.tris[o].n[(j + 2) % 3];

        self.tris[t] = Triangle {
            v: [p, u, q],
            n: [n_uq, Some(o), n_pu],
        };
        self.tris[o] = Triangle {
            v: [p, q, w],
            n: [n_qw, n_wp, Some(t)],
        };

        if let Some(n_uq) = n_uq {
            self.replace_neighbor(n_uq, o, t);
        }
        if let Some(n_wp) = n_wp {
            self.replace_neighbor(n_wp, t, o);
        }
        Some((t, o))
    }

    /// Restore the local Delaunay property around freshly created edges.
    fn legalize(&mut self, stack: &mut Vec<(usize, usize)>) {
        while let Some((t, k)) = stack.pop() {
            let Some(o) = self.tris[t].n[k] else { continue };
            let Some(j) = self.opposite_index(o, t) else {
                continue;
            };
            let q = self.tris[o].v[j];
            let [a, b, c] = self.tris[t].v;
            if in_circumcircle(
                self.points[a],
                self.points[b],
                self.points[c],
                self.points[q],
            ) {
                if let Some((ta, tb)) = self.flip(t, k) {
                    stack.push((ta, 0));
                    stack.push((tb, 0));
                }
            }
        }
    }

    fn replace_neighbor(&mut self, tri: usize, old: usize, new: usize) {
        for n in self.tris[tri].n.iter_mut() {
            if *n == Some(old) {
                *n = Some(new);
                return;
            }
        }
    }

    /// Index in `o` of the vertex opposite the edge shared with `t`.
    fn opposite_index(&self, o: usize, t: usize) -> Option<usize> {
        (0..3).find(|&j| self.tris[o].n[j] == Some(t))
    }

    fn start_hint_build(&self) -> usize {
        self.tris.len() - 1
    }

    // ── Queries ────────────────────────────────────────────────────────────

    /// Walk from `from` to the triangle containing `p`; `None` if `p` lies
    /// outside the bounding super-triangle.
    fn walk(&self, p: [f64; 2], from: usize) -> Option<usize> {
        let mut t = from.min(self.tris.len() - 1);
        let mut prev = usize::MAX;
        let max_steps = 4 * self.tris.len() + 16;

        'walk: for _ in 0..max_steps {
            let verts = self.tris[t].v;
            for k in 0..3 {
                let o = orient(
                    self.points[verts[(k + 1) % 3]],
                    self.points[verts[(k + 2) % 3]],
                    p,
                );
                if o < 0.0 {
                    match self.tris[t].n[k] {
                        Some(next) if next != prev => {
                            prev = t;
                            t = next;
                            continue 'walk;
                        }
                        Some(_) => continue,
                        None => return None,
                    }
                }
            }
            return Some(t);
        }

        // Walk cycled on a numerically marginal configuration: fall back to
        // an exhaustive containment scan.
        let eps = -self.span * self.span * 1e-12;
        (0..self.tris.len()).find(|&t| {
            let verts = self.tris[t].v;
            (0..3).all(|k| {
                orient(
                    self.points[verts[(k + 1) % 3]],
                    self.points[verts[(k + 2) % 3]],
                    p,
                ) >= eps
            })
        })
    }

    /// A walk that ends in an exterior triangle may still sit exactly on
    /// the hull boundary (on a hull edge or at a hull vertex): follow the
    /// edges `p` lies on through the exterior fan until a finite triangle
    /// containing `p` on its boundary turns up.
    fn boundary_rescue(&self, p: [f64; 2], start: usize) -> Option<usize> {
        let eps = self.span * self.span * 1e-12;
        let mut visited = vec![start];
        let mut queue = vec![start];
        while let Some(t) = queue.pop() {
            let verts = self.tris[t].v;
            for k in 0..3 {
                let Some(n) = self.tris[t].n[k] else { continue };
                if visited.contains(&n) {
                    continue;
                }
                let o = orient(
                    self.points[verts[(k + 1) % 3]],
                    self.points[verts[(k + 2) % 3]],
                    p,
                );
                if o.abs() > eps {
                    continue;
                }
                // p lies on this edge, so the neighbor contains p too.
                if self.tris[n].v.iter().all(|&v| v >= SUPER_VERTS) {
                    return Some(n);
                }
                visited.push(n);
                queue.push(n);
            }
            if visited.len() > 32 {
                return None;
            }
        }
        None
    }

    /// Locate `p`, walking from `*hint` and updating it for the next query.
    pub fn locate(&self, p: [f64; 2], hint: &mut usize) -> Location {
        let Some(mut t) = self.walk(p, *hint) else {
            return Location::Outside;
        };
        *hint = t;

        if self.tris[t].v.iter().any(|&v| v < SUPER_VERTS) {
            // The closed hull boundary interpolates; only strictly exterior
            // queries are out of domain.
            match self.boundary_rescue(p, t) {
                Some(finite) => {
                    t = finite;
                    *hint = finite;
                }
                None => return Location::Outside,
            }
        }
        let verts = self.tris[t].v;

        let mut o = [0.0; 3];
        for k in 0..3 {
            o[k] = orient(
                self.points[verts[(k + 1) % 3]],
                self.points[verts[(k + 2) % 3]],
                p,
            )
            .max(0.0);
        }
        let total = o[0] + o[1] + o[2];
        if total <= 0.0 {
            return Location::Outside;
        }
        Location::Inside {
            tri: t,
            bary: [o[0] / total, o[1] / total, o[2] / total],
        }
    }

    /// A finite triangle index suitable as an initial locate hint.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Vertex indices of triangle `t`.
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        self.tris[t].v
    }

    /// Coordinates of internal vertex `v`.
    pub fn point(&self, v: usize) -> [f64; 2] {
        self.points[v]
    }

    /// Number of internal vertices, synthetic ones included.
    pub fn n_vertices(&self) -> usize {
        self.points.len()
    }

    /// Input index internal vertex `v` came from; `None` for synthetic
    /// vertices.
    pub fn input_of_vertex(&self, v: usize) -> Option<usize> {
        if v < SUPER_VERTS {
            None
        } else {
            Some(self.input_of_vertex[v])
        }
    }

    /// Iterate triangles whose vertices are all real input points.
    pub fn finite_triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.tris
            .iter()
            .filter(|t| t.v.iter().all(|&v| v >= SUPER_VERTS))
            .map(|t| t.v)
    }
}
