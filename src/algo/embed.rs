//! Planar layout of a flat metric.
//!
//! Once the flow has made every interior vertex flat, the triangles can be
//! laid out in the plane one by one: the first face is placed by hand and
//! every further face shares an edge with a placed one, so its free vertex
//! sits at the intersection of two circles around the shared edge's ends.
//!
//! # Example
//!
//! ```
//! use riccimap::prelude::*;
//! use riccimap::algo::embed::{embed, EmbedOptions};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//! for e in mesh.edge_ids().collect::<Vec<_>>() {
//!     let he = mesh.edge(e).halfedge;
//!     mesh.edge_mut(e).length = mesh.euclidean_length(he);
//! }
//!
//! let report = embed(&mut mesh, &EmbedOptions::default()).unwrap();
//! assert_eq!(report.faces, 2);
//! ```

use std::collections::VecDeque;

use nalgebra::{Point2, Vector2};

use super::boundary::BoundaryLoop;
use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, VertexId};

/// Options for [`embed`].
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Index of the face laid out first.
    pub seed_face: usize,

    /// Relative slack on circle intersections; near-tangent circles within
    /// this tolerance still intersect in one point.
    pub tolerance: f64,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            seed_face: 0,
            tolerance: 1e-9,
        }
    }
}

impl EmbedOptions {
    /// Set the seed face.
    pub fn with_seed_face(mut self, face: usize) -> Self {
        self.seed_face = face;
        self
    }

    /// Set the intersection tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Summary of an embedding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedReport {
    /// Connected components laid out, each from its own seed.
    pub components: usize,
    /// Faces laid out.
    pub faces: usize,
}

/// Intersection points of two circles, or `None` if they do not meet.
///
/// Near-tangent circles (within `tolerance`, relative to the largest of the
/// radii and the centre distance) return the touching point twice.
pub fn circle_circle_intersection(
    c1: &Point2<f64>,
    r1: f64,
    c2: &Point2<f64>,
    r2: f64,
    tolerance: f64,
) -> Option<(Point2<f64>, Point2<f64>)> {
    let d_vec = c2 - c1;
    let d = d_vec.norm();
    let scale = r1.max(r2).max(d);
    if d <= tolerance * scale || !scale.is_finite() {
        return None;
    }

    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h2 = r1 * r1 - a * a;
    if h2 < -tolerance * scale * scale {
        return None;
    }
    let h = h2.max(0.0).sqrt();

    let dir = d_vec / d;
    let base = c1 + dir * a;
    let perp = Vector2::new(-dir.y, dir.x) * h;
    Some((base + perp, base - perp))
}

/// z-component of the 3D cross product of two plane vectors.
#[inline]
pub fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Point `c` on the left of `a -> b` with `|ac| = r_a` and `|bc| = r_b`.
fn place_left(
    a: &Point2<f64>,
    r_a: f64,
    b: &Point2<f64>,
    r_b: f64,
    tolerance: f64,
) -> Option<Point2<f64>> {
    let (p, q) = circle_circle_intersection(a, r_a, b, r_b, tolerance)?;
    if cross2(&(b - a), &(p - a)) > 0.0 {
        Some(p)
    } else {
        Some(q)
    }
}

/// Lay out every face in the plane from the current edge lengths.
///
/// All `touched` flags are reset first. The face at
/// [`EmbedOptions::seed_face`] is placed with its first vertex at the origin
/// and its first edge along the positive x axis; faces are then placed
/// breadth-first across shared edges. Components not reached from the seed
/// start again from their lowest-index face, also at the origin.
///
/// # Errors
///
/// - [`MeshError::InvalidParameter`] if the seed face does not exist
/// - [`MeshError::EmbeddingFailed`] when the lengths around a face violate
///   the triangle inequality
///
/// On error every vertex keeps the `uv` it had before the call and all
/// `touched` flags are cleared.
pub fn embed<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, options: &EmbedOptions) -> Result<EmbedReport> {
    if options.seed_face >= mesh.num_faces() {
        return Err(MeshError::invalid_param(
            "seed_face",
            options.seed_face,
            "face index out of range",
        ));
    }

    let previous: Vec<Point2<f64>> = mesh.vertices().map(|(_, v)| v.uv).collect();
    layout(mesh, options).inspect_err(|_| {
        for (v, uv) in previous.into_iter().enumerate() {
            mesh.vertex_mut(VertexId::new(v)).uv = uv;
        }
        mesh.reset_touched();
    })
}

fn layout<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, options: &EmbedOptions) -> Result<EmbedReport> {
    mesh.reset_touched();
    let mut report = EmbedReport::default();
    let mut queue = VecDeque::new();

    let seeds = std::iter::once(options.seed_face).chain(0..mesh.num_faces());
    for seed in seeds.map(FaceId::<I>::new) {
        if mesh.face(seed).touched {
            continue;
        }
        if mesh.face_triangle(seed).iter().any(|&v| mesh.vertex(v).touched) {
            return Err(MeshError::InvalidState(format!(
                "face {} was not reached from its neighbours; mesh is not edge-connected around a vertex",
                mesh.face(seed).id
            )));
        }

        place_seed(mesh, seed, options.tolerance)?;
        report.components += 1;
        report.faces += 1;
        queue.extend(mesh.face_neighbors(seed));

        while let Some(f) = queue.pop_front() {
            if mesh.face(f).touched {
                continue;
            }
            if place_face(mesh, f, options.tolerance)? {
                report.faces += 1;
                queue.extend(mesh.face_neighbors(f).filter(|&n| !mesh.face(n).touched));
            }
        }
    }

    log::info!(
        "embedded {} face(s) in {} component(s)",
        report.faces,
        report.components
    );
    Ok(report)
}

fn place_seed<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, f: FaceId<I>, tolerance: f64) -> Result<()> {
    let [h0, h1, h2] = mesh.face_halfedge_triangle(f);
    let [v0, v1, v2] = [mesh.origin(h0), mesh.origin(h1), mesh.origin(h2)];
    let (l01, l12, l20) = (mesh.length(h0), mesh.length(h1), mesh.length(h2));

    let p0 = Point2::origin();
    let p1 = Point2::new(l01, 0.0);
    let p2 = place_left(&p0, l20, &p1, l12, tolerance).ok_or(MeshError::EmbeddingFailed {
        face: mesh.face(f).id,
    })?;

    for (v, p) in [(v0, p0), (v1, p1), (v2, p2)] {
        set_uv(mesh, v, p);
    }
    mesh.face_mut(f).touched = true;
    log::debug!("seeded face {}", mesh.face(f).id);
    Ok(())
}

/// Place the face if at most one of its vertices is missing. Returns `false`
/// when two or more are missing; the face is reached again later.
fn place_face<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, f: FaceId<I>, tolerance: f64) -> Result<bool> {
    let hes = mesh.face_halfedge_triangle(f);
    let missing: Vec<usize> = (0..3)
        .filter(|&i| !mesh.vertex(mesh.origin(hes[i])).touched)
        .collect();

    match missing.as_slice() {
        [] => {}
        &[i] => {
            // Walking the face from the missing vertex C: C -> A -> B.
            let (h_ca, h_ab, h_bc) = (hes[i], hes[(i + 1) % 3], hes[(i + 2) % 3]);
            let a = mesh.origin(h_ab);
            let b = mesh.origin(h_bc);
            let c = mesh.origin(h_ca);

            let pa = mesh.vertex(a).uv;
            let pb = mesh.vertex(b).uv;
            let pc = place_left(&pa, mesh.length(h_ca), &pb, mesh.length(h_bc), tolerance)
                .ok_or(MeshError::EmbeddingFailed {
                    face: mesh.face(f).id,
                })?;
            set_uv(mesh, c, pc);
        }
        _ => return Ok(false),
    }

    mesh.face_mut(f).touched = true;
    Ok(true)
}

fn set_uv<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, v: VertexId<I>, uv: Point2<f64>) {
    let vertex = mesh.vertex_mut(v);
    vertex.uv = uv;
    vertex.touched = true;
}

/// Extremal length of a rectangle-like embedding.
///
/// The four corners of `outer` (see
/// [`loop_corners`](crate::algo::flow::loop_corners)) split it into four
/// sides. Returns the mean length of the non-sharp sides divided by the mean
/// length of the sharp sides, measured between corner positions in `uv`.
///
/// # Errors
///
/// [`MeshError::InvalidState`] if the loop does not have exactly four corners.
pub fn extremal_length<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, outer: &BoundaryLoop<I>) -> Result<f64> {
    let hes = outer.halfedges();
    let sharp = |i: usize| mesh.edge(mesh.edge_of(hes[i % hes.len()])).sharp;

    // Loop positions whose target vertex is a corner.
    let corners: Vec<usize> = (0..hes.len()).filter(|&i| sharp(i) != sharp(i + 1)).collect();
    if corners.len() != 4 {
        return Err(MeshError::InvalidState(format!(
            "extremal length needs exactly 4 corners, found {}",
            corners.len()
        )));
    }

    let mut sharp_sides = Vec::with_capacity(2);
    let mut plain_sides = Vec::with_capacity(2);
    for k in 0..4 {
        let start = corners[k];
        let end = corners[(k + 1) % 4];
        let p = mesh.vertex(mesh.dest(hes[start])).uv;
        let q = mesh.vertex(mesh.dest(hes[end])).uv;
        if sharp(start + 1) {
            sharp_sides.push((q - p).norm());
        } else {
            plain_sides.push((q - p).norm());
        }
    }

    let mean = |sides: &[f64]| sides.iter().sum::<f64>() / sides.len() as f64;
    let sharp_mean = mean(&sharp_sides);
    if !(sharp_mean > 0.0) {
        return Err(MeshError::InvalidState("sharp sides have zero length".into()));
    }
    let ratio = mean(&plain_sides) / sharp_mean;
    log::info!("extremal length {:.6}", ratio);
    Ok(ratio)
}
