//! Discrete metric quantities of a tangential circle packing.
//!
//! Each vertex carries a circle of radius `r_i = exp(u_i)`; neighbouring
//! circles touch, so the edge length is `r_i + r_j`. From the lengths follow
//! corner angles (law of cosines), vertex curvature (angle defect) and the
//! edge weights that form the Hessian of the Ricci energy.

use std::f64::consts::PI;

use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshIndex};

/// Slack allowed on a law-of-cosines argument before it counts as degenerate.
pub const COSINE_TOLERANCE: f64 = 1e-9;

/// Cosine of the angle between sides `a` and `b`, opposite side `c`. Unclamped.
#[inline]
pub fn corner_cosine(a: f64, b: f64, c: f64) -> f64 {
    (a * a + b * b - c * c) / (2.0 * a * b)
}

/// Angle between sides `a` and `b`, opposite side `c`.
///
/// The cosine is clamped to `[-1, 1]`, so slightly inconsistent lengths give
/// `0` or `π` instead of NaN.
///
/// ```
/// use riccimap::algo::flow::corner_angle;
///
/// let theta = corner_angle(1.0, 1.0, 1.0);
/// assert!((theta - std::f64::consts::FRAC_PI_3).abs() < 1e-12);
/// ```
#[inline]
pub fn corner_angle(a: f64, b: f64, c: f64) -> f64 {
    corner_cosine(a, b, c).clamp(-1.0, 1.0).acos()
}

/// Set every edge length from the conformal factors of its endpoints.
pub fn update_edge_lengths<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for e in 0..mesh.num_edges() {
        let e = e.into();
        let [v0, v1] = mesh.edge_vertices(e);
        let length = mesh.vertex(v0).u.exp() + mesh.vertex(v1).u.exp();
        mesh.edge_mut(e).length = length;
    }
}

/// Recompute edge weights from the circle radii.
///
/// For a face with radii `r_a, r_b, r_c` the inscribed (power) circle has
/// radius `w = sqrt(r_a r_b r_c / (r_a + r_b + r_c))`; each of the three
/// edges gains `w / length`. Boundary edges only see one face.
pub fn update_edge_weights<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for e in 0..mesh.num_edges() {
        mesh.edge_mut(e.into()).weight = 0.0;
    }

    for f in 0..mesh.num_faces() {
        let f = f.into();
        let [a, b, c] = mesh.face_triangle(f);
        let ra = mesh.vertex(a).u.exp();
        let rb = mesh.vertex(b).u.exp();
        let rc = mesh.vertex(c).u.exp();
        let w = (ra * rb * rc / (ra + rb + rc)).sqrt();

        for e in mesh.face_edges(f) {
            let edge = mesh.edge_mut(e);
            edge.weight += w / edge.length;
        }
    }
}

/// Recompute every corner angle from the current edge lengths.
///
/// The angle stored on a face half-edge sits at its target vertex, between
/// the half-edge and its successor. Returns the number of corners whose
/// cosine fell outside `[-1 - tol, 1 + tol]`; those are logged and clamped,
/// or reported as [`MeshError::DegenerateAngle`] when `strict` is set.
pub fn update_corner_angles<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, strict: bool) -> Result<usize> {
    let mut degenerate = 0;

    for f in 0..mesh.num_faces() {
        let f = f.into();
        for he in mesh.face_halfedge_triangle(f) {
            let a = mesh.length(he);
            let b = mesh.length(mesh.next(he));
            let c = mesh.length(mesh.prev(he));
            let cosine = corner_cosine(a, b, c);

            if !(-1.0 - COSINE_TOLERANCE..=1.0 + COSINE_TOLERANCE).contains(&cosine) {
                let face = mesh.face(f).id;
                if strict {
                    return Err(MeshError::DegenerateAngle { face, cosine });
                }
                log::warn!("degenerate corner in face {}: cosine {} clamped", face, cosine);
                degenerate += 1;
            }

            mesh.halfedge_mut(he).angle = cosine.clamp(-1.0, 1.0).acos();
        }
    }

    Ok(degenerate)
}

/// Angle defect at every vertex: `2π - Σθ` inside, `π - Σθ` on the boundary.
pub fn update_vertex_curvature<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for v in 0..mesh.num_vertices() {
        let v = v.into();
        let angle_sum: f64 = mesh
            .vertex_in_halfedges(v)
            .map(|he| mesh.halfedge(he).angle)
            .sum();
        let full = if mesh.is_boundary_vertex(v) { PI } else { 2.0 * PI };
        mesh.vertex_mut(v).k = full - angle_sum;
    }
}

/// Largest `|target_k - k|` over all vertices.
pub fn curvature_error<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> f64 {
    mesh.vertices()
        .map(|(_, v)| (v.target_k - v.k).abs())
        .fold(0.0, f64::max)
}

/// Sum of the vertex curvatures; `2π χ` for any metric (Gauss-Bonnet).
pub fn total_curvature<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> f64 {
    mesh.vertices().map(|(_, v)| v.k).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, EdgeId, FaceId, VertexId};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn tetrahedron() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn grid(n: usize) -> HalfEdgeMesh {
        let mut vertices = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let mut faces = Vec::new();
        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = v00 + 1;
                let v01 = v00 + n + 1;
                let v11 = v01 + 1;
                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }
        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn evaluate(mesh: &mut HalfEdgeMesh) {
        update_edge_lengths(mesh);
        update_edge_weights(mesh);
        update_corner_angles(mesh, true).unwrap();
        update_vertex_curvature(mesh);
    }

    #[test]
    fn test_corner_angle_right_triangle() {
        assert_relative_eq!(corner_angle(3.0, 4.0, 5.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(corner_angle(1.0, 1.0, 2.0), PI, epsilon = 1e-12);
        // Impossible lengths are clamped instead of producing NaN.
        assert_relative_eq!(corner_angle(1.0, 1.0, 3.0), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_equilateral_corner_angles() {
        let mut mesh = tetrahedron();
        evaluate(&mut mesh);

        let expected = 0.5f64.acos();
        for f in mesh.face_ids() {
            let mut sum = 0.0;
            for he in mesh.face_halfedges(f) {
                let angle = mesh.halfedge(he).angle;
                assert_relative_eq!(angle, expected, epsilon = 1e-12);
                sum += angle;
            }
            assert_relative_eq!(sum, PI, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_edge_lengths_from_radii() {
        let mut mesh = tetrahedron();
        mesh.vertex_mut(VertexId::new(0)).u = 2.0f64.ln();
        update_edge_lengths(&mut mesh);

        let e = mesh.vertex_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        assert_relative_eq!(mesh.edge(e).length, 3.0, epsilon = 1e-12);
        let e = mesh.vertex_edge(VertexId::new(2), VertexId::new(3)).unwrap();
        assert_relative_eq!(mesh.edge(e).length, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_edge_weights_unit_radii() {
        let mut mesh = tetrahedron();
        evaluate(&mut mesh);

        // Two faces per edge, each contributing sqrt(1/3) / 2.
        let expected = (1.0f64 / 3.0).sqrt();
        for e in mesh.edge_ids() {
            assert_relative_eq!(mesh.edge(e).weight, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_tetrahedron_curvature() {
        let mut mesh = tetrahedron();
        evaluate(&mut mesh);

        for (_, v) in mesh.vertices() {
            assert_relative_eq!(v.k, PI, epsilon = 1e-12);
        }
        assert_relative_eq!(total_curvature(&mesh), 4.0 * PI, epsilon = 1e-10);
    }

    #[test]
    fn test_gauss_bonnet_any_metric() {
        let mut mesh = grid(3);
        for (i, v) in (0..mesh.num_vertices()).enumerate() {
            mesh.vertex_mut(VertexId::new(v)).u = 0.1 * ((i * 7) % 5) as f64 - 0.2;
        }
        evaluate(&mut mesh);

        assert_eq!(mesh.euler_characteristic(), 1);
        assert_relative_eq!(total_curvature(&mesh), 2.0 * PI, epsilon = 1e-10);
    }

    #[test]
    fn test_curvature_error_is_max_deviation() {
        let mut mesh = tetrahedron();
        evaluate(&mut mesh);
        for v in 0..4 {
            mesh.vertex_mut(VertexId::new(v)).target_k = PI;
        }
        assert_relative_eq!(curvature_error(&mesh), 0.0, epsilon = 1e-12);

        mesh.vertex_mut(VertexId::new(2)).target_k = PI + 0.25;
        mesh.vertex_mut(VertexId::new(3)).target_k = PI - 0.5;
        assert_relative_eq!(curvature_error(&mesh), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_angle_strict_and_lenient() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let mut mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        for (e, length) in [(0, 1.0), (1, 1.0), (2, 5.0)] {
            mesh.edge_mut(EdgeId::new(e)).length = length;
        }

        assert!(matches!(
            update_corner_angles(&mut mesh, true),
            Err(MeshError::DegenerateAngle { face: 0, .. })
        ));

        let degenerate = update_corner_angles(&mut mesh, false).unwrap();
        assert!(degenerate > 0);
        for he in mesh.face_halfedges(FaceId::new(0)) {
            assert!(mesh.halfedge(he).angle.is_finite());
        }
    }
}
