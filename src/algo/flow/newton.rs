//! Newton direction for the Ricci energy.
//!
//! The Hessian of the energy with respect to the conformal factors is the
//! edge-weight Laplacian `L`: `L_ii = Σ_j w_ij`, `L_ij = -w_ij`. Its kernel
//! holds the constant vectors (global scaling), so the system is solved in
//! the zero-mean subspace.

use nalgebra::DVector;

use super::sparse::{remove_mean, ConjugateGradient, CsrMatrix};
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshIndex};

/// Assemble the weighted Laplacian from the current edge weights.
pub fn hessian<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> CsrMatrix {
    let n = mesh.num_vertices();
    let mut triplets = Vec::with_capacity(4 * mesh.num_edges());

    for e in mesh.edge_ids() {
        let [a, b] = mesh.edge_vertices(e);
        let (a, b) = (a.index(), b.index());
        let w = mesh.edge(e).weight;
        triplets.push((a, a, w));
        triplets.push((b, b, w));
        triplets.push((a, b, -w));
        triplets.push((b, a, -w));
    }

    CsrMatrix::from_triplets(n, n, triplets)
}

/// Solve `L du = target_k - k` for a zero-mean update `du`.
pub fn newton_direction<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    solver: &ConjugateGradient,
) -> Result<DVector<f64>> {
    let h = hessian(mesh);
    let rhs = DVector::from_iterator(
        mesh.num_vertices(),
        mesh.vertices().map(|(_, v)| v.target_k - v.k),
    );

    let mut du = solver.solve(&h, &rhs)?;
    remove_mean(&mut du);

    if du.iter().any(|x| !x.is_finite()) {
        return Err(MeshError::InvalidState("Newton step is not finite".into()));
    }
    Ok(du)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::flow::metric::{update_edge_lengths, update_edge_weights};
    use crate::mesh::{build_from_triangles, VertexId};
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

    #[test]
    fn test_hessian_rows_sum_to_zero() {
        let mut mesh = tetrahedron();
        mesh.vertex_mut(VertexId::new(1)).u = 0.3;
        update_edge_lengths(&mut mesh);
        update_edge_weights(&mut mesh);

        let h = hessian(&mesh);
        assert_eq!(h.nrows(), 4);
        assert_eq!(h.nnz(), 16);
        let row_sums = h.mul_vec(&DVector::from_element(4, 1.0));
        assert!(row_sums.norm() < 1e-12);
    }

    #[test]
    fn test_direction_is_zero_mean() {
        let mut mesh = tetrahedron();
        update_edge_lengths(&mut mesh);
        update_edge_weights(&mut mesh);
        for (i, k) in [0.5, -0.5, 0.25, -0.25].into_iter().enumerate() {
            let v = mesh.vertex_mut(VertexId::new(i));
            v.k = 0.0;
            v.target_k = k;
        }

        let solver = ConjugateGradient {
            deflate_constants: true,
            ..Default::default()
        };
        let du = newton_direction(&mesh, &solver).unwrap();
        assert!(du.sum().abs() < 1e-10);

        let rhs = DVector::from_vec(vec![0.5, -0.5, 0.25, -0.25]);
        assert!((hessian(&mesh).mul_vec(&du) - rhs).norm() < 1e-8);
    }
}
