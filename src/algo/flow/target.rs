//! Target curvature assignment.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::algo::boundary::BoundaryLoop;
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// What curvature the flow drives each vertex towards.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TargetCurvature {
    /// Flat interior, outer boundary mapped to a circle and every other
    /// boundary loop to a circular hole.
    #[default]
    DiskWithHoles,

    /// Flat interior, outer boundary mapped to a rectangle whose corners are
    /// the four vertices where the `sharp` flag changes along the outer loop.
    /// Inner loops become circular holes.
    ExtremalLength,

    /// Per-vertex targets, indexed like the mesh vertices.
    Prescribed(Vec<f64>),
}

impl TargetCurvature {
    /// Check that this target can be applied to `mesh` with the given loops.
    pub fn validate<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>, loops: &[BoundaryLoop<I>]) -> Result<()> {
        match self {
            Self::DiskWithHoles | Self::ExtremalLength if loops.is_empty() => {
                return Err(MeshError::InvalidState(
                    "mesh has no boundary; only prescribed targets apply to closed surfaces".into(),
                ));
            }
            Self::ExtremalLength => {
                let corners = loop_corners(mesh, &loops[0]);
                if corners.len() != 4 {
                    return Err(MeshError::InvalidState(format!(
                        "extremal length needs exactly 4 corners on the outer boundary, found {}",
                        corners.len()
                    )));
                }
            }
            Self::Prescribed(targets) => {
                if targets.len() != mesh.num_vertices() {
                    return Err(MeshError::invalid_param(
                        "targets",
                        format!("{} values for {} vertices", targets.len(), mesh.num_vertices()),
                        "expected one target per vertex",
                    ));
                }
                let total: f64 = targets.iter().sum();
                let expected = 2.0 * PI * mesh.euler_characteristic() as f64;
                if (total - expected).abs() > 1e-6 {
                    log::warn!(
                        "prescribed targets sum to {:.6}, Gauss-Bonnet requires {:.6}",
                        total,
                        expected
                    );
                }
            }
            Self::DiskWithHoles => {}
        }

        if loops.len() > 2 && !matches!(self, Self::Prescribed(_)) {
            log::warn!(
                "{} boundary loops: treating the longest as outer, the rest as holes",
                loops.len()
            );
        }

        Ok(())
    }

    /// Write `target_k` on every vertex from the current edge lengths.
    pub fn apply<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>, loops: &[BoundaryLoop<I>]) {
        match self {
            Self::Prescribed(targets) => {
                for (v, &target) in targets.iter().enumerate() {
                    mesh.vertex_mut(VertexId::new(v)).target_k = target;
                }
            }
            Self::DiskWithHoles => {
                clear_targets(mesh);
                for l in loops {
                    assign_circle(mesh, l);
                }
            }
            Self::ExtremalLength => {
                clear_targets(mesh);
                if let Some((outer, holes)) = loops.split_first() {
                    for v in loop_corners(mesh, outer) {
                        mesh.vertex_mut(v).target_k = FRAC_PI_2;
                    }
                    for l in holes {
                        assign_circle(mesh, l);
                    }
                }
            }
        }
    }
}

fn clear_targets<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for v in 0..mesh.num_vertices() {
        mesh.vertex_mut(VertexId::new(v)).target_k = 0.0;
    }
}

/// Spread `±2π` over a loop proportionally to the length around each vertex.
fn assign_circle<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, boundary: &BoundaryLoop<I>) {
    let total = boundary.metric_length(mesh);
    let sign = if boundary.is_outer() { 1.0 } else { -1.0 };

    for &he in boundary.halfedges() {
        let v = mesh.dest(he);
        let local = 0.5
            * (mesh.length(mesh.most_ccw_in_halfedge(v)) + mesh.length(mesh.most_clw_out_halfedge(v)));
        mesh.vertex_mut(v).target_k = sign * 2.0 * PI * local / total;
    }
}

/// Vertices of a loop where the `sharp` flag of the incoming boundary edge
/// differs from that of the outgoing one, in walking order.
pub fn loop_corners<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, boundary: &BoundaryLoop<I>) -> Vec<VertexId<I>> {
    let hes = boundary.halfedges();
    let sharp = |he: HalfEdgeId<I>| mesh.edge(mesh.edge_of(he)).sharp;

    (0..hes.len())
        .filter(|&i| sharp(hes[i]) != sharp(hes[(i + 1) % hes.len()]))
        .map(|i| mesh.dest(hes[i]))
        .collect()
}
