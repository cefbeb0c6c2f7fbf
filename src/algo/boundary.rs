//! Boundary loop extraction.
//!
//! A boundary loop is a maximal cycle of boundary half-edges (face half-edges
//! whose twin is a ghost), walked so that the mesh interior stays on the left.
//! [`trace_boundary`] returns every loop of a mesh sorted by descending
//! length; the first loop is treated as the outer boundary by the curvature
//! flow, all others as holes.
//!
//! # Example
//!
//! ```
//! use riccimap::prelude::*;
//! use riccimap::algo::boundary::trace_boundary;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
//!
//! let loops = trace_boundary(&mesh);
//! assert_eq!(loops.len(), 1);
//! assert_eq!(loops[0].len(), 3);
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::mesh::{HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// An ordered cycle of boundary half-edges.
#[derive(Debug, Clone)]
pub struct BoundaryLoop<I: MeshIndex = u32> {
    halfedges: Vec<HalfEdgeId<I>>,
    length: f64,
    index: usize,
}

impl<I: MeshIndex> BoundaryLoop<I> {
    /// Half-edges in walking order; each one starts where the previous ends.
    #[inline]
    pub fn halfedges(&self) -> &[HalfEdgeId<I>] {
        &self.halfedges
    }

    /// Sum of the Euclidean edge lengths at trace time.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Position in the length-sorted loop list. `0` is the outer loop.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// `true` for the longest loop.
    #[inline]
    pub fn is_outer(&self) -> bool {
        self.index == 0
    }

    /// Number of half-edges (and vertices) on the loop.
    #[inline]
    pub fn len(&self) -> usize {
        self.halfedges.len()
    }

    /// Always `false` for traced loops.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.halfedges.is_empty()
    }

    /// Target vertices of the loop half-edges, in walking order.
    pub fn vertices<'a>(&'a self, mesh: &'a HalfEdgeMesh<I>) -> impl Iterator<Item = VertexId<I>> + 'a {
        self.halfedges.iter().map(move |&he| mesh.dest(he))
    }

    /// Sum of the current metric edge lengths.
    pub fn metric_length(&self, mesh: &HalfEdgeMesh<I>) -> f64 {
        self.halfedges.iter().map(|&he| mesh.length(he)).sum()
    }

    /// Write the loop as `source target` vertex-id pairs, one per line.
    pub fn write_to<W: Write>(&self, mesh: &HalfEdgeMesh<I>, writer: &mut W) -> Result<()> {
        for &he in &self.halfedges {
            let source = mesh.vertex(mesh.origin(he)).id;
            let target = mesh.vertex(mesh.dest(he)).id;
            writeln!(writer, "{} {}", source, target)?;
        }
        Ok(())
    }

    /// Write the loop to a file, see [`write_to`](Self::write_to).
    pub fn write<P: AsRef<Path>>(&self, mesh: &HalfEdgeMesh<I>, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Extract all boundary loops, longest first.
///
/// Each walk starts at the lowest-index unvisited boundary half-edge and
/// repeatedly steps to the most clockwise outgoing half-edge of the current
/// target vertex. Closed meshes have no loops.
pub fn trace_boundary<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Vec<BoundaryLoop<I>> {
    let mut visited = vec![false; mesh.num_halfedges()];
    let mut loops = Vec::new();

    for start in mesh.halfedge_ids() {
        if visited[start.index()] || !mesh.is_boundary_halfedge(start) {
            continue;
        }

        let mut halfedges = Vec::new();
        let mut length = 0.0;
        let mut he = start;
        while !visited[he.index()] {
            visited[he.index()] = true;
            halfedges.push(he);
            length += mesh.euclidean_length(he);
            he = mesh.most_clw_out_halfedge(mesh.dest(he));
        }

        loops.push(BoundaryLoop {
            halfedges,
            length,
            index: 0,
        });
    }

    loops.sort_by(|a, b| b.length.total_cmp(&a.length));
    for (i, l) in loops.iter_mut().enumerate() {
        l.index = i;
    }

    log::debug!(
        "traced {} boundary loop(s): lengths {:?}",
        loops.len(),
        loops.iter().map(|l| l.length).collect::<Vec<_>>()
    );

    loops
}
