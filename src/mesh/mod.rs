//! Core mesh data structures.
//!
//! [`HalfEdgeMesh`] stores a triangle mesh as a half-edge (doubly-connected
//! edge list) structure together with the attributes of the conformal
//! pipeline: per-vertex conformal factor, curvature, target curvature and
//! planar coordinate; per-edge length, weight and `sharp` flag; per-half-edge
//! corner angle.
//!
//! # Index Types
//!
//! - [`VertexId`], [`HalfEdgeId`], [`EdgeId`], [`FaceId`]
//!
//! All are generic over the underlying integer ([`MeshIndex`], `u32` by
//! default).
//!
//! # Construction
//!
//! ```
//! use riccimap::mesh::{HalfEdgeMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.euler_characteristic(), 1);
//! ```

mod builder;
mod halfedge;
mod index;

pub use builder::{build_from_triangles, to_face_vertex, MeshBuilder};
pub use halfedge::{
    Edge, Face, FaceHalfEdgeIter, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter,
};
pub use index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
