//! # riccimap
//!
//! Discrete conformal maps of triangle meshes by tangential circle-packing
//! Ricci flow.
//!
//! Every vertex of a [`HalfEdgeMesh`](mesh::HalfEdgeMesh) carries a circle;
//! the flow changes the circle radii until the surface is flat inside and its
//! boundary curvature matches a target (a circle with circular holes, or a
//! rectangle for extremal length). The flat metric is then laid out in the
//! plane, giving every vertex a `uv` coordinate.
//!
//! ## Pipeline
//!
//! ```no_run
//! use riccimap::prelude::*;
//! use riccimap::algo::embed::{embed, EmbedOptions};
//! use riccimap::algo::flow::{ricci_flow, FlowOptions};
//! use riccimap::io::{self, Attributes};
//!
//! let mut mesh: HalfEdgeMesh = io::load("face.m").unwrap();
//! ricci_flow(&mut mesh, &FlowOptions::default()).unwrap();
//! embed(&mut mesh, &EmbedOptions::default()).unwrap();
//! io::save(&mesh, "face.uv.m", Attributes::UV).unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use riccimap::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//!
//! let faces = vec![
//!     [0, 2, 1],  // bottom
//!     [0, 1, 3],  // front
//!     [1, 2, 3],  // right
//!     [2, 0, 3],  // left
//! ];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(mesh.euler_characteristic(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// ```
/// use riccimap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{MeshError, Result, TopologyError};
    pub use crate::mesh::{
        build_from_triangles, EdgeId, FaceId, HalfEdgeId, HalfEdgeMesh, MeshBuilder, MeshIndex,
        VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
