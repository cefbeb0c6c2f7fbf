//! Error types for riccimap.
//!
//! Every fallible operation in the crate returns [`Result`]. Topology problems
//! found while building a mesh are grouped under [`TopologyError`] so callers
//! can treat them as one class of load failure.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Reasons a face/vertex list cannot be turned into a half-edge mesh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references a vertex that does not exist.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face is not a triangle.
    #[error("face {face} has {sides} sides, only triangles are supported")]
    NonTriangularFace {
        /// The face index.
        face: usize,
        /// Number of corners found.
        sides: usize,
    },

    /// A face uses the same vertex twice.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// The directed edge `v0 -> v1` appears in two faces: either the edge has
    /// more than two incident faces or its neighbours are oriented inconsistently.
    #[error("half-edge ({v0} -> {v1}) is used by more than one face")]
    InconsistentPairing {
        /// Source vertex of the duplicated half-edge.
        v0: usize,
        /// Target vertex of the duplicated half-edge.
        v1: usize,
    },

    /// Faces around a vertex form more than one fan (bowtie vertex).
    #[error("vertex {vertex} is non-manifold (several face fans)")]
    NonManifoldVertex {
        /// The vertex index.
        vertex: usize,
    },

    /// A vertex is not referenced by any face.
    #[error("vertex {vertex} is isolated")]
    IsolatedVertex {
        /// The vertex index.
        vertex: usize,
    },

    /// An edge attribute names two vertices that share no edge.
    #[error("edge ({v0}, {v1}) does not exist")]
    UnknownEdge {
        /// First vertex id.
        v0: usize,
        /// Second vertex id.
        v1: usize,
    },
}

/// Errors that can occur while loading, flowing, embedding or saving a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The input does not describe a consistent triangle mesh.
    #[error("invalid topology: {0}")]
    InvalidTopology(#[from] TopologyError),

    /// A law-of-cosines argument fell outside [-1, 1] by more than the
    /// tolerance. Only returned when strict angle checking is enabled;
    /// otherwise the value is clamped and a warning is logged.
    #[error("degenerate corner angle in face {face} (cosine {cosine})")]
    DegenerateAngle {
        /// The face containing the corner.
        face: usize,
        /// The unclamped cosine.
        cosine: f64,
    },

    /// The curvature flow used up its round budget.
    #[error("curvature flow did not converge after {rounds} rounds ({iterations} iterations), error {error:e}")]
    FlowDidNotConverge {
        /// Number of rounds run.
        rounds: usize,
        /// Total number of curvature evaluations.
        iterations: usize,
        /// Curvature error when giving up.
        error: f64,
    },

    /// Two circles did not intersect while laying out a face.
    #[error("embedding failed at face {face}: circles do not intersect")]
    EmbeddingFailed {
        /// The face that could not be placed.
        face: usize,
    },

    /// Iterative linear solver failed.
    #[error("algorithm failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid mesh state for the requested operation.
    #[error("invalid mesh state: {0}")]
    InvalidState(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    pub(crate) fn load<P: Into<PathBuf>>(path: P, message: impl Into<String>) -> Self {
        MeshError::LoadError {
            path: path.into(),
            message: message.into(),
        }
    }
}
