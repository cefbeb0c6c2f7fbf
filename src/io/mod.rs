//! Mesh file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | `.m` | `.m` | ✓ | ✓ | Ids, `father`, `rgb`, `uv`, sharp edges |
//! | PLY | `.ply` | ✓ | ✓ | Positions and faces; `u`/`v` on save |
//!
//! Which optional attributes are written is chosen per call with
//! [`Attributes`].
//!
//! ```no_run
//! use riccimap::io::{load, save, Attributes};
//! use riccimap::mesh::HalfEdgeMesh;
//!
//! let mesh: HalfEdgeMesh = load("face.m").unwrap();
//! save(&mesh, "face.uv.m", Attributes::UV | Attributes::SHARP).unwrap();
//! ```

pub mod m;
pub mod ply;

pub use m::Attributes;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshIndex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Line-based `.m` format.
    M,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "m" => Some(Format::M),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    fn detect(path: &Path) -> Result<Format> {
        Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        })
    }
}

/// Load a mesh, choosing the reader from the file extension.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    match Format::detect(path)? {
        Format::M => m::load(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh, choosing the writer from the file extension.
pub fn save<P: AsRef<Path>, I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    path: P,
    attributes: Attributes,
) -> Result<()> {
    let path = path.as_ref();
    match Format::detect(path)? {
        Format::M => m::save(mesh, path, attributes),
        Format::Ply => ply::save(mesh, path, attributes),
    }
}
