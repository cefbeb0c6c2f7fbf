//! PLY (Stanford polygon) format support.
//!
//! Positions and faces are read, polygons fan-triangulated. Vertex `u`/`v`
//! (or `s`/`t`) properties, when present, become the planar coordinates.
//! Saving writes ASCII PLY with optional `u`/`v` columns.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use super::Attributes;
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshBuilder, MeshIndex};

/// Load a mesh from a PLY file.
///
/// # Example
///
/// ```no_run
/// use riccimap::io::ply;
/// use riccimap::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = ply::load("model.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| MeshError::load(path, e.to_string()))?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| MeshError::load(path, "PLY file has no vertex element"))?;

    let mut builder = MeshBuilder::new();
    for vertex in vertex_element {
        let coordinate = |name: &str| {
            get_float_property(vertex, name)
                .ok_or_else(|| MeshError::load(path, format!("vertex missing {} coordinate", name)))
        };
        builder.add_vertex(Point3::new(coordinate("x")?, coordinate("y")?, coordinate("z")?));

        let u = get_float_property(vertex, "u").or_else(|| get_float_property(vertex, "s"));
        let v = get_float_property(vertex, "v").or_else(|| get_float_property(vertex, "t"));
        if let (Some(u), Some(v)) = (u, v) {
            builder.set_uv(Point2::new(u, v));
        }
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| MeshError::load(path, "PLY file has no face element"))?;

    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| MeshError::load(path, "face missing vertex_indices property"))?;

        if indices.len() > 3 {
            for i in 1..indices.len() - 1 {
                builder.add_face(&[indices[0], indices[i], indices[i + 1]]);
            }
        } else {
            builder.add_face(&indices);
        }
    }

    builder.build()
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to an ASCII PLY file. Only [`Attributes::UV`] is honoured.
pub fn save<P: AsRef<Path>, I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    path: P,
    attributes: Attributes,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write(mesh, &mut writer, attributes)?;
    writer.flush()?;
    log::info!("saved {}", path.display());
    Ok(())
}

/// Write a mesh as ASCII PLY.
pub fn write<W: Write, I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    writer: &mut W,
    attributes: Attributes,
) -> Result<()> {
    let with_uv = attributes.contains(Attributes::UV);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by riccimap")?;
    writeln!(writer, "element vertex {}", mesh.num_vertices())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    if with_uv {
        writeln!(writer, "property double u")?;
        writeln!(writer, "property double v")?;
    }
    writeln!(writer, "element face {}", mesh.num_faces())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for (_, v) in mesh.vertices() {
        let p = v.position;
        if with_uv {
            writeln!(writer, "{} {} {} {} {}", p.x, p.y, p.z, v.uv.x, v.uv.y)?;
        } else {
            writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
        }
    }

    for f in mesh.face_ids() {
        let [a, b, c] = mesh.face_triangle(f);
        writeln!(writer, "3 {} {} {}", a.index(), b.index(), c.index())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, VertexId};

    fn triangle() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        mesh.vertex_mut(VertexId::new(1)).uv = Point2::new(0.5, 0.25);
        mesh
    }

    #[test]
    fn test_write_with_uv() {
        let mut out = Vec::new();
        write(&triangle(), &mut out, Attributes::UV).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("property double u\nproperty double v\n"));
        assert!(text.contains("\n1 0 0 0.5 0.25\n"));
        assert!(text.ends_with("3 0 1 2\n"));
    }

    #[test]
    fn test_write_without_uv() {
        let mut out = Vec::new();
        write(&triangle(), &mut out, Attributes::empty()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(!text.contains("property double u"));
        assert!(text.contains("\n1 0 0\n"));
    }

    #[test]
    fn test_round_trip_file() {
        let path = std::env::temp_dir().join(format!("riccimap-ply-{}.ply", std::process::id()));
        save(&triangle(), &path, Attributes::UV).unwrap();
        let mesh: HalfEdgeMesh = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.vertex(VertexId::new(1)).uv, Point2::new(0.5, 0.25));
        assert_eq!(*mesh.position(VertexId::new(2)), Point3::new(0.0, 1.0, 0.0));
    }
}
