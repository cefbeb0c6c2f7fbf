//! `.m` mesh format.
//!
//! A line-oriented text format:
//!
//! ```text
//! # comment
//! Vertex 1 0.0 0.0 0.0 {father=(4) rgb=(1 0 0) uv=(0.5 0.25)}
//! Vertex 2 1.0 0.0 0.0
//! Vertex 3 0.0 1.0 0.0
//! Face 1 1 2 3
//! Edge 1 2 {sharp}
//! ```
//!
//! Faces and edges refer to vertices by id. The optional `{...}` block holds
//! whitespace-separated `key` or `key=(value)` entries; unknown keys and
//! unknown line kinds are skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use bitflags::bitflags;
use nalgebra::Point2;
use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshBuilder, MeshIndex};

bitflags! {
    /// Optional attributes written next to positions and connectivity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Attributes: u8 {
        /// Vertex planar coordinates.
        const UV = 1 << 0;
        /// Vertex `father` ids.
        const FATHER = 1 << 1;
        /// Vertex colours.
        const RGB = 1 << 2;
        /// `Edge a b {sharp}` lines.
        const SHARP = 1 << 3;
        /// Face normals, where computed.
        const NORMAL = 1 << 4;
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::FATHER | Self::SHARP
    }
}

/// Load a mesh from an `.m` file.
///
/// # Example
///
/// ```no_run
/// use riccimap::io::m;
/// use riccimap::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = m::load("face.m").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mesh = parse(reader, path)?.build()?;
    log::info!(
        "loaded {}: {} vertices, {} faces",
        path.display(),
        mesh.num_vertices(),
        mesh.num_faces()
    );
    Ok(mesh)
}

/// Read a mesh from any buffered reader.
pub fn read<R: BufRead, I: MeshIndex>(reader: R) -> Result<HalfEdgeMesh<I>> {
    parse(reader, Path::new("<stream>"))?.build()
}

fn parse<R: BufRead>(reader: R, path: &Path) -> Result<MeshBuilder> {
    let mut builder = MeshBuilder::new();
    let mut vertex_index: HashMap<usize, usize> = HashMap::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let fail = |message: String| MeshError::load(path, format!("line {}: {}", n + 1, message));

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (head, attributes) = match line.find('{') {
            Some(i) => (&line[..i], parse_attributes(&line[i..])),
            None => (line, Vec::new()),
        };
        let mut tokens = head.split_whitespace();

        match tokens.next() {
            Some("Vertex") => {
                let id = parse_token::<usize>(tokens.next(), "vertex id").map_err(fail)?;
                let mut xyz = [0.0; 3];
                for c in &mut xyz {
                    *c = parse_token(tokens.next(), "vertex coordinate").map_err(fail)?;
                }
                let index = builder.add_vertex_with_id(id, Point3::from(xyz));
                if vertex_index.insert(id, index).is_some() {
                    return Err(fail(format!("duplicate vertex id {}", id)));
                }

                for (key, value) in attributes {
                    match (key, value) {
                        ("father", Some(v)) => {
                            builder.set_father(parse_token(Some(v), "father").map_err(fail)?)
                        }
                        ("rgb", Some(v)) => {
                            let [r, g, b] = parse_floats::<3>(v, "rgb").map_err(fail)?;
                            builder.set_rgb([r, g, b]);
                        }
                        ("uv", Some(v)) => {
                            let [u, v] = parse_floats::<2>(v, "uv").map_err(fail)?;
                            builder.set_uv(Point2::new(u, v));
                        }
                        _ => {}
                    }
                }
            }
            Some("Face") => {
                let id = parse_token::<usize>(tokens.next(), "face id").map_err(fail)?;
                let corners = tokens
                    .map(|t| {
                        let vid = parse_token::<usize>(Some(t), "face corner")?;
                        vertex_index
                            .get(&vid)
                            .copied()
                            .ok_or_else(|| format!("face {} references unknown vertex {}", id, vid))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(fail)?;
                builder.add_face_with_id(id, &corners);
            }
            Some("Edge") => {
                if !attributes.iter().any(|&(key, _)| key == "sharp") {
                    continue;
                }
                let mut endpoint = || -> std::result::Result<usize, String> {
                    let vid = parse_token::<usize>(tokens.next(), "edge vertex")?;
                    vertex_index
                        .get(&vid)
                        .copied()
                        .ok_or_else(|| format!("edge references unknown vertex {}", vid))
                };
                let v0 = endpoint().map_err(fail)?;
                let v1 = endpoint().map_err(fail)?;
                builder.add_sharp_edge(v0, v1);
            }
            Some(other) => log::trace!("skipping line kind {:?}", other),
            None => {}
        }
    }

    Ok(builder)
}

/// Split `{key key=(value) ...}` into `(key, value)` pairs.
fn parse_attributes(block: &str) -> Vec<(&str, Option<&str>)> {
    let inner = block.trim().trim_start_matches('{');
    let inner = inner.rsplit_once('}').map_or(inner, |(body, _)| body);

    let mut out = Vec::new();
    let mut rest = inner.trim_start();
    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        rest = &rest[key_end..];

        let value = match rest.strip_prefix('=') {
            Some(after) => {
                let after = after.trim_start();
                let body = after.strip_prefix('(').unwrap_or(after);
                let close = body.find(')').unwrap_or(body.len());
                rest = body.get(close + 1..).unwrap_or("");
                Some(body[..close].trim())
            }
            None => None,
        };

        if !key.is_empty() {
            out.push((key, value));
        }
        rest = rest.trim_start();
    }
    out
}

fn parse_token<T: std::str::FromStr>(token: Option<&str>, what: &str) -> std::result::Result<T, String> {
    let token = token.ok_or_else(|| format!("missing {}", what))?;
    token
        .parse()
        .map_err(|_| format!("invalid {} {:?}", what, token))
}

fn parse_floats<const N: usize>(value: &str, what: &str) -> std::result::Result<[f64; N], String> {
    let mut out = [0.0; N];
    let mut tokens = value.split_whitespace();
    for slot in &mut out {
        *slot = parse_token(tokens.next(), what)?;
    }
    Ok(out)
}

/// Save a mesh to an `.m` file.
pub fn save<P: AsRef<Path>, I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    path: P,
    attributes: Attributes,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write(mesh, &mut writer, attributes)?;
    writer.flush()?;
    log::info!("saved {} ({:?})", path.display(), attributes);
    Ok(())
}

/// Write a mesh in `.m` syntax.
pub fn write<W: Write, I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    writer: &mut W,
    attributes: Attributes,
) -> Result<()> {
    for (_, v) in mesh.vertices() {
        write!(writer, "Vertex {} {} {} {}", v.id, v.position.x, v.position.y, v.position.z)?;

        let mut entries = Vec::new();
        if attributes.contains(Attributes::FATHER) {
            if let Some(father) = v.father {
                entries.push(format!("father=({})", father));
            }
        }
        if attributes.contains(Attributes::RGB) {
            if let Some([r, g, b]) = v.rgb {
                entries.push(format!("rgb=({} {} {})", r, g, b));
            }
        }
        if attributes.contains(Attributes::UV) {
            entries.push(format!("uv=({} {})", v.uv.x, v.uv.y));
        }
        write_attributes(writer, &entries)?;
    }

    for (f, face) in mesh.faces() {
        let [a, b, c] = mesh.face_triangle(f).map(|v| mesh.vertex(v).id);
        write!(writer, "Face {} {} {} {}", face.id, a, b, c)?;

        let mut entries = Vec::new();
        if attributes.contains(Attributes::NORMAL) {
            if let Some(n) = face.normal {
                entries.push(format!("normal=({} {} {})", n.x, n.y, n.z));
            }
        }
        write_attributes(writer, &entries)?;
    }

    if attributes.contains(Attributes::SHARP) {
        for e in mesh.edge_ids().filter(|&e| mesh.edge(e).sharp) {
            let [a, b] = mesh.edge_vertices(e).map(|v| mesh.vertex(v).id);
            writeln!(writer, "Edge {} {} {{sharp}}", a, b)?;
        }
    }

    Ok(())
}

fn write_attributes<W: Write>(writer: &mut W, entries: &[String]) -> Result<()> {
    if entries.is_empty() {
        writeln!(writer)?;
    } else {
        writeln!(writer, " {{{}}}", entries.join(" "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyError;
    use crate::mesh::VertexId;

    const SQUARE: &str = "\
# unit square
Vertex 1 0 0 0 {father=(11) uv=(0 0)}
Vertex 2 1 0 0 {rgb=(1 0.5 0) uv=(1 0)}
Vertex 3 1 1 0 {uv=(1 1) label=(corner)}
Vertex 4 0 1 0 {uv=(0 1)}
Face 1 1 2 3
Face 2 1 3 4
Edge 1 2 {sharp}
Edge 2 3 {weight=(2)}
Corner 1 1 {angle=(0.5)}
";

    #[test]
    fn test_parse_attributes() {
        assert_eq!(
            parse_attributes("{uv=(0.5 1) sharp father=( 3 )}"),
            vec![("uv", Some("0.5 1")), ("sharp", None), ("father", Some("3"))]
        );
        assert!(parse_attributes("{}").is_empty());
    }

    #[test]
    fn test_read_square() {
        let mesh: HalfEdgeMesh = read(SQUARE.as_bytes()).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 2);

        let v0 = mesh.vertex(VertexId::new(0));
        assert_eq!(v0.id, 1);
        assert_eq!(v0.father, Some(11));
        assert_eq!(mesh.vertex(VertexId::new(1)).rgb, Some([1.0, 0.5, 0.0]));
        assert_eq!(mesh.vertex(VertexId::new(2)).uv, Point2::new(1.0, 1.0));

        let sharp: Vec<_> = mesh.edge_ids().filter(|&e| mesh.edge(e).sharp).collect();
        assert_eq!(sharp.len(), 1);
        let [a, b] = mesh.edge_vertices(sharp[0]).map(|v| mesh.vertex(v).id);
        assert_eq!((a.min(b), a.max(b)), (1, 2));
    }

    #[test]
    fn test_round_trip() {
        let mesh: HalfEdgeMesh = read(SQUARE.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mesh, &mut out, Attributes::all()).unwrap();

        let again: HalfEdgeMesh = read(out.as_slice()).unwrap();
        assert_eq!(again.num_faces(), mesh.num_faces());
        for ((_, a), (_, b)) in mesh.vertices().zip(again.vertices()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.position, b.position);
            assert_eq!(a.uv, b.uv);
            assert_eq!(a.father, b.father);
            assert_eq!(a.rgb, b.rgb);
        }
        for ((_, a), (_, b)) in mesh.faces().zip(again.faces()) {
            assert_eq!(a.id, b.id);
        }
        let sharp = |m: &HalfEdgeMesh| m.edge_ids().filter(|&e| m.edge(e).sharp).count();
        assert_eq!(sharp(&again), 1);
    }

    #[test]
    fn test_attribute_selection() {
        let mesh: HalfEdgeMesh = read(SQUARE.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mesh, &mut out, Attributes::UV).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Vertex 3 1 1 0 {uv=(1 1)}"));
        assert!(!text.contains("father"));
        assert!(!text.contains("rgb"));
        assert!(!text.contains("Edge"));
        assert!(text.contains("Face 2 1 3 4\n"));
    }

    #[test]
    fn test_face_normals_written() {
        let mut mesh: HalfEdgeMesh = read(SQUARE.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mesh, &mut out, Attributes::NORMAL).unwrap();
        assert!(!String::from_utf8(out).unwrap().contains("normal"));

        mesh.compute_face_normals();
        let mut out = Vec::new();
        write(&mesh, &mut out, Attributes::NORMAL).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Face 1 1 2 3 {normal=(0 0 1)}\n"));
        assert!(text.contains("Face 2 1 3 4 {normal=(0 0 1)}\n"));
    }

    #[test]
    fn test_unknown_vertex_reference() {
        let text = "Vertex 1 0 0 0\nVertex 2 1 0 0\nFace 1 1 2 9\n";
        let result: Result<HalfEdgeMesh> = read(text.as_bytes());
        match result {
            Err(MeshError::LoadError { message, .. }) => {
                assert!(message.contains("line 3"), "{}", message);
                assert!(message.contains("unknown vertex 9"), "{}", message);
            }
            other => panic!("expected LoadError, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_vertex() {
        let result: Result<HalfEdgeMesh> = read("Vertex 1 0 zero 0\n".as_bytes());
        assert!(matches!(result, Err(MeshError::LoadError { .. })));
    }

    #[test]
    fn test_topology_checked_on_read() {
        let text = "\
Vertex 1 0 0 0
Vertex 2 1 0 0
Vertex 3 0 1 0
Vertex 4 5 5 5
Face 1 1 2 3
";
        let result: Result<HalfEdgeMesh> = read(text.as_bytes());
        assert!(matches!(
            result,
            Err(MeshError::InvalidTopology(TopologyError::IsolatedVertex { vertex: 3 }))
        ));
    }
}
