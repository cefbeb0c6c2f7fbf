//! Mesh construction.
//!
//! [`build_from_triangles`] turns a face-vertex list into a [`HalfEdgeMesh`],
//! rejecting anything that would not give a consistent half-edge structure.
//! [`MeshBuilder`] adds the per-element annotations carried by mesh files
//! (stable ids, `father`, `rgb`, `uv`, `sharp` edges).

use std::collections::HashMap;

use nalgebra::{Point2, Point3};

use super::halfedge::{Edge, Face, HalfEdge, HalfEdgeMesh, Vertex};
use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{Result, TopologyError};

/// Build a half-edge mesh from vertices and triangle faces.
///
/// Vertex and face ids default to their array positions.
///
/// # Errors
///
/// [`MeshError::InvalidTopology`](crate::error::MeshError::InvalidTopology) if
/// the list is empty, a face is out of range or degenerate, a directed edge is
/// used twice, faces around a vertex form more than one fan, or a vertex is
/// isolated.
///
/// # Example
/// ```
/// use riccimap::mesh::{build_from_triangles, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_edges(), 3);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    let mut builder = MeshBuilder::new();
    for &p in vertices {
        builder.add_vertex(p);
    }
    for &f in faces {
        builder.add_face(&f);
    }
    builder.build()
}

/// Collects annotated vertices, faces and sharp edges, then builds the mesh.
///
/// Faces and sharp edges refer to vertices by array position (the order of
/// [`add_vertex`](Self::add_vertex) calls), not by id.
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    vertices: Vec<VertexRecord>,
    faces: Vec<(usize, Vec<usize>)>,
    sharp: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
struct VertexRecord {
    id: usize,
    position: Point3<f64>,
    father: Option<usize>,
    rgb: Option<[f64; 3]>,
    uv: Option<Point2<f64>>,
}

impl MeshBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex whose id is its position in the list. Returns that index.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        let index = self.vertices.len();
        self.add_vertex_with_id(index, position)
    }

    /// Add a vertex with an explicit id. Returns its array index.
    pub fn add_vertex_with_id(&mut self, id: usize, position: Point3<f64>) -> usize {
        self.vertices.push(VertexRecord {
            id,
            position,
            father: None,
            rgb: None,
            uv: None,
        });
        self.vertices.len() - 1
    }

    /// Annotate the most recently added vertex.
    pub fn set_father(&mut self, father: usize) {
        if let Some(v) = self.vertices.last_mut() {
            v.father = Some(father);
        }
    }

    /// Annotate the most recently added vertex.
    pub fn set_rgb(&mut self, rgb: [f64; 3]) {
        if let Some(v) = self.vertices.last_mut() {
            v.rgb = Some(rgb);
        }
    }

    /// Annotate the most recently added vertex.
    pub fn set_uv(&mut self, uv: Point2<f64>) {
        if let Some(v) = self.vertices.last_mut() {
            v.uv = Some(uv);
        }
    }

    /// Add a face. Any corner count is accepted here; non-triangles are
    /// rejected by [`build`](Self::build).
    pub fn add_face(&mut self, corners: &[usize]) -> usize {
        let index = self.faces.len();
        self.add_face_with_id(index, corners)
    }

    /// Add a face with an explicit id.
    pub fn add_face_with_id(&mut self, id: usize, corners: &[usize]) -> usize {
        self.faces.push((id, corners.to_vec()));
        self.faces.len() - 1
    }

    /// Mark the edge between two vertex indices as sharp.
    pub fn add_sharp_edge(&mut self, v0: usize, v1: usize) {
        self.sharp.push((v0, v1));
    }

    /// Validate the collected data and build the mesh.
    pub fn build<I: MeshIndex>(self) -> Result<HalfEdgeMesh<I>> {
        let triangles = self.validate_faces()?;

        let mut mesh = HalfEdgeMesh::with_capacity(self.vertices.len(), triangles.len());

        for record in &self.vertices {
            let mut v = Vertex::new(record.id, record.position);
            v.father = record.father;
            v.rgb = record.rgb;
            if let Some(uv) = record.uv {
                v.uv = uv;
            }
            mesh.vertices.push(v);
        }

        // Directed edge (v0, v1) -> face half-edge
        let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> =
            HashMap::with_capacity(triangles.len() * 3);

        for (fi, &(id, [v0, v1, v2])) in triangles.iter().enumerate() {
            let base = mesh.halfedges.len();
            let face_id = FaceId::<I>::new(fi);
            let he = [
                HalfEdgeId::<I>::new(base),
                HalfEdgeId::<I>::new(base + 1),
                HalfEdgeId::<I>::new(base + 2),
            ];
            mesh.faces.push(Face::new(id, he[0]));

            let corners = [v0, v1, v2];
            for i in 0..3 {
                let mut half = HalfEdge::new();
                half.origin = VertexId::new(corners[i]);
                half.next = he[(i + 1) % 3];
                half.prev = he[(i + 2) % 3];
                half.face = face_id;
                mesh.halfedges.push(half);

                // Overwritten by later faces; boundary vertices are fixed below.
                mesh.vertices[corners[i]].halfedge = he[i];

                let key = (corners[i], corners[(i + 1) % 3]);
                if edge_map.insert(key, he[i]).is_some() {
                    return Err(TopologyError::InconsistentPairing { v0: key.0, v1: key.1 }.into());
                }
            }
        }

        link_twins(&mut mesh, &edge_map);
        link_boundary_loops(&mut mesh)?;
        fix_boundary_vertex_halfedges(&mut mesh);
        check_vertex_fans(&mut mesh)?;
        create_edges(&mut mesh);

        for (v0, v1) in &self.sharp {
            let (a, b) = (VertexId::<I>::new(*v0), VertexId::<I>::new(*v1));
            if *v0 >= mesh.num_vertices() || *v1 >= mesh.num_vertices() {
                return Err(TopologyError::UnknownEdge { v0: *v0, v1: *v1 }.into());
            }
            let e = mesh
                .vertex_edge(a, b)
                .ok_or(TopologyError::UnknownEdge { v0: *v0, v1: *v1 })?;
            mesh.edge_mut(e).sharp = true;
        }

        log::debug!(
            "built mesh: {} vertices, {} edges, {} faces",
            mesh.num_vertices(),
            mesh.num_edges(),
            mesh.num_faces()
        );

        Ok(mesh)
    }

    fn validate_faces(&self) -> Result<Vec<(usize, [usize; 3])>> {
        if self.faces.is_empty() {
            return Err(TopologyError::EmptyMesh.into());
        }

        let mut used = vec![false; self.vertices.len()];
        let mut triangles = Vec::with_capacity(self.faces.len());

        for (fi, (id, corners)) in self.faces.iter().enumerate() {
            if corners.len() != 3 {
                return Err(TopologyError::NonTriangularFace {
                    face: fi,
                    sides: corners.len(),
                }
                .into());
            }
            for &vi in corners {
                if vi >= self.vertices.len() {
                    return Err(TopologyError::InvalidVertexIndex { face: fi, vertex: vi }.into());
                }
                used[vi] = true;
            }
            let t = [corners[0], corners[1], corners[2]];
            if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
                return Err(TopologyError::DegenerateFace { face: fi }.into());
            }
            triangles.push((*id, t));
        }

        if let Some(vertex) = used.iter().position(|&u| !u) {
            return Err(TopologyError::IsolatedVertex { vertex }.into());
        }

        Ok(triangles)
    }
}

/// Pair face half-edges and create a ghost twin for every unpaired one.
fn link_twins<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    edge_map: &HashMap<(usize, usize), HalfEdgeId<I>>,
) {
    // Walk half-edges in index order so ghost ids do not depend on hashing.
    let num_face_halfedges = mesh.num_halfedges();
    for i in 0..num_face_halfedges {
        let he = HalfEdgeId::<I>::new(i);
        if mesh.twin(he).is_valid() {
            continue;
        }
        let v0 = mesh.origin(he).index();
        let v1 = mesh.origin(mesh.next(he)).index();

        if let Some(&twin) = edge_map.get(&(v1, v0)) {
            mesh.halfedge_mut(he).twin = twin;
            mesh.halfedge_mut(twin).twin = he;
        } else {
            let ghost = HalfEdgeId::<I>::new(mesh.num_halfedges());
            let mut g = HalfEdge::new();
            g.origin = VertexId::new(v1);
            g.twin = he;
            mesh.halfedges.push(g);
            mesh.halfedge_mut(he).twin = ghost;
        }
    }
}

/// Link ghost half-edges into loops.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
    let ghosts: Vec<HalfEdgeId<I>> = mesh.halfedge_ids().filter(|&he| mesh.is_ghost(he)).collect();

    // A manifold boundary vertex has exactly one outgoing ghost.
    let mut outgoing: HashMap<usize, HalfEdgeId<I>> = HashMap::with_capacity(ghosts.len());
    for &he in &ghosts {
        let origin = mesh.origin(he).index();
        if outgoing.insert(origin, he).is_some() {
            return Err(TopologyError::NonManifoldVertex { vertex: origin }.into());
        }
    }

    for &he in &ghosts {
        let dest = mesh.dest(he).index();
        if let Some(&next_he) = outgoing.get(&dest) {
            mesh.halfedge_mut(he).next = next_he;
            mesh.halfedge_mut(next_he).prev = he;
        }
    }

    Ok(())
}

/// Make boundary vertices store their outgoing ghost.
fn fix_boundary_vertex_halfedges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for v in 0..mesh.num_vertices() {
        let vid = VertexId::<I>::new(v);
        let start = mesh.vertex(vid).halfedge;

        let mut he = start;
        loop {
            if mesh.is_ghost(he) {
                mesh.vertex_mut(vid).halfedge = he;
                break;
            }
            he = mesh.next(mesh.twin(he));
            if he == start {
                break;
            }
        }
    }
}

/// Every outgoing half-edge of a vertex must lie on the one fan reachable
/// from its stored half-edge. Two fans sharing only the vertex (closed or
/// open) leave some outgoing half-edges unreached. Also sets valences.
fn check_vertex_fans<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
    let mut outgoing = vec![0usize; mesh.num_vertices()];
    for he in mesh.halfedge_ids() {
        outgoing[mesh.origin(he).index()] += 1;
    }

    for (v, &expected) in outgoing.iter().enumerate() {
        let vid = VertexId::<I>::new(v);
        let valence = mesh.vertex_halfedges(vid).count();
        if valence != expected {
            return Err(TopologyError::NonManifoldVertex { vertex: v }.into());
        }
        mesh.vertex_mut(vid).valence = valence;
    }

    Ok(())
}

/// One [`Edge`] per twin pair, anchored at the face half-edge.
fn create_edges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for i in 0..mesh.num_halfedges() {
        let he = HalfEdgeId::<I>::new(i);
        if mesh.edge_of(he).is_valid() {
            continue;
        }
        let e = EdgeId::<I>::new(mesh.edges.len());
        mesh.edges.push(Edge::new(he));
        let twin = mesh.twin(he);
        mesh.halfedge_mut(he).edge = e;
        mesh.halfedge_mut(twin).edge = e;
    }
}

/// Convert a half-edge mesh back to a face-vertex representation.
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let vertices: Vec<Point3<f64>> = mesh.vertex_ids().map(|v| *mesh.position(v)).collect();

    let faces: Vec<[usize; 3]> = mesh
        .face_ids()
        .map(|f| mesh.face_triangle(f).map(|v| v.index()))
        .collect();

    (vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeshError;

    fn two_triangles() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3]];
        (vertices, faces)
    }

    fn topology_error(result: Result<HalfEdgeMesh>) -> TopologyError {
        match result {
            Err(MeshError::InvalidTopology(e)) => e,
            other => panic!("expected a topology error, got {:?}", other.map(|m| m.num_faces())),
        }
    }

    #[test]
    fn test_single_triangle() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();

        // 3 face half-edges + 3 ghosts
        assert_eq!(mesh.num_halfedges(), 6);
        assert_eq!(mesh.num_edges(), 3);
        assert!(mesh.is_valid());
        for v in mesh.vertex_ids() {
            assert!(mesh.is_boundary_vertex(v));
            assert_eq!(mesh.vertex(v).valence, 2);
        }
    }

    #[test]
    fn test_two_triangles() {
        let (vertices, faces) = two_triangles();
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_halfedges(), 10);
        assert_eq!(mesh.num_edges(), 5);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_roundtrip() {
        let (vertices, faces) = two_triangles();
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
        let (out_verts, out_faces) = to_face_vertex(&mesh);

        assert_eq!(out_faces, faces);
        for (v_in, v_out) in vertices.iter().zip(out_verts.iter()) {
            assert!((v_in - v_out).norm() < 1e-10);
        }
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let err = topology_error(build_from_triangles(&vertices, &[[0, 1, 2]]));
        assert_eq!(err, TopologyError::InvalidVertexIndex { face: 0, vertex: 1 });
    }

    #[test]
    fn test_degenerate_face() {
        let (vertices, _) = two_triangles();
        let err = topology_error(build_from_triangles(&vertices, &[[0, 0, 2], [1, 2, 3]]));
        assert_eq!(err, TopologyError::DegenerateFace { face: 0 });
    }

    #[test]
    fn test_inconsistent_orientation() {
        let (vertices, _) = two_triangles();
        // Second face repeats the directed edge 0 -> 1.
        let err = topology_error(build_from_triangles(&vertices, &[[0, 1, 2], [0, 1, 3]]));
        assert_eq!(err, TopologyError::InconsistentPairing { v0: 0, v1: 1 });
    }

    #[test]
    fn test_isolated_vertex() {
        let (mut vertices, faces) = two_triangles();
        vertices.push(Point3::new(5.0, 5.0, 5.0));
        let err = topology_error(build_from_triangles(&vertices, &faces));
        assert_eq!(err, TopologyError::IsolatedVertex { vertex: 4 });
    }

    #[test]
    fn test_non_triangular_face() {
        let mut builder = MeshBuilder::new();
        for i in 0..4 {
            builder.add_vertex(Point3::new(i as f64, 0.0, 0.0));
        }
        builder.add_face(&[0, 1, 2, 3]);
        let err = topology_error(builder.build());
        assert_eq!(err, TopologyError::NonTriangularFace { face: 0, sides: 4 });
    }

    #[test]
    fn test_bowtie_vertex() {
        // Two triangles touching only at vertex 0.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(-1.0, -1.0, 0.0),
        ];
        let err = topology_error(build_from_triangles(&vertices, &[[0, 1, 2], [0, 3, 4]]));
        assert_eq!(err, TopologyError::NonManifoldVertex { vertex: 0 });
    }

    fn tetrahedron_with_apex_3() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_closed_fans_sharing_a_vertex() {
        let (mut vertices, mut faces) = tetrahedron_with_apex_3();
        vertices.extend([
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, 2.0),
            Point3::new(0.5, 1.0, 2.0),
        ]);
        faces.extend([[4, 5, 6], [5, 4, 3], [6, 5, 3], [4, 6, 3]]);

        let err = topology_error(build_from_triangles(&vertices, &faces));
        assert_eq!(err, TopologyError::NonManifoldVertex { vertex: 3 });
    }

    #[test]
    fn test_open_fan_on_closed_vertex() {
        let (mut vertices, mut faces) = tetrahedron_with_apex_3();
        vertices.extend([Point3::new(1.0, 1.0, 2.0), Point3::new(0.0, 1.0, 2.0)]);
        faces.push([3, 4, 5]);

        let err = topology_error(build_from_triangles(&vertices, &faces));
        assert_eq!(err, TopologyError::NonManifoldVertex { vertex: 3 });
    }

    #[test]
    fn test_builder_annotations() {
        let (vertices, faces) = two_triangles();
        let mut builder = MeshBuilder::new();
        for (i, p) in vertices.iter().enumerate() {
            builder.add_vertex_with_id(10 + i, *p);
            if i == 2 {
                builder.set_father(7);
                builder.set_rgb([1.0, 0.5, 0.0]);
                builder.set_uv(nalgebra::Point2::new(0.25, 0.75));
            }
        }
        for f in &faces {
            builder.add_face(f);
        }
        builder.add_sharp_edge(1, 0);

        let mesh: HalfEdgeMesh = builder.build().unwrap();
        let v2 = VertexId::new(2);
        assert_eq!(mesh.vertex(v2).id, 12);
        assert_eq!(mesh.vertex(v2).father, Some(7));
        assert_eq!(mesh.vertex(v2).rgb, Some([1.0, 0.5, 0.0]));
        assert_eq!(mesh.vertex(v2).uv, nalgebra::Point2::new(0.25, 0.75));

        let e = mesh.vertex_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        assert!(mesh.edge(e).sharp);
        assert_eq!(mesh.edge_ids().filter(|&e| mesh.edge(e).sharp).count(), 1);
    }

    #[test]
    fn test_unknown_sharp_edge() {
        let (vertices, faces) = two_triangles();
        let mut builder = MeshBuilder::new();
        for p in &vertices {
            builder.add_vertex(*p);
        }
        for f in &faces {
            builder.add_face(f);
        }
        builder.add_sharp_edge(2, 3);
        let err = topology_error(builder.build());
        assert_eq!(err, TopologyError::UnknownEdge { v0: 2, v1: 3 });
    }
}
