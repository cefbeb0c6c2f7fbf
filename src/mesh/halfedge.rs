//! Half-edge mesh data structure.
//!
//! The mesh stores topology together with the per-element attributes the
//! curvature flow and the embedder work on. Topology never changes after
//! [`build_from_triangles`](super::build_from_triangles) returns; only the
//! attribute values (conformal factors, lengths, angles, coordinates) do.
//!
//! # Structure
//!
//! - Each edge is split into two **half-edges** pointing in opposite directions
//! - Each half-edge knows its **twin**, **next** and **prev** around its face,
//!   **origin vertex**, **face** and undirected **edge**
//! - Faces are oriented counter-clockwise; walking `next(twin(he))` around a
//!   vertex visits its outgoing half-edges clockwise
//!
//! # Boundary Handling
//!
//! A face half-edge on the mesh boundary has no partner face. Its twin is a
//! *ghost* half-edge with an invalid face ID; ghosts are linked into loops
//! through `next`/`prev`, running opposite to the face half-edges. A boundary
//! vertex always stores its outgoing ghost, which gives O(1) access to the
//! boundary half-edges entering and leaving it.

use nalgebra::{Point2, Point3, Vector3};

use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};

/// A vertex and its flow/embedding attributes.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// Stable id, as read from the input file (defaults to the array index).
    pub id: usize,

    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// One outgoing half-edge from this vertex.
    /// For boundary vertices, this is the outgoing ghost half-edge.
    pub halfedge: HalfEdgeId<I>,

    /// Conformal factor; `exp(u)` is the radius of the vertex circle.
    pub u: f64,

    /// Current discrete curvature.
    pub k: f64,

    /// Target curvature.
    pub target_k: f64,

    /// Planar coordinate, valid once the mesh has been embedded.
    pub uv: Point2<f64>,

    /// Set by the embedder once `uv` has been placed.
    pub touched: bool,

    /// Number of neighbouring vertices.
    pub valence: usize,

    /// Index of the vertex this one was split from, if any.
    pub father: Option<usize>,

    /// Vertex color.
    pub rgb: Option<[f64; 3]>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new vertex at the given position.
    pub fn new(id: usize, position: Point3<f64>) -> Self {
        Self {
            id,
            position,
            halfedge: HalfEdgeId::invalid(),
            u: 0.0,
            k: 0.0,
            target_k: 0.0,
            uv: Point2::origin(),
            touched: false,
            valence: 0,
            father: None,
            rgb: None,
        }
    }
}

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge originates from.
    pub origin: VertexId<I>,

    /// The opposite half-edge (pointing in the reverse direction).
    pub twin: HalfEdgeId<I>,

    /// The next half-edge around the face (counter-clockwise).
    pub next: HalfEdgeId<I>,

    /// The previous half-edge around the face.
    pub prev: HalfEdgeId<I>,

    /// The face this half-edge belongs to. Invalid for ghosts.
    pub face: FaceId<I>,

    /// The undirected edge shared with the twin.
    pub edge: EdgeId<I>,

    /// Corner angle at the target vertex, between this half-edge and `next`.
    /// It is the angle opposite the edge of `prev`.
    pub angle: f64,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new unlinked half-edge.
    pub fn new() -> Self {
        Self {
            origin: VertexId::invalid(),
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
            edge: EdgeId::invalid(),
            angle: 0.0,
        }
    }

    /// `true` for ghost half-edges (no face).
    #[inline]
    pub fn is_ghost(&self) -> bool {
        !self.face.is_valid()
    }
}

impl<I: MeshIndex> Default for HalfEdge<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// An undirected edge.
#[derive(Debug, Clone, Copy)]
pub struct Edge<I: MeshIndex = u32> {
    /// One of the two half-edges. Always a face half-edge.
    pub halfedge: HalfEdgeId<I>,

    /// Metric length. Derived from the endpoint conformal factors during the flow.
    pub length: f64,

    /// Sum over incident faces of `w / length`.
    pub weight: f64,

    /// Input constraint flag.
    pub sharp: bool,
}

impl<I: MeshIndex> Edge<I> {
    /// Create an edge anchored at `halfedge`.
    pub fn new(halfedge: HalfEdgeId<I>) -> Self {
        Self {
            halfedge,
            length: 0.0,
            weight: 0.0,
            sharp: false,
        }
    }
}

/// A triangular face.
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// Stable id, as read from the input file (defaults to the array index).
    pub id: usize,

    /// One half-edge on the boundary of this face.
    pub halfedge: HalfEdgeId<I>,

    /// Set by the embedder once all three corners are placed.
    pub touched: bool,

    /// Unit normal, filled by [`HalfEdgeMesh::compute_face_normals`].
    pub normal: Option<Vector3<f64>>,
}

impl<I: MeshIndex> Face<I> {
    /// Create a new face with the given half-edge.
    pub fn new(id: usize, halfedge: HalfEdgeId<I>) -> Self {
        Self {
            id,
            halfedge,
            touched: false,
            normal: None,
        }
    }
}

/// A half-edge mesh data structure for triangle meshes.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) edges: Vec<Edge<I>>,
    pub(crate) faces: Vec<Face<I>>,
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    pub(crate) fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Closed mesh: HE = 3F; with boundary, slightly more.
        let num_halfedges = num_faces * 3 + num_faces / 2;

        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_halfedges),
            edges: Vec::with_capacity(num_halfedges / 2),
            faces: Vec::with_capacity(num_faces),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges, ghosts included.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    /// Get a mutable vertex by ID.
    #[inline]
    pub fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    /// Get an edge by ID.
    #[inline]
    pub fn edge(&self, id: EdgeId<I>) -> &Edge<I> {
        &self.edges[id.index()]
    }

    /// Get a mutable edge by ID.
    #[inline]
    pub fn edge_mut(&mut self, id: EdgeId<I>) -> &mut Edge<I> {
        &mut self.edges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get a mutable face by ID.
    #[inline]
    pub fn face_mut(&mut self, id: FaceId<I>) -> &mut Face<I> {
        &mut self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(self.twin(he))
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Get the undirected edge of a half-edge.
    #[inline]
    pub fn edge_of(&self, he: HalfEdgeId<I>) -> EdgeId<I> {
        self.halfedge(he).edge
    }

    /// The two half-edges of an edge. The first always has a face.
    #[inline]
    pub fn edge_halfedges(&self, e: EdgeId<I>) -> [HalfEdgeId<I>; 2] {
        let he = self.edge(e).halfedge;
        [he, self.twin(he)]
    }

    /// The two endpoints of an edge.
    #[inline]
    pub fn edge_vertices(&self, e: EdgeId<I>) -> [VertexId<I>; 2] {
        let he = self.edge(e).halfedge;
        [self.origin(he), self.dest(he)]
    }

    /// `true` for ghost half-edges (outside the mesh).
    #[inline]
    pub fn is_ghost(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_ghost()
    }

    /// `true` for a face half-edge with no partner face, i.e. whose twin is a ghost.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        !self.is_ghost(he) && self.is_ghost(self.twin(he))
    }

    /// `true` if the edge has a single incident face.
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeId<I>) -> bool {
        let [_, twin] = self.edge_halfedges(e);
        self.is_ghost(twin)
    }

    /// `true` if the vertex lies on the mesh boundary.
    #[inline]
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        let he = self.vertex(v).halfedge;
        he.is_valid() && self.is_ghost(he)
    }

    /// The boundary half-edge leaving `v`, i.e. the most clockwise outgoing
    /// face half-edge. For interior vertices there is no extreme direction and
    /// the stored outgoing half-edge is returned.
    pub fn most_clw_out_halfedge(&self, v: VertexId<I>) -> HalfEdgeId<I> {
        let he = self.vertex(v).halfedge;
        if self.is_ghost(he) {
            // prev(ghost) is the ghost arriving at v, its twin leaves v.
            self.twin(self.prev(he))
        } else {
            he
        }
    }

    /// The boundary half-edge entering `v`, i.e. the most counter-clockwise
    /// incoming face half-edge. For interior vertices the twin of the stored
    /// outgoing half-edge is returned.
    pub fn most_ccw_in_halfedge(&self, v: VertexId<I>) -> HalfEdgeId<I> {
        self.twin(self.vertex(v).halfedge)
    }

    /// The edge joining `a` and `b`, if any.
    pub fn vertex_edge(&self, a: VertexId<I>, b: VertexId<I>) -> Option<EdgeId<I>> {
        self.vertex_halfedges(a)
            .find(|&he| self.dest(he) == b)
            .map(|he| self.edge_of(he))
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all vertices with their IDs.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId<I>, &Vertex<I>)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (VertexId::new(i), v))
    }

    /// Iterate over all half-edge IDs, ghosts included.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        (0..self.edges.len()).map(EdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over all faces with their IDs.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId<I>, &Face<I>)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, f)| (FaceId::new(i), f))
    }

    /// Outgoing half-edges around a vertex, clockwise. For a boundary vertex
    /// the outgoing ghost comes first, then the face half-edges from the most
    /// counter-clockwise one to [`most_clw_out_halfedge`](Self::most_clw_out_halfedge).
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Incoming face half-edges around a vertex, counter-clockwise order
    /// mirrored from [`vertex_halfedges`](Self::vertex_halfedges).
    pub fn vertex_in_halfedges(&self, v: VertexId<I>) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.vertex_halfedges(v)
            .map(|he| self.twin(he))
            .filter(|&he| !self.is_ghost(he))
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.dest(he))
    }

    /// Iterate over half-edges around a face.
    pub fn face_halfedges(&self, f: FaceId<I>) -> FaceHalfEdgeIter<'_, I> {
        FaceHalfEdgeIter::new(self, f)
    }

    /// The three half-edges of a face, starting at the stored one.
    pub fn face_halfedge_triangle(&self, f: FaceId<I>) -> [HalfEdgeId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        [he0, he1, self.next(he1)]
    }

    /// Get the three vertices of a face, as listed in the input.
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        self.face_halfedge_triangle(f).map(|he| self.origin(he))
    }

    /// Get the three edges of a face: `v0v1`, `v1v2`, `v2v0`.
    pub fn face_edges(&self, f: FaceId<I>) -> [EdgeId<I>; 3] {
        self.face_halfedge_triangle(f).map(|he| self.edge_of(he))
    }

    /// Faces sharing an edge with `f`.
    pub fn face_neighbors(&self, f: FaceId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.face_halfedges(f)
            .map(|he| self.face_of(self.twin(he)))
            .filter(|n| n.is_valid())
    }

    // ==================== Attributes ====================

    /// Metric length of a half-edge's edge.
    #[inline]
    pub fn length(&self, he: HalfEdgeId<I>) -> f64 {
        self.edge(self.edge_of(he)).length
    }

    /// Euclidean length of a half-edge from the 3D positions.
    pub fn euclidean_length(&self, he: HalfEdgeId<I>) -> f64 {
        let p0 = self.position(self.origin(he));
        let p1 = self.position(self.dest(he));
        (p1 - p0).norm()
    }

    /// Get the positions of the three vertices of a triangular face.
    pub fn face_positions(&self, f: FaceId<I>) -> [Point3<f64>; 3] {
        self.face_triangle(f).map(|v| *self.position(v))
    }

    /// Compute the area of a face from the 3D positions.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Fill [`Face::normal`] from the 3D positions.
    pub fn compute_face_normals(&mut self) {
        for f in 0..self.faces.len() {
            let fid = FaceId::new(f);
            let [p0, p1, p2] = self.face_positions(fid);
            let n = (p1 - p0).cross(&(p2 - p0));
            self.faces[f].normal = n.try_normalize(f64::EPSILON);
        }
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;

        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Some((min, max))
    }

    /// `V - E + F`.
    pub fn euler_characteristic(&self) -> i64 {
        self.num_vertices() as i64 - self.num_edges() as i64 + self.num_faces() as i64
    }

    /// Clear the embedder's `touched` flags on vertices and faces.
    pub fn reset_touched(&mut self) {
        for v in &mut self.vertices {
            v.touched = false;
        }
        for f in &mut self.faces {
            f.touched = false;
        }
    }

    // ==================== Validation ====================

    /// Check that all connectivity is consistent and every face is a triangle.
    pub fn is_valid(&self) -> bool {
        for (vid, v) in self.vertices() {
            if !v.halfedge.is_valid() || self.halfedge(v.halfedge).origin != vid {
                return false;
            }
        }

        for (i, he) in self.halfedges.iter().enumerate() {
            let heid = HalfEdgeId::new(i);
            if !he.twin.is_valid() || self.halfedge(he.twin).twin != heid {
                return false;
            }
            if self.halfedge(he.next).prev != heid || self.halfedge(he.prev).next != heid {
                return false;
            }
            if self.halfedge(he.twin).edge != he.edge {
                return false;
            }
            if he.is_ghost() && self.is_ghost(he.twin) {
                return false;
            }
        }

        for (fid, f) in self.faces() {
            let [a, b, c] = self.face_halfedge_triangle(fid);
            if self.next(c) != a || [a, b, c].iter().any(|&he| self.face_of(he) != fid) {
                return false;
            }
            if self.halfedge(f.halfedge).face != fid {
                return false;
            }
        }

        true
    }
}

/// Iterator over outgoing half-edges around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, v: VertexId<I>) -> Self {
        let start = mesh.vertex(v).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // he: v -> w, twin(he): w -> v, next(twin(he)) leaves v in the face
        // on the right of he.
        self.current = self.mesh.next(self.mesh.twin(self.current));

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

/// Iterator over half-edges around a face.
pub struct FaceHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> FaceHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, f: FaceId<I>) -> Self {
        let start = mesh.face(f).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for FaceHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;
        self.current = self.mesh.next(self.current);

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}
