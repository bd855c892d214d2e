//! Clipping triangle meshes along planes
//!
//! A clip splits every face that straddles the plane and closes each half with a
//! cap triangulated in the plane over that half's open cross-section border.

use crate::segmentation::{fit_cut_planes, CutPlaneOptions, PlaneModel};
use cutmark_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
use spade::handles::FixedVertexHandle;
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};
use std::collections::HashMap;

/// Vertices closer to the plane than this are treated as lying on it
pub const CLIP_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Negative,
    On,
    Positive,
}

/// Shared vertex pool of one clip: the input vertices followed by the
/// intersection points, each created once per cut edge.
struct ClipState<'a> {
    plane: &'a PlaneModel,
    distances: Vec<f32>,
    vertices: Vec<Point3f>,
    on_plane: Vec<bool>,
    edge_points: HashMap<(usize, usize), usize>,
    pos_faces: Vec<[usize; 3]>,
    neg_faces: Vec<[usize; 3]>,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

impl<'a> ClipState<'a> {
    fn new(mesh: &TriangleMesh, plane: &'a PlaneModel, epsilon: f32) -> Self {
        let distances: Vec<f32> = mesh.vertices.iter().map(|v| plane.signed_distance(v)).collect();
        Self {
            plane,
            on_plane: distances.iter().map(|d| d.abs() <= epsilon).collect(),
            distances,
            vertices: mesh.vertices.clone(),
            edge_points: HashMap::new(),
            pos_faces: Vec::new(),
            neg_faces: Vec::new(),
        }
    }

    fn side(&self, v: usize, epsilon: f32) -> Side {
        let d = self.distances[v];
        if d > epsilon {
            Side::Positive
        } else if d < -epsilon {
            Side::Negative
        } else {
            Side::On
        }
    }

    fn intersection(&mut self, a: usize, b: usize) -> usize {
        let key = edge_key(a, b);
        if let Some(&idx) = self.edge_points.get(&key) {
            return idx;
        }
        // always interpolate from the lower index so both faces agree bit for bit
        let (lo, hi) = key;
        let t = self.distances[lo] / (self.distances[lo] - self.distances[hi]);
        let p = self.vertices[lo] + (self.vertices[hi] - self.vertices[lo]) * t;
        let idx = self.vertices.len();
        self.vertices.push(p);
        self.on_plane.push(true);
        self.edge_points.insert(key, idx);
        idx
    }

    fn emit(&mut self, side: Side, face: [usize; 3]) {
        match side {
            Side::Positive => self.pos_faces.push(face),
            Side::Negative => self.neg_faces.push(face),
            Side::On => {}
        }
    }

    /// A face lying in the plane bounds the half its normal points away from
    fn coplanar_side(&self, face: [usize; 3]) -> Side {
        let [a, b, c] = face.map(|i| self.vertices[i]);
        let alignment = (b - a).cross(&(c - a)).dot(&self.plane.normal());
        if alignment > 0.0 {
            Side::Negative
        } else if alignment < 0.0 {
            Side::Positive
        } else {
            Side::On
        }
    }

    fn split_face(&mut self, face: [usize; 3], sides: [Side; 3]) {
        if let Some(k) = sides.iter().position(|&s| s == Side::On) {
            // one vertex on the plane, the other two on opposite sides
            let (z, p, q) = (face[k], face[(k + 1) % 3], face[(k + 2) % 3]);
            let i = self.intersection(p, q);
            self.emit(sides[(k + 1) % 3], [z, p, i]);
            self.emit(sides[(k + 2) % 3], [z, i, q]);
            return;
        }

        // the vertex alone on its side
        let k = (0..3)
            .find(|&k| sides[k] != sides[(k + 1) % 3] && sides[k] != sides[(k + 2) % 3])
            .unwrap_or(0);
        let (a, b, c) = (face[k], face[(k + 1) % 3], face[(k + 2) % 3]);
        let i_ab = self.intersection(a, b);
        let i_ca = self.intersection(c, a);
        self.emit(sides[k], [a, i_ab, i_ca]);
        self.emit(sides[(k + 1) % 3], [i_ab, b, c]);
        self.emit(sides[(k + 1) % 3], [i_ab, c, i_ca]);
    }

    /// Open edges of `faces` that lie in the plane, sorted for a stable triangulation
    fn open_plane_edges(&self, faces: &[[usize; 3]]) -> Vec<(usize, usize)> {
        let mut uses: HashMap<(usize, usize), usize> = HashMap::new();
        for face in faces {
            for k in 0..3 {
                *uses.entry(edge_key(face[k], face[(k + 1) % 3])).or_insert(0) += 1;
            }
        }
        let mut segments: Vec<(usize, usize)> = uses
            .into_iter()
            .filter(|&((a, b), count)| count % 2 == 1 && self.on_plane[a] && self.on_plane[b])
            .map(|(edge, _)| edge)
            .collect();
        segments.sort_unstable();
        segments
    }

    /// Triangulate the region enclosed by `segments`. Triangles are counterclockwise
    /// in the plane basis, i.e. facing along the plane normal.
    fn cap(&self, segments: &[(usize, usize)]) -> Result<Vec<[usize; 3]>> {
        let mut border_vertices: Vec<usize> = segments.iter().flat_map(|&(a, b)| [a, b]).collect();
        border_vertices.sort_unstable();
        border_vertices.dedup();
        if border_vertices.len() < 3 {
            return Ok(Vec::new());
        }

        let (u, v) = plane_basis(&self.plane.normal());
        let project = |p: &Point3f| Point2::new(p.coords.dot(&u) as f64, p.coords.dot(&v) as f64);

        let mut cdt: ConstrainedDelaunayTriangulation<Point2<f64>> =
            ConstrainedDelaunayTriangulation::new();
        let mut handles: HashMap<usize, FixedVertexHandle> = HashMap::new();
        let mut owners: HashMap<FixedVertexHandle, usize> = HashMap::new();
        for &idx in &border_vertices {
            let handle = cdt
                .insert(project(&self.vertices[idx]))
                .map_err(|e| Error::Algorithm(format!("Cap triangulation failed: {:?}", e)))?;
            handles.insert(idx, handle);
            owners.entry(handle).or_insert(idx);
        }

        let mut polygon = Vec::with_capacity(segments.len());
        for &(a, b) in segments {
            let (ha, hb) = (handles[&a], handles[&b]);
            polygon.push((project(&self.vertices[a]), project(&self.vertices[b])));
            if ha == hb {
                continue;
            }
            if cdt.can_add_constraint(ha, hb) {
                cdt.add_constraint(ha, hb);
            } else {
                log::debug!("skipping crossing cap constraint {} -> {}", a, b);
            }
        }

        let mut triangles = Vec::new();
        for face in cdt.inner_faces() {
            let corners = face.vertices();
            let centroid = corners.iter().fold(Point2::new(0.0, 0.0), |acc, c| {
                let p = c.position();
                Point2::new(acc.x + p.x / 3.0, acc.y + p.y / 3.0)
            });
            if inside_polygon(&polygon, centroid) {
                triangles.push(corners.map(|c| owners[&c.fix()]));
            }
        }
        log::trace!("cap: {} border segments, {} triangles", segments.len(), triangles.len());
        Ok(triangles)
    }

    fn close(&mut self) -> Result<()> {
        // the negative half is bounded above by the plane, so its cap faces along the normal
        let neg_cap = self.cap(&self.open_plane_edges(&self.neg_faces))?;
        let pos_cap = self.cap(&self.open_plane_edges(&self.pos_faces))?;
        self.neg_faces.extend(neg_cap);
        self.pos_faces.extend(pos_cap.into_iter().map(|[a, b, c]| [a, c, b]));
        Ok(())
    }

    fn into_meshes(self) -> (TriangleMesh, TriangleMesh) {
        let mut pos = TriangleMesh::from_vertices_and_faces(self.vertices.clone(), self.pos_faces);
        let mut neg = TriangleMesh::from_vertices_and_faces(self.vertices, self.neg_faces);
        pos.remove_unreferenced_vertices();
        neg.remove_unreferenced_vertices();
        (pos, neg)
    }
}

/// Orthonormal (u, v) spanning the plane with `u × v` along `normal`
fn plane_basis(normal: &Vector3f) -> (Vector3f, Vector3f) {
    let n = normal.normalize();
    let axis = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
        Vector3f::x()
    } else if n.y.abs() <= n.z.abs() {
        Vector3f::y()
    } else {
        Vector3f::z()
    };
    let u = n.cross(&axis).normalize();
    let v = n.cross(&u);
    (u, v)
}

/// Even-odd rule against an unordered set of border segments
fn inside_polygon(segments: &[(Point2<f64>, Point2<f64>)], p: Point2<f64>) -> bool {
    let mut inside = false;
    for (a, b) in segments {
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Split `mesh` by `plane` into the part on the positive side of the plane and the
/// part on the negative side, both closed with a cap along the cross-section.
///
/// A face lying in the plane stays with the half it bounds. Either half may come
/// back empty when the plane misses the mesh.
pub fn clip(mesh: &TriangleMesh, plane: &PlaneModel) -> Result<(TriangleMesh, TriangleMesh)> {
    clip_with_epsilon(mesh, plane, CLIP_EPSILON)
}

/// [`clip`] with an explicit on-plane tolerance
pub fn clip_with_epsilon(
    mesh: &TriangleMesh,
    plane: &PlaneModel,
    epsilon: f32,
) -> Result<(TriangleMesh, TriangleMesh)> {
    mesh.validate()?;
    if plane.normal().norm() < 1e-8 {
        return Err(Error::InvalidData("Clip plane has a zero normal".to_string()));
    }

    let mut state = ClipState::new(mesh, plane, epsilon);
    let mut degenerate = 0;
    for &face in &mesh.faces {
        let sides = face.map(|v| state.side(v, epsilon));
        let has_pos = sides.contains(&Side::Positive);
        let has_neg = sides.contains(&Side::Negative);
        match (has_pos, has_neg) {
            (true, true) => state.split_face(face, sides),
            (true, false) => state.emit(Side::Positive, face),
            (false, true) => state.emit(Side::Negative, face),
            (false, false) => match state.coplanar_side(face) {
                Side::On => degenerate += 1,
                side => state.emit(side, face),
            },
        }
    }
    if degenerate > 0 {
        log::debug!("dropped {} degenerate faces lying in the clip plane", degenerate);
    }

    state.close()?;
    Ok(state.into_meshes())
}

/// Clip `mesh` by every plane in turn, splitting all pieces produced so far.
/// Empty pieces are discarded.
pub fn multiclip(mesh: &TriangleMesh, planes: &[PlaneModel]) -> Result<Vec<TriangleMesh>> {
    let mut pieces = vec![mesh.clone()];
    for plane in planes {
        let mut next = Vec::with_capacity(pieces.len() * 2);
        for piece in &pieces {
            let (pos, neg) = clip(piece, plane)?;
            next.extend([pos, neg].into_iter().filter(|m| !m.is_empty()));
        }
        pieces = next;
    }
    Ok(pieces)
}

/// Fit cut planes to `cut_points` and clip `mesh` along them.
pub fn decompose(
    mesh: &TriangleMesh,
    cut_points: &[Point3f],
    options: &CutPlaneOptions,
) -> Result<Vec<TriangleMesh>> {
    let planes = fit_cut_planes(cut_points, options)?;
    let pieces = multiclip(mesh, &planes)?;
    log::info!("decomposed mesh into {} pieces with {} planes", pieces.len(), planes.len());
    Ok(pieces)
}
