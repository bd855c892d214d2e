//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub colors: Option<Vec<[u8; 3]>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            colors: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            colors: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Check that every face references an existing vertex
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            if face.iter().any(|&v| v >= n) {
                return Err(Error::InvalidData(format!(
                    "face {} references vertex out of range ({:?}, {} vertices)",
                    i, face, n
                )));
            }
        }
        Ok(())
    }

    /// Area of a single face
    pub fn face_area(&self, face: usize) -> f32 {
        let [a, b, c] = self.faces[face];
        let v0 = self.vertices[a];
        let v1 = self.vertices[b];
        let v2 = self.vertices[c];
        0.5 * (v1 - v0).cross(&(v2 - v0)).norm()
    }

    /// Total surface area
    pub fn surface_area(&self) -> f32 {
        (0..self.faces.len()).map(|f| self.face_area(f)).sum()
    }

    /// Calculate face normals
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0]];
                let v1 = self.vertices[face[1]];
                let v2 = self.vertices[face[2]];
                
                let edge1 = v1 - v0;
                let edge2 = v2 - v0;
                
                edge1.cross(&edge2).try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros)
            })
            .collect()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Apply a transformation to all vertices; normals are rotated and renormalized
    pub fn transform(&mut self, transform: &Transform3D) {
        for vertex in &mut self.vertices {
            *vertex = transform.transform_point(vertex);
        }
        if let Some(normals) = &mut self.normals {
            for n in normals.iter_mut() {
                *n = transform.transform_vector(n).try_normalize(f32::EPSILON).unwrap_or(*n);
            }
        }
    }

    /// Drop vertices no face references and reindex the faces
    pub fn remove_unreferenced_vertices(&mut self) {
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut vertices = Vec::new();
        for face in &mut self.faces {
            for v in face.iter_mut() {
                if remap[*v] == usize::MAX {
                    remap[*v] = vertices.len();
                    vertices.push(self.vertices[*v]);
                }
                *v = remap[*v];
            }
        }
        if let Some(normals) = &self.normals {
            let mut kept = vec![Vector3f::zeros(); vertices.len()];
            for (old, &new) in remap.iter().enumerate() {
                if new != usize::MAX {
                    kept[new] = normals[old];
                }
            }
            self.normals = Some(kept);
        }
        if let Some(colors) = &self.colors {
            let mut kept = vec![[0u8; 3]; vertices.len()];
            for (old, &new) in remap.iter().enumerate() {
                if new != usize::MAX {
                    kept[new] = colors[old];
                }
            }
            self.colors = Some(kept);
        }
        self.vertices = vertices;
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
