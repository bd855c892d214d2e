//! OBJ format support

use crate::{MeshReader, MeshWriter};
use cutmark_core::{Error, Point3f, Result, TriangleMesh};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let path = path.as_ref();
        let obj = ::obj::Obj::load(path)
            .map_err(|e| Error::InvalidData(format!("Failed to parse {}: {}", path.display(), e)))?;

        let vertices = obj
            .data
            .position
            .iter()
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();

        // Every polygon of every group, fan triangulated
        let mut faces = Vec::new();
        for object in &obj.data.objects {
            for group in &object.groups {
                for polygon in &group.polys {
                    let indices: Vec<usize> = polygon.0.iter().map(|tuple| tuple.0).collect();
                    for k in 1..indices.len().saturating_sub(1) {
                        faces.push([indices[0], indices[k], indices[k + 1]]);
                    }
                }
            }
        }

        Ok(TriangleMesh::from_vertices_and_faces(vertices, faces))
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }
        if let Some(normals) = &mesh.normals {
            for n in normals {
                writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
            }
            for [a, b, c] in &mesh.faces {
                writeln!(writer, "f {0}//{0} {1}//{1} {2}//{2}", a + 1, b + 1, c + 1)?;
            }
        } else {
            for [a, b, c] in &mesh.faces {
                writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_obj_quad_is_fanned() {
        let path = std::env::temp_dir().join(format!("cutmark_obj_{}_quad.obj", std::process::id()));
        fs::write(&path, "o quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();

        let mesh = ObjReader::read_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_obj_roundtrip_with_normals() {
        let path = std::env::temp_dir().join(format!("cutmark_obj_{}_tri.obj", std::process::id()));
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        mesh.set_normals(vec![cutmark_core::Vector3f::z(); 3]);
        ObjWriter::write_mesh(&mesh, &path).unwrap();

        let loaded = ObjReader::read_mesh(&path).unwrap();
        assert_eq!(loaded.faces, mesh.faces);
        assert_eq!(loaded.vertices, mesh.vertices);
        let _ = fs::remove_file(path);
    }
}
