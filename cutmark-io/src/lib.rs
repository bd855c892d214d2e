//! I/O operations for point clouds, meshes and configuration
//! 
//! This crate reads and writes the PLY and OBJ files the cut marking pipeline
//! consumes and produces, and loads the YAML run configuration.

pub mod ply;
pub mod obj;
pub mod config;

pub use config::*;
pub use ply::{PlyReader, PlyWriter, PlyFormat};
pub use self::obj::{ObjReader, ObjWriter};

use cutmark_core::{Error, PointCloud, TriangleMesh, Result, Point3f};
use std::path::Path;

/// Trait for reading point clouds from files
pub trait PointCloudReader {
    fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>>;
}

/// Trait for writing point clouds to files
pub trait PointCloudWriter {
    fn write_point_cloud<P: AsRef<Path>>(cloud: &PointCloud<Point3f>, path: P) -> Result<()>;
}

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Auto-detect format and read point cloud
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("ply") => PlyReader::read_point_cloud(path),
        _ => Err(Error::UnsupportedFormat(
            format!("Unsupported point cloud format: {:?}", path.extension())
        )),
    }
}

/// Auto-detect format and write point cloud
pub fn write_point_cloud<P: AsRef<Path>>(cloud: &PointCloud<Point3f>, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("ply") => PlyWriter::write_point_cloud(cloud, path),
        _ => Err(Error::UnsupportedFormat(
            format!("Unsupported point cloud format: {:?}", path.extension())
        )),
    }
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let mesh = match extension(path).as_deref() {
        Some("obj") => ObjReader::read_mesh(path)?,
        Some("ply") => PlyReader::read_mesh(path)?,
        _ => return Err(Error::UnsupportedFormat(
            format!("Unsupported mesh format: {:?}", path.extension())
        )),
    };
    mesh.validate()?;
    log::debug!(
        "read mesh {}: {} vertices, {} faces",
        path.display(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("obj") => ObjWriter::write_mesh(mesh, path),
        Some("ply") => PlyWriter::write_mesh(mesh, path),
        _ => Err(Error::UnsupportedFormat(
            format!("Unsupported mesh format: {:?}", path.extension())
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("cutmark_io_{}_{}", std::process::id(), name))
    }

    fn tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    #[test]
    fn test_auto_detect_mesh_formats() {
        for ext in ["ply", "obj", "PLY"] {
            let path = temp_path(&format!("tet.{}", ext));
            write_mesh(&tetrahedron(), &path).unwrap();
            let mesh = read_mesh(&path).unwrap();
            assert_eq!(mesh.vertex_count(), 4);
            assert_eq!(mesh.faces, tetrahedron().faces);
            let _ = fs::remove_file(path);
        }
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(read_mesh("mesh.stl"), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(read_point_cloud("cloud.xyz"), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(
            write_mesh(&tetrahedron(), temp_path("mesh")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_read_mesh_rejects_bad_indices() {
        let path = temp_path("bad.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nf 1 2 9\n").unwrap();
        assert!(read_mesh(&path).is_err());
        let _ = fs::remove_file(path);
    }
}
