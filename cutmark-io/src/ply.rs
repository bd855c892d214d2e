//! PLY format support

use crate::{PointCloudReader, PointCloudWriter, MeshReader, MeshWriter};
use cutmark_core::{
    ColoredPoint3f, Error, LabeledPoint3f, PointCloud, TriangleMesh, Result, Point3f, Vector3f,
};
use std::path::Path;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use ply_rs::{
    parser::Parser,
    writer::Writer,
    ply::{Property, PropertyDef, PropertyType, ScalarType, ElementDef, Encoding, Ply, Addable, DefaultElement},
};

/// Scalar vertex properties accepted as a per-point cut label, in order of preference
pub const LABEL_PROPERTIES: [&str; 4] = ["label", "distance", "scalar", "quality"];

pub struct PlyReader;
pub struct PlyWriter;

/// Encoding used when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlyFormat {
    Ascii,
    #[default]
    BinaryLittleEndian,
}

impl From<PlyFormat> for Encoding {
    fn from(format: PlyFormat) -> Self {
        match format {
            PlyFormat::Ascii => Encoding::Ascii,
            PlyFormat::BinaryLittleEndian => Encoding::BinaryLittleEndian,
        }
    }
}

fn read_ply<P: AsRef<Path>>(path: P) -> Result<Ply<DefaultElement>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let parser = Parser::<DefaultElement>::new();
    Ok(parser.read_ply(&mut reader)?)
}

fn write_ply<P: AsRef<Path>>(ply: &mut Ply<DefaultElement>, path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    Writer::new().write_ply(&mut writer, ply)?;
    Ok(())
}

fn scalar(name: &str, scalar_type: ScalarType) -> PropertyDef {
    PropertyDef::new(name.to_string(), PropertyType::Scalar(scalar_type))
}

fn vertex_element(count: usize, extra: Vec<PropertyDef>) -> ElementDef {
    let mut element = ElementDef::new("vertex".to_string());
    element.count = count;
    for axis in ["x", "y", "z"] {
        element.properties.add(scalar(axis, ScalarType::Float));
    }
    for property in extra {
        element.properties.add(property);
    }
    element
}

fn position_element(point: &Point3f) -> DefaultElement {
    let mut vertex = DefaultElement::new();
    vertex.insert("x".to_string(), Property::Float(point.x));
    vertex.insert("y".to_string(), Property::Float(point.y));
    vertex.insert("z".to_string(), Property::Float(point.z));
    vertex
}

fn read_positions(ply: &Ply<DefaultElement>) -> Result<Vec<Point3f>> {
    let Some(vertex_element) = ply.payload.get("vertex") else {
        return Ok(Vec::new());
    };
    vertex_element
        .iter()
        .map(|vertex| {
            Ok(Point3f::new(
                extract_property_value(vertex, "x")?,
                extract_property_value(vertex, "y")?,
                extract_property_value(vertex, "z")?,
            ))
        })
        .collect()
}

impl PointCloudReader for PlyReader {
    fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>> {
        let ply = read_ply(path)?;
        Ok(PointCloud::from_points(read_positions(&ply)?))
    }
}

impl PointCloudWriter for PlyWriter {
    fn write_point_cloud<P: AsRef<Path>>(cloud: &PointCloud<Point3f>, path: P) -> Result<()> {
        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = PlyFormat::default().into();
        ply.header.elements.add(vertex_element(cloud.len(), Vec::new()));
        ply.payload.insert(
            "vertex".to_string(),
            cloud.iter().map(position_element).collect(),
        );
        write_ply(&mut ply, path)
    }
}

impl PlyReader {
    /// Read a point cloud carrying a scalar cut label per vertex.
    ///
    /// The first property of [`LABEL_PROPERTIES`] present on the vertex element is used.
    pub fn read_labeled_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<LabeledPoint3f>> {
        let path = path.as_ref();
        let ply = read_ply(path)?;
        let positions = read_positions(&ply)?;
        let Some(vertices) = ply.payload.get("vertex") else {
            return Ok(PointCloud::new());
        };

        let label_name = vertices
            .first()
            .and_then(|v| LABEL_PROPERTIES.iter().find(|name| v.contains_key(**name)))
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "{} has no label property (expected one of {:?})",
                    path.display(),
                    LABEL_PROPERTIES
                ))
            })?;

        let labels = vertices
            .iter()
            .map(|v| extract_property_value(v, label_name))
            .collect::<Result<Vec<f32>>>()?;

        log::debug!("read {} labeled points from {} ('{}')", labels.len(), path.display(), label_name);
        PointCloud::<LabeledPoint3f>::from_parts(&positions, &labels)
    }
}

impl PlyWriter {
    /// Write a point cloud with a `label` float property per vertex
    pub fn write_labeled_point_cloud<P: AsRef<Path>>(
        cloud: &PointCloud<LabeledPoint3f>,
        path: P,
        format: PlyFormat,
    ) -> Result<()> {
        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = format.into();
        ply.header.elements.add(vertex_element(cloud.len(), vec![scalar("label", ScalarType::Float)]));

        let vertices = cloud
            .iter()
            .map(|p| {
                let mut vertex = position_element(&p.position);
                vertex.insert("label".to_string(), Property::Float(p.label));
                vertex
            })
            .collect();
        ply.payload.insert("vertex".to_string(), vertices);
        write_ply(&mut ply, path)
    }

    /// Write a point cloud with `red green blue` uchar properties per vertex
    pub fn write_colored_point_cloud<P: AsRef<Path>>(
        cloud: &PointCloud<ColoredPoint3f>,
        path: P,
        format: PlyFormat,
    ) -> Result<()> {
        let colors = vec![
            scalar("red", ScalarType::UChar),
            scalar("green", ScalarType::UChar),
            scalar("blue", ScalarType::UChar),
        ];
        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = format.into();
        ply.header.comments.push("cut scores mapped through the jet colormap".to_string());
        ply.header.elements.add(vertex_element(cloud.len(), colors));

        let vertices = cloud
            .iter()
            .map(|p| {
                let mut vertex = position_element(&p.position);
                vertex.insert("red".to_string(), Property::UChar(p.color[0]));
                vertex.insert("green".to_string(), Property::UChar(p.color[1]));
                vertex.insert("blue".to_string(), Property::UChar(p.color[2]));
                vertex
            })
            .collect();
        ply.payload.insert("vertex".to_string(), vertices);
        write_ply(&mut ply, path)
    }
}

impl MeshReader for PlyReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let ply = read_ply(path)?;
        let vertices = read_positions(&ply)?;

        // Polygons are fan triangulated
        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                for k in 1..indices.len().saturating_sub(1) {
                    faces.push([indices[0], indices[k], indices[k + 1]]);
                }
            }
        }

        // Normals only when every vertex has them
        let normals = ply.payload.get("vertex").and_then(|vertex_element| {
            vertex_element
                .iter()
                .map(|vertex| {
                    Some(Vector3f::new(
                        extract_property_value(vertex, "nx").ok()?,
                        extract_property_value(vertex, "ny").ok()?,
                        extract_property_value(vertex, "nz").ok()?,
                    ))
                })
                .collect::<Option<Vec<_>>>()
                .filter(|normals| !normals.is_empty())
        });

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if let Some(normals) = normals {
            mesh.set_normals(normals);
        }

        Ok(mesh)
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = PlyFormat::default().into();

        let normal_props: Vec<PropertyDef> = if mesh.normals.is_some() {
            ["nx", "ny", "nz"].iter().map(|n| scalar(n, ScalarType::Float)).collect()
        } else {
            Vec::new()
        };
        ply.header.elements.add(vertex_element(mesh.vertices.len(), normal_props));

        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.faces.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        let mut vertices = Vec::with_capacity(mesh.vertices.len());
        for (i, vertex) in mesh.vertices.iter().enumerate() {
            let mut element = position_element(vertex);
            if let Some(n) = mesh.normals.as_ref().and_then(|normals| normals.get(i)) {
                element.insert("nx".to_string(), Property::Float(n.x));
                element.insert("ny".to_string(), Property::Float(n.y));
                element.insert("nz".to_string(), Property::Float(n.z));
            }
            vertices.push(element);
        }
        ply.payload.insert("vertex".to_string(), vertices);

        let mut faces = Vec::with_capacity(mesh.faces.len());
        for face in &mesh.faces {
            let indices = face
                .iter()
                .map(|&i| {
                    i32::try_from(i).map_err(|_| {
                        Error::InvalidData(format!("Vertex index {} does not fit a PLY int", i))
                    })
                })
                .collect::<Result<Vec<i32>>>()?;
            let mut element = DefaultElement::new();
            element.insert("vertex_indices".to_string(), Property::ListInt(indices));
            faces.push(element);
        }
        ply.payload.insert("face".to_string(), faces);

        write_ply(&mut ply, path)
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        Some(Property::Char(val)) => Ok(*val as f32),
        Some(Property::UChar(val)) => Ok(*val as f32),
        _ => Err(Error::InvalidData(
            format!("Property '{}' not found or invalid type", name)
        )),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    let invalid = || Error::InvalidData("Negative face index".to_string());
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => indices
            .iter()
            .map(|&idx| usize::try_from(idx).map_err(|_| invalid()))
            .collect(),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUShort(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        _ => Err(Error::InvalidData(
            "Face indices not found".to_string()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("cutmark_ply_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_ascii_mesh_with_quads_and_normals() {
        let path = temp_path("quad.ply");
        let ply_content = "ply
format ascii 1.0
comment quad
element vertex 4
property float x
property float y
property float z
property float nx
property float ny
property float nz
element face 1
property list uchar int vertex_indices
end_header
0.0 0.0 0.0 0.0 0.0 1.0
1.0 0.0 0.0 0.0 0.0 1.0
1.0 1.0 0.0 0.0 0.0 1.0
0.0 1.0 0.0 0.0 0.0 1.0
4 0 1 2 3
";
        fs::write(&path, ply_content).unwrap();

        let mesh = PlyReader::read_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(mesh.normals.is_some());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_labeled_cloud_accepts_alternate_names() {
        let path = temp_path("gt.ply");
        let ply_content = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
property uchar distance
end_header
0 0 0 0
1 0 0 1
0 1 0 1
";
        fs::write(&path, ply_content).unwrap();

        let cloud = PlyReader::read_labeled_point_cloud(&path).unwrap();
        assert_eq!(cloud.labels(), vec![0.0, 1.0, 1.0]);
        assert_eq!(cloud[1].position, Point3f::new(1.0, 0.0, 0.0));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_labeled_cloud_without_label_fails() {
        let path = temp_path("nolabel.ply");
        let cloud = PointCloud::from_points(vec![Point3f::new(0.0, 0.0, 0.0)]);
        PlyWriter::write_point_cloud(&cloud, &path).unwrap();

        assert!(matches!(
            PlyReader::read_labeled_point_cloud(&path),
            Err(Error::InvalidData(_))
        ));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_colored_cloud_header() {
        let path = temp_path("colored.ply");
        let cloud = PointCloud::from_points(vec![
            ColoredPoint3f { position: Point3f::new(0.5, 0.0, 0.0), color: [0, 0, 128] },
            ColoredPoint3f { position: Point3f::new(0.0, 0.5, 0.0), color: [128, 0, 0] },
        ]);
        PlyWriter::write_colored_point_cloud(&cloud, &path, PlyFormat::Ascii).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("element vertex 2"));
        assert!(text.contains("property uchar red"));
        assert!(text.contains("0 0 128"));

        // positions still read back through the plain reader
        let plain = PlyReader::read_point_cloud(&path).unwrap();
        assert_eq!(plain.len(), 2);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_labeled_cloud_binary_roundtrip() {
        let path = temp_path("labels_bin.ply");
        let positions = vec![Point3f::new(0.1, 0.2, 0.3), Point3f::new(-1.0, 2.0, 0.5)];
        let cloud = PointCloud::<LabeledPoint3f>::from_parts(&positions, &[0.25, 1.0]).unwrap();
        PlyWriter::write_labeled_point_cloud(&cloud, &path, PlyFormat::BinaryLittleEndian).unwrap();

        let loaded = PlyReader::read_labeled_point_cloud(&path).unwrap();
        assert_eq!(loaded.positions(), positions);
        assert_eq!(loaded.labels(), vec![0.25, 1.0]);
        let _ = fs::remove_file(path);
    }
}
