//! Discrete Gaussian curvature and the curvature cut heuristic

use crate::nearest_neighbor::KdTree;
use cutmark_core::{Error, NearestNeighborSearch, Point3f, Result, TriangleMesh};
use rayon::prelude::*;
use std::f32::consts::TAU;

/// Default ball radius for the curvature measure, in normalized units
pub const DEFAULT_CURVATURE_RADIUS: f32 = 0.02;

/// Measures below this value flag a cut
pub const DEFAULT_CURVATURE_THRESHOLD: f32 = -0.1;

/// Angle defect per vertex: `2π` minus the sum of the corner angles of all faces
/// incident to the vertex. Vertices no face references keep the full `2π`.
pub fn vertex_defects(mesh: &TriangleMesh) -> Result<Vec<f32>> {
    mesh.validate()?;

    let mut angle_sums = vec![0.0f32; mesh.vertex_count()];
    for face in &mesh.faces {
        for corner in 0..3 {
            let v = face[corner];
            let a = mesh.vertices[face[(corner + 1) % 3]] - mesh.vertices[v];
            let b = mesh.vertices[face[(corner + 2) % 3]] - mesh.vertices[v];
            angle_sums[v] += a.cross(&b).norm().atan2(a.dot(&b));
        }
    }

    Ok(angle_sums.into_iter().map(|sum| TAU - sum).collect())
}

/// For each query point, the sum of the vertex defects of all mesh vertices within
/// `radius` of it. The result is parallel to `points`.
pub fn discrete_gaussian_curvature_measure(
    mesh: &TriangleMesh,
    points: &[Point3f],
    radius: f32,
) -> Result<Vec<f32>> {
    if !(radius > 0.0) {
        return Err(Error::InvalidData(format!("Curvature radius must be positive, got {}", radius)));
    }
    let defects = vertex_defects(mesh)?;
    let index = KdTree::new(&mesh.vertices);

    Ok(points
        .par_iter()
        .map(|p| {
            index
                .find_radius_neighbors(p, radius)
                .into_iter()
                .map(|(v, _)| defects[v])
                .sum()
        })
        .collect())
}

/// Label points whose curvature measure falls below `threshold` as cuts (1.0),
/// everything else as 0.0.
pub fn curvature_cut_labels(
    mesh: &TriangleMesh,
    points: &[Point3f],
    radius: f32,
    threshold: f32,
) -> Result<Vec<f32>> {
    let measure = discrete_gaussian_curvature_measure(mesh, points, radius)?;
    let labels: Vec<f32> = measure
        .into_iter()
        .map(|k| if k < threshold { 1.0 } else { 0.0 })
        .collect();

    log::info!(
        "curvature heuristic flagged {} of {} points (radius {}, threshold {})",
        labels.iter().filter(|&&l| l > 0.0).count(),
        labels.len(),
        radius,
        threshold
    );
    Ok(labels)
}
