//! Point set normalization

use cutmark_core::{Error, Point3f, PointCloud, Result, Transform3D, TriangleMesh};

/// Compute the transform that centers `points` at their centroid and scales them
/// so the farthest point lies on the unit sphere.
///
/// When every point coincides with the centroid only the translation is applied.
pub fn normalization_transform(points: &[Point3f]) -> Result<Transform3D> {
    if points.is_empty() {
        return Err(Error::InvalidData("Cannot normalize an empty point set".to_string()));
    }

    let sum = points.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
    let centroid = sum / points.len() as f32;

    let max_distance = points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .fold(0.0f32, f32::max);

    let translate = Transform3D::translation(-centroid);
    if max_distance > 0.0 && max_distance.is_finite() {
        Ok(Transform3D::uniform_scaling(1.0 / max_distance) * translate)
    } else {
        log::warn!("degenerate point set (max radius {}), skipping scale", max_distance);
        Ok(translate)
    }
}

/// Normalize a point cloud in place and return the transform that was applied.
pub fn normalize_points(cloud: &mut PointCloud<Point3f>) -> Result<Transform3D> {
    let transform = normalization_transform(&cloud.points)?;
    cloud.transform(&transform);
    Ok(transform)
}

/// Normalize a cloud and apply the same transform to the mesh it was sampled from,
/// keeping both in one coordinate frame.
pub fn normalize_with_mesh(
    cloud: &mut PointCloud<Point3f>,
    mesh: &mut TriangleMesh,
) -> Result<Transform3D> {
    let transform = normalize_points(cloud)?;
    mesh.transform(&transform);
    Ok(transform)
}
