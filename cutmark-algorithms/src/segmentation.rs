//! Plane fitting on marked cut points

use cutmark_core::{PointCloud, Result, Point3f, Vector3f, Error};
use nalgebra::Vector4;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::seq::index::sample;

/// A 3D plane model defined by the equation ax + by + cz + d = 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    /// Plane coefficients [a, b, c, d] where ax + by + cz + d = 0
    pub coefficients: Vector4<f32>,
}

impl PlaneModel {
    /// Create a new plane model from coefficients
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            coefficients: Vector4::new(a, b, c, d),
        }
    }

    /// Create the plane through `point` with the given normal; `None` for a zero normal
    pub fn from_point_normal(point: &Point3f, normal: &Vector3f) -> Option<Self> {
        let normal = normal.try_normalize(1e-8)?;
        Some(PlaneModel::new(normal.x, normal.y, normal.z, -normal.dot(&point.coords)))
    }

    /// Create a plane model from three points
    pub fn from_points(p1: &Point3f, p2: &Point3f, p3: &Point3f) -> Option<Self> {
        let normal = (p2 - p1).cross(&(p3 - p1));
        
        // collinear
        if normal.magnitude() < 1e-8 {
            return None;
        }
        
        Self::from_point_normal(p1, &normal)
    }

    /// Get the normal vector of the plane
    pub fn normal(&self) -> Vector3f {
        self.coefficients.xyz()
    }

    /// Signed distance; positive on the side the normal points to
    pub fn signed_distance(&self, point: &Point3f) -> f32 {
        let normal = self.normal();
        let normal_magnitude = normal.magnitude();
        
        if normal_magnitude < 1e-8 {
            return f32::INFINITY;
        }
        
        (normal.dot(&point.coords) + self.coefficients.w) / normal_magnitude
    }

    /// Calculate the distance from a point to the plane
    pub fn distance_to_point(&self, point: &Point3f) -> f32 {
        self.signed_distance(point).abs()
    }

    /// Count inliers within a distance threshold
    pub fn count_inliers(&self, points: &[Point3f], threshold: f32) -> usize {
        points.iter()
            .filter(|point| self.distance_to_point(point) <= threshold)
            .count()
    }

    /// Get indices of inlier points within a distance threshold
    pub fn get_inliers(&self, points: &[Point3f], threshold: f32) -> Vec<usize> {
        points.iter()
            .enumerate()
            .filter(|(_, point)| self.distance_to_point(point) <= threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

/// RANSAC plane segmentation result
#[derive(Debug, Clone)]
pub struct PlaneSegmentationResult {
    /// The best plane model found
    pub model: PlaneModel,
    /// Indices of inlier points
    pub inliers: Vec<usize>,
    /// Number of RANSAC iterations performed
    pub iterations: usize,
}

/// Plane segmentation using RANSAC algorithm
/// 
/// This function finds the best plane that fits the most points in the cloud
/// using the RANSAC (Random Sample Consensus) algorithm.
/// 
/// # Arguments
/// * `cloud` - Input point cloud
/// * `threshold` - Maximum distance for a point to be considered an inlier
/// * `max_iters` - Maximum number of RANSAC iterations
/// 
/// # Returns
/// * `Result<PlaneSegmentationResult>` - The best plane model and inlier indices
pub fn segment_plane(
    cloud: &PointCloud<Point3f>, 
    threshold: f32, 
    max_iters: usize
) -> Result<PlaneSegmentationResult> {
    segment_plane_with_rng(&cloud.points, threshold, max_iters, &mut StdRng::from_entropy())
}

/// [`segment_plane`] with a caller supplied random source
pub fn segment_plane_with_rng<R: Rng + ?Sized>(
    points: &[Point3f],
    threshold: f32,
    max_iters: usize,
    rng: &mut R,
) -> Result<PlaneSegmentationResult> {
    if points.len() < 3 {
        return Err(Error::InvalidData("Need at least 3 points for plane segmentation".to_string()));
    }

    if !(threshold > 0.0) {
        return Err(Error::InvalidData("Threshold must be positive".to_string()));
    }

    if max_iters == 0 {
        return Err(Error::InvalidData("Max iterations must be positive".to_string()));
    }

    let mut best_model: Option<PlaneModel> = None;
    let mut best_score = 0;

    for _iteration in 0..max_iters {
        let indices = sample(&mut *rng, points.len(), 3);

        let p1 = &points[indices.index(0)];
        let p2 = &points[indices.index(1)];
        let p3 = &points[indices.index(2)];

        if let Some(model) = PlaneModel::from_points(p1, p2, p3) {
            let inlier_count = model.count_inliers(points, threshold);
            
            if inlier_count > best_score {
                best_score = inlier_count;
                best_model = Some(model);
            }
        }
    }

    match best_model {
        Some(model) => Ok(PlaneSegmentationResult {
            model,
            inliers: model.get_inliers(points, threshold),
            iterations: max_iters,
        }),
        None => Err(Error::Algorithm("Failed to find valid plane model".to_string())),
    }
}

/// Options for extracting several cut planes from one set of cut points
#[derive(Debug, Clone)]
pub struct CutPlaneOptions {
    /// RANSAC inlier distance
    pub distance_threshold: f32,
    /// RANSAC iterations per plane
    pub max_iterations: usize,
    /// Planes supported by fewer inliers are rejected
    pub min_inliers: usize,
    /// Upper bound on the number of planes
    pub max_planes: usize,
    /// Seed for reproducible plane extraction
    pub seed: Option<u64>,
}

impl Default for CutPlaneOptions {
    fn default() -> Self {
        Self {
            distance_threshold: 0.01,
            max_iterations: 500,
            min_inliers: 30,
            max_planes: 8,
            seed: None,
        }
    }
}

/// Greedily extract cut planes: fit the dominant plane, drop its inliers, repeat.
///
/// Stops at `max_planes`, when fewer than `min_inliers` points remain, when the
/// remaining points span no plane, or when the best remaining plane is supported
/// by fewer than `min_inliers` points.
pub fn fit_cut_planes(cut_points: &[Point3f], options: &CutPlaneOptions) -> Result<Vec<PlaneModel>> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let min_inliers = options.min_inliers.max(3);
    let mut remaining = cut_points.to_vec();
    let mut planes = Vec::new();

    while planes.len() < options.max_planes && remaining.len() >= min_inliers {
        let result = match segment_plane_with_rng(
            &remaining,
            options.distance_threshold,
            options.max_iterations,
            &mut rng,
        ) {
            Ok(result) => result,
            // every sampled triple was degenerate: the rest spans no plane
            Err(Error::Algorithm(reason)) => {
                log::debug!("stopping plane extraction: {}", reason);
                break;
            }
            Err(e) => return Err(e),
        };
        if result.inliers.len() < min_inliers {
            break;
        }

        log::debug!(
            "cut plane {} with {} inliers: {:?}",
            planes.len(),
            result.inliers.len(),
            result.model.coefficients
        );

        let mut is_inlier = vec![false; remaining.len()];
        for &i in &result.inliers {
            is_inlier[i] = true;
        }
        remaining = remaining
            .into_iter()
            .zip(is_inlier)
            .filter_map(|(p, inlier)| (!inlier).then_some(p))
            .collect();
        planes.push(result.model);
    }

    log::info!("fitted {} cut planes, {} cut points unexplained", planes.len(), remaining.len());
    Ok(planes)
}
