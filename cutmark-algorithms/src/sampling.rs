//! Uniform surface sampling of triangle meshes

use cutmark_core::{Error, Point3f, PointCloud, Result, TriangleMesh};
use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Draw `num_points` points uniformly over the surface of `mesh`.
///
/// Triangles are chosen with probability proportional to their area, then a point is
/// placed inside the chosen triangle with the square-root barycentric construction.
/// Passing a `seed` makes the result reproducible.
pub fn sample_surface(
    mesh: &TriangleMesh,
    num_points: usize,
    seed: Option<u64>,
) -> Result<PointCloud<Point3f>> {
    if mesh.is_empty() {
        return Err(Error::InvalidData("Cannot sample an empty mesh".to_string()));
    }
    if num_points == 0 {
        return Err(Error::InvalidData("Number of samples must be positive".to_string()));
    }
    mesh.validate()?;

    let areas: Vec<f32> = (0..mesh.face_count())
        .into_par_iter()
        .map(|f| mesh.face_area(f))
        .collect();

    let distribution = WeightedIndex::new(&areas)
        .map_err(|e| Error::InvalidData(format!("Mesh has no sampleable area: {}", e)))?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut cloud = PointCloud::with_capacity(num_points);
    for _ in 0..num_points {
        let [a, b, c] = mesh.faces[distribution.sample(&mut rng)];
        let r1: f32 = rng.gen();
        let r2: f32 = rng.gen();
        let s = r1.sqrt();

        let coords = mesh.vertices[a].coords * (1.0 - s)
            + mesh.vertices[b].coords * (s * (1.0 - r2))
            + mesh.vertices[c].coords * (s * r2);
        cloud.push(Point3f::from(coords));
    }

    log::debug!(
        "sampled {} points over {} faces (area {:.4})",
        num_points,
        mesh.face_count(),
        areas.iter().sum::<f32>()
    );
    Ok(cloud)
}
