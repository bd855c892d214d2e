//! Integration tests for cutmark-algorithms
//!
//! These run the geometric half of the pipeline end to end on an L shaped
//! prism: sampling, normalization, curvature marking and decomposition.

use approx::assert_relative_eq;
use cutmark_algorithms::*;
use cutmark_core::{Point3f, TriangleMesh};

/// Extrusion of the L outline (0,0) (2,0) (2,1) (1,1) (1,2) (0,2) over z in [0, 1].
/// Vertex 3 and 9 sit on the reflex edge.
fn l_prism() -> TriangleMesh {
    let outline = [(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)];
    let mut vertices: Vec<Point3f> = outline.iter().map(|&(x, y)| Point3f::new(x, y, 0.0)).collect();
    vertices.extend(outline.iter().map(|&(x, y)| Point3f::new(x, y, 1.0)));

    let mut faces = Vec::new();
    // caps fanned from the reflex corner
    for (a, b) in [(4, 5), (5, 0), (0, 1), (1, 2)] {
        faces.push([3 + 6, a + 6, b + 6]);
        faces.push([3, b, a]);
    }
    for i in 0..6 {
        let j = (i + 1) % 6;
        faces.push([i, j, j + 6]);
        faces.push([i, j + 6, i + 6]);
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

#[test]
fn test_l_prism_is_well_formed() {
    let mesh = l_prism();
    mesh.validate().unwrap();
    assert_relative_eq!(mesh.surface_area(), 14.0, epsilon = 1e-4);

    let defects = vertex_defects(&mesh).unwrap();
    let total: f32 = defects.iter().sum();
    assert_relative_eq!(total, 4.0 * std::f32::consts::PI, epsilon = 1e-4);
    assert_relative_eq!(defects[3], -std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    assert_relative_eq!(defects[9], -std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
}

#[test]
fn test_sample_and_normalize_keeps_mesh_in_frame() {
    let mut mesh = l_prism();
    let mut cloud = sample_surface(&mesh, 4000, Some(11)).unwrap();
    assert_eq!(cloud.len(), 4000);

    let transform = normalize_with_mesh(&mut cloud, &mut mesh).unwrap();

    let centroid = cloud.centroid().unwrap();
    assert_relative_eq!(centroid.coords.norm(), 0.0, epsilon = 1e-4);
    let max_norm = cloud.iter().map(|p| p.coords.norm()).fold(0.0f32, f32::max);
    assert_relative_eq!(max_norm, 1.0, epsilon = 1e-5);

    // the mesh moved with the cloud, so the reflex corner maps consistently
    let corner = transform.transform_point(&Point3f::new(1.0, 1.0, 0.0));
    assert_relative_eq!(mesh.vertices[3], corner, epsilon = 1e-6);

    // no vertex lies far outside the sampled radius
    for v in &mesh.vertices {
        assert!(v.coords.norm() <= 1.1);
    }
}

#[test]
fn test_curvature_marks_reflex_edge_only() {
    let mesh = l_prism();
    let points = sample_surface(&mesh, 3000, Some(5)).unwrap().points;
    let radius = 0.2;
    let labels = curvature_cut_labels(&mesh, &points, radius, DEFAULT_CURVATURE_THRESHOLD).unwrap();
    assert_eq!(labels.len(), points.len());

    let reflex = [Point3f::new(1.0, 1.0, 0.0), Point3f::new(1.0, 1.0, 1.0)];
    for (p, &label) in points.iter().zip(&labels) {
        let near_reflex = reflex.iter().any(|r| (p - r).norm() <= radius);
        assert_eq!(label, if near_reflex { 1.0 } else { 0.0 }, "point {:?}", p);
    }

    let exact = curvature_cut_labels(&mesh, &reflex, DEFAULT_CURVATURE_RADIUS, DEFAULT_CURVATURE_THRESHOLD).unwrap();
    assert_eq!(exact, vec![1.0, 1.0]);
}

#[test]
fn test_decompose_along_marked_cut() {
    let mesh = l_prism();
    let mut cut_points = Vec::new();
    for i in 0..=20 {
        for k in 0..=10 {
            cut_points.push(Point3f::new(i as f32 * 0.1, 0.5, k as f32 * 0.1));
        }
    }

    let options = CutPlaneOptions {
        distance_threshold: 0.01,
        max_iterations: 200,
        min_inliers: 30,
        max_planes: 4,
        seed: Some(2),
    };
    let pieces = decompose(&mesh, &cut_points, &options).unwrap();
    assert_eq!(pieces.len(), 2);

    let mut areas: Vec<f32> = pieces.iter().map(|p| p.surface_area()).collect();
    areas.sort_by(|a, b| a.total_cmp(b));
    // 2 x 0.5 x 1 box below the cut, the rest of the L plus its cap above
    assert_relative_eq!(areas[0], 7.0, epsilon = 1e-3);
    assert_relative_eq!(areas[1], 11.0, epsilon = 1e-3);

    for piece in &pieces {
        piece.validate().unwrap();
    }
}

#[test]
fn test_threshold_then_fit_on_scores() {
    // scores from any source reduce to cut points the same way
    let mesh = l_prism();
    let points: Vec<Point3f> = (0..=40)
        .flat_map(|i| (0..=10).map(move |k| Point3f::new(0.5, i as f32 * 0.05, k as f32 * 0.1)))
        .collect();
    let raw: Vec<f32> = points.iter().map(|p| 0.4 + 0.2 * p.z).collect();
    let labels = threshold_scores(&raw, 0.5);

    let cut_points: Vec<Point3f> = points
        .iter()
        .zip(&labels)
        .filter(|(_, &l)| l == 1.0)
        .map(|(p, _)| *p)
        .collect();
    assert!(cut_points.iter().all(|p| p.z >= 0.5 - 1e-6));

    let options = CutPlaneOptions { seed: Some(9), ..Default::default() };
    let planes = fit_cut_planes(&cut_points, &options).unwrap();
    assert_eq!(planes.len(), 1);
    assert!(planes[0].normal().x.abs() > 0.99);

    let pieces = multiclip(&mesh, &planes).unwrap();
    assert_eq!(pieces.len(), 2);
}
