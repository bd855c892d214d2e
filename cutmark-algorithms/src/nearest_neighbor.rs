//! Nearest neighbor search implementations

use cutmark_core::{Drawable, NearestNeighborSearch, Point3f, PointCloud};
use rstar::RTree;

/// A point with its index for spatial data structures
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    point: Point3f,
    index: usize,
}

impl rstar::Point for IndexedPoint {
    type Scalar = f32;
    const DIMENSIONS: usize = 3;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            point: Point3f::new(generator(0), generator(1), generator(2)),
            index: usize::MAX,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        self.point[index]
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        &mut self.point[index]
    }
}

impl IndexedPoint {
    fn query(point: &Point3f) -> Self {
        Self {
            point: *point,
            index: usize::MAX,
        }
    }
}

/// Spatial index over a fixed point set, backed by an R*-tree
pub struct KdTree {
    tree: RTree<IndexedPoint>,
    bounds: (Point3f, Point3f),
}

impl KdTree {
    pub fn new(points: &[Point3f]) -> Self {
        let bounds = PointCloud::from_points(points.to_vec()).bounding_box();
        let indexed = points
            .iter()
            .enumerate()
            .map(|(index, &point)| IndexedPoint { point, index })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
            bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    fn within(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        self.tree
            .locate_within_distance(IndexedPoint::query(query), radius * radius)
            .map(|p| (p.index, (p.point - query).norm()))
            .collect()
    }
}

fn sort_by_distance(found: &mut [(usize, f32)]) {
    found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
}

impl NearestNeighborSearch for KdTree {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let k = k.min(self.len());

        // grow the search ball until it holds k points; the bounding box diagonal
        // plus the query offset always covers everything
        let (lower, upper) = self.bounds;
        let cover = (upper - lower).norm() + (nalgebra::center(&lower, &upper) - query).norm();
        if !cover.is_finite() {
            return Vec::new();
        }

        let mut radius = (cover / self.len() as f32).max(f32::EPSILON);
        loop {
            let mut found = self.within(query, radius);
            if found.len() >= k || radius > cover {
                sort_by_distance(&mut found);
                found.truncate(k);
                return found;
            }
            radius *= 2.0;
        }
    }
    
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let mut found = self.within(query, radius);
        sort_by_distance(&mut found);
        found
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        let mut distances: Vec<(usize, f32)> = self.points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm()))
            .collect();
        
        sort_by_distance(&mut distances);
        distances.truncate(k);
        distances
    }
    
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let radius_squared = radius * radius;
        let mut found: Vec<(usize, f32)> = self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let distance_squared = (point - query).norm_squared();
                (distance_squared <= radius_squared).then(|| (idx, distance_squared.sqrt()))
            })
            .collect();
        sort_by_distance(&mut found);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<Point3f> {
        // many shared coordinates per axis on purpose
        let mut points = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                for k in 0..4 {
                    points.push(Point3f::new(i as f32 * 0.1, j as f32 * 0.1, k as f32 * 0.1));
                }
            }
        }
        points
    }

    #[test]
    fn test_radius_matches_brute_force() {
        let points = grid();
        let tree = KdTree::new(&points);
        let brute = BruteForceSearch::new(&points);

        for query in [Point3f::new(0.35, 0.35, 0.15), Point3f::new(0.0, 0.0, 0.0), Point3f::new(2.0, 2.0, 2.0)] {
            let a: Vec<usize> = tree.find_radius_neighbors(&query, 0.15).into_iter().map(|(i, _)| i).collect();
            let b: Vec<usize> = brute.find_radius_neighbors(&query, 0.15).into_iter().map(|(i, _)| i).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_k_nearest_matches_brute_force() {
        let points = grid();
        let tree = KdTree::new(&points);
        let brute = BruteForceSearch::new(&points);

        let query = Point3f::new(0.33, 0.41, 0.07);
        let a = tree.find_k_nearest(&query, 5);
        let b = brute.find_k_nearest(&query, 5);
        assert_eq!(a.len(), 5);
        for (x, y) in a.iter().zip(&b) {
            assert!((x.1 - y.1).abs() < 1e-6);
        }

        let far = Point3f::new(100.0, 0.0, 0.0);
        assert_eq!(tree.find_k_nearest(&far, 10_000).len(), points.len());
    }

    #[test]
    fn test_k_nearest_non_finite_query() {
        let tree = KdTree::new(&grid());
        assert!(tree.find_k_nearest(&Point3f::new(f32::NAN, 0.0, 0.0), 3).is_empty());
        assert!(tree.find_k_nearest(&Point3f::new(f32::INFINITY, 0.0, 0.0), 3).is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::new(&[]);
        assert!(tree.is_empty());
        assert!(tree.find_k_nearest(&Point3f::origin(), 3).is_empty());
        assert!(tree.find_radius_neighbors(&Point3f::origin(), 1.0).is_empty());
    }
}
