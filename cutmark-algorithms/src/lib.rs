//! # cutmark Algorithms
//!
//! Geometry routines behind cut point marking and mesh decomposition.
//!
//! This crate covers point set normalization, score thresholding, surface sampling,
//! nearest neighbor search, the discrete Gaussian curvature heuristic, RANSAC cut
//! plane fitting and clipping a triangle mesh along planes.

pub mod normalize;
pub mod threshold;
pub mod sampling;
pub mod nearest_neighbor;
pub mod curvature;
pub mod segmentation;
pub mod clip;

// Re-export commonly used items
pub use normalize::*;
pub use threshold::*;
pub use sampling::*;
pub use nearest_neighbor::*;
pub use curvature::*;
pub use segmentation::*;
pub use clip::*;
