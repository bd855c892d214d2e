//! Camera utilities for the preview renderer

use nalgebra::{Matrix4, Point3, Vector3};

/// A camera orbiting a target point
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) -> Self {
        Self { position, target, up }
    }

    /// Place the camera `distance` away from `target`, `yaw` degrees around the
    /// vertical (y) axis and `pitch` degrees above the horizon.
    pub fn orbit(target: Point3<f32>, distance: f32, yaw: f32, pitch: f32) -> Self {
        let yaw = yaw.to_radians();
        // looking straight down makes the up vector degenerate
        let pitch = pitch.clamp(-89.0, 89.0).to_radians();
        let direction = Vector3::new(
            pitch.cos() * yaw.sin(),
            pitch.sin(),
            pitch.cos() * yaw.cos(),
        );
        Self::new(target + direction * distance, target, Vector3::y())
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Unit vector from the camera to its target
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.position).normalize()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 0.0, 5.0), Point3::origin(), Vector3::y())
    }
}
