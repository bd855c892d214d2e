//! Headless orthographic point splatting

use crate::camera::Camera;
use cutmark_core::{ColoredPointCloud3f, Error, Point3f, Result};
use cutmark_io::RenderConfig;
use image::{Rgb, RgbImage};
use std::path::Path;

/// Preview image settings
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Side of the square splat drawn per point, in pixels
    pub point_size: u32,
    /// Degrees around the vertical axis
    pub yaw: f32,
    /// Degrees above the horizon
    pub pitch: f32,
    pub background: [u8; 3],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            point_size: config.point_size,
            yaw: config.yaw,
            pitch: config.pitch,
            background: [255, 255, 255],
        }
    }
}

/// Render `cloud` so that its bounding sphere fills the image.
///
/// Points nearer to the camera win where splats overlap.
pub fn render_png(cloud: &ColoredPointCloud3f, options: &RenderOptions) -> Result<RgbImage> {
    if options.width == 0 || options.height == 0 || options.point_size == 0 {
        return Err(Error::Visualization(format!(
            "cannot render a {}x{} image with {} pixel points",
            options.width, options.height, options.point_size
        )));
    }

    let mut image = RgbImage::from_pixel(options.width, options.height, Rgb(options.background));
    if cloud.is_empty() {
        return Ok(image);
    }

    let (min, max) = cloud
        .iter()
        .fold((cloud.points[0].position, cloud.points[0].position), |(lo, hi), p| {
            (lo.inf(&p.position), hi.sup(&p.position))
        });
    let center: Point3f = nalgebra::center(&min, &max);
    let radius = cloud
        .iter()
        .map(|p| (p.position - center).norm())
        .fold(0.0f32, f32::max);
    let radius = if radius > 0.0 { radius } else { 1.0 };

    let view = Camera::orbit(center, 2.0 * radius, options.yaw, options.pitch).view_matrix();
    let (w, h) = (options.width as i64, options.height as i64);
    let scale = 0.95 * 0.5 * w.min(h) as f32 / radius;
    let half = options.point_size as i64 / 2;

    let mut depth = vec![f32::NEG_INFINITY; (w * h) as usize];
    for point in cloud {
        let v = view.transform_point(&point.position);
        if !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()) {
            continue;
        }
        let cx = (w as f32 * 0.5 + v.x * scale).floor() as i64;
        let cy = (h as f32 * 0.5 - v.y * scale).floor() as i64;

        for y in (cy - half)..(cy - half + options.point_size as i64) {
            if y < 0 || y >= h {
                continue;
            }
            for x in (cx - half)..(cx - half + options.point_size as i64) {
                if x < 0 || x >= w {
                    continue;
                }
                let slot = (y * w + x) as usize;
                // the camera looks down -z, so larger z is closer
                if v.z > depth[slot] {
                    depth[slot] = v.z;
                    image.put_pixel(x as u32, y as u32, Rgb(point.color));
                }
            }
        }
    }
    Ok(image)
}

/// Save a rendered preview
pub fn save_png<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| Error::Visualization(format!("cannot write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutmark_core::ColoredPoint3f;

    fn options(size: u32) -> RenderOptions {
        RenderOptions {
            width: size,
            height: size,
            point_size: 1,
            yaw: 0.0,
            pitch: 0.0,
            background: [0, 0, 0],
        }
    }

    #[test]
    fn test_nearer_point_wins() {
        // both points project to the image center, the +z one faces the camera
        let cloud: ColoredPointCloud3f = vec![
            ColoredPoint3f { position: Point3f::new(0.0, 0.0, 1.0), color: [255, 0, 0] },
            ColoredPoint3f { position: Point3f::new(0.0, 0.0, -1.0), color: [0, 0, 255] },
        ]
        .into_iter()
        .collect();

        let image = render_png(&cloud, &options(33)).unwrap();
        assert_eq!(image.get_pixel(16, 16), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_vertical_axis_points_up() {
        let cloud: ColoredPointCloud3f = vec![
            ColoredPoint3f { position: Point3f::new(0.0, 1.0, 0.0), color: [0, 255, 0] },
            ColoredPoint3f { position: Point3f::new(0.0, -1.0, 0.0), color: [0, 0, 255] },
        ]
        .into_iter()
        .collect();

        let image = render_png(&cloud, &options(41)).unwrap();
        let top = (0..20).any(|y| image.get_pixel(20, y) == &Rgb([0, 255, 0]));
        let bottom = (21..41).any(|y| image.get_pixel(20, y) == &Rgb([0, 0, 255]));
        assert!(top && bottom);
    }

    #[test]
    fn test_empty_cloud_is_background() {
        let image = render_png(&ColoredPointCloud3f::new(), &options(8)).unwrap();
        assert!(image.pixels().all(|p| p == &Rgb([0, 0, 0])));
    }

    #[test]
    fn test_zero_size_rejected() {
        let mut bad = options(8);
        bad.point_size = 0;
        assert!(matches!(
            render_png(&ColoredPointCloud3f::new(), &bad),
            Err(Error::Visualization(_))
        ));
    }
}
