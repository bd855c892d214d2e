//! Visualization of cut scores
//!
//! Scores are mapped through the `jet` colormap onto the points they belong to.
//! The colored cloud is written as PLY for any external viewer, and a headless
//! software rasterizer produces a PNG preview.

pub mod colormap;
pub mod camera;
pub mod renderer;

pub use colormap::*;
pub use camera::*;
pub use renderer::*;

use cutmark_core::{ColoredPoint3f, ColoredPointCloud3f, Error, Point3f, Result};
use cutmark_io::{PlyFormat, PlyWriter};
use std::path::Path;

/// Color every point by its score, clipped to `[0, 1]`
pub fn colorize(points: &[Point3f], scores: &[f32]) -> Result<ColoredPointCloud3f> {
    if points.len() != scores.len() {
        return Err(Error::InvalidData(format!(
            "{} points but {} scores",
            points.len(),
            scores.len()
        )));
    }
    let lut = jet_lut();
    Ok(points
        .iter()
        .zip(scores)
        .map(|(&position, &score)| ColoredPoint3f { position, color: lut[jet_index(score)] })
        .collect())
}

/// Write the jet colored cloud to `ply_path` and, when asked, a PNG preview.
pub fn show_point_cloud<P: AsRef<Path>>(
    points: &[Point3f],
    scores: &[f32],
    ply_path: P,
    preview: Option<(&Path, &RenderOptions)>,
) -> Result<ColoredPointCloud3f> {
    let cloud = colorize(points, scores)?;
    let ply_path = ply_path.as_ref();
    PlyWriter::write_colored_point_cloud(&cloud, ply_path, PlyFormat::BinaryLittleEndian)?;
    log::info!("wrote {} colored points to {}", cloud.len(), ply_path.display());

    if let Some((png_path, options)) = preview {
        let image = render_png(&cloud, options)?;
        save_png(&image, png_path)?;
        log::info!("wrote preview to {}", png_path.display());
    }
    Ok(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_extremes() {
        let points = vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)];
        let cloud = colorize(&points, &[0.0, 1.0]).unwrap();
        assert_eq!(cloud.points[0].color, [0, 0, 128]);
        assert_eq!(cloud.points[1].color, [128, 0, 0]);
        assert_eq!(cloud.points[1].position, points[1]);
    }

    #[test]
    fn test_colorize_length_mismatch() {
        assert!(matches!(
            colorize(&[Point3f::origin()], &[]),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_show_point_cloud_writes_files() {
        let dir = std::env::temp_dir();
        let ply = dir.join(format!("cutmark_vis_{}.ply", std::process::id()));
        let png = dir.join(format!("cutmark_vis_{}.png", std::process::id()));
        let points: Vec<Point3f> = (0..50).map(|i| Point3f::new(i as f32 * 0.02, 0.0, 0.0)).collect();
        let scores: Vec<f32> = (0..50).map(|i| (i % 2) as f32).collect();
        let options = RenderOptions { width: 64, height: 48, ..Default::default() };

        show_point_cloud(&points, &scores, &ply, Some((png.as_path(), &options))).unwrap();

        let cloud = cutmark_io::read_point_cloud(&ply).unwrap();
        assert_eq!(cloud.len(), 50);
        let preview = image::open(&png).unwrap().to_rgb8();
        assert_eq!(preview.dimensions(), (64, 48));

        let _ = std::fs::remove_file(ply);
        let _ = std::fs::remove_file(png);
    }
}
