//! Cut point prediction
//!
//! The network itself is an opaque collaborator behind [`CutPredictor`]. This
//! crate splits the input into batches, runs the predictor on each batch,
//! stitches the rows back together in input order and optionally binarizes them.

pub mod predictor;
#[cfg(feature = "torch")]
pub mod torch;

pub use predictor::*;
#[cfg(feature = "torch")]
pub use torch::TorchCutModel;

use cutmark_core::{Error, Point3f, Result};
use std::path::Path;

/// Load the scripted cut prediction model at `path`
#[cfg(feature = "torch")]
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Box<dyn CutPredictor>> {
    Ok(Box::new(TorchCutModel::load(path)?))
}

/// Load the scripted cut prediction model at `path`
#[cfg(not(feature = "torch"))]
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Box<dyn CutPredictor>> {
    Err(Error::Unsupported(format!(
        "cannot load {}: cutmark was built without the `torch` feature",
        path.as_ref().display()
    )))
}

/// One cloud or a stack of equally sized clouds
#[derive(Debug, Clone, PartialEq)]
pub enum PointBatch {
    Single(Vec<Point3f>),
    Batched(Vec<Vec<Point3f>>),
}

impl PointBatch {
    fn check(&self) -> Result<()> {
        if let PointBatch::Batched(clouds) = self {
            if let Some(first) = clouds.first() {
                if let Some((i, cloud)) = clouds.iter().enumerate().find(|(_, c)| c.len() != first.len()) {
                    return Err(Error::InvalidData(format!(
                        "cloud {} has {} points, expected {}",
                        i,
                        cloud.len(),
                        first.len()
                    )));
                }
            }
        }
        Ok(())
    }

    fn clouds(&self) -> Vec<&[Point3f]> {
        match self {
            PointBatch::Single(points) => vec![points.as_slice()],
            PointBatch::Batched(clouds) => clouds.iter().map(Vec::as_slice).collect(),
        }
    }
}

impl From<Vec<Point3f>> for PointBatch {
    fn from(points: Vec<Point3f>) -> Self {
        PointBatch::Single(points)
    }
}

impl From<Vec<Vec<Point3f>>> for PointBatch {
    fn from(clouds: Vec<Vec<Point3f>>) -> Self {
        PointBatch::Batched(clouds)
    }
}

/// Scores shaped like the input: one row for a single cloud, one row per cloud otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum CutScores {
    Single(Vec<f32>),
    Batched(Vec<Vec<f32>>),
}

impl CutScores {
    /// Flatten into one row per input cloud
    pub fn into_rows(self) -> Vec<Vec<f32>> {
        match self {
            CutScores::Single(row) => vec![row],
            CutScores::Batched(rows) => rows,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarkOptions {
    /// Clouds per predictor call
    pub batch_size: usize,
    pub cut_point_threshold: f32,
    /// Return raw scores instead of 0/1 labels
    pub no_threshold: bool,
}

impl Default for MarkOptions {
    fn default() -> Self {
        Self {
            batch_size: 8,
            cut_point_threshold: 0.5,
            no_threshold: false,
        }
    }
}

/// Score every point of `points` with `predictor`.
///
/// The clouds are fed in chunks of `options.batch_size`; chunk outputs are
/// concatenated in input order. A single cloud comes back as a single row.
pub fn mark_cuts<P: CutPredictor + ?Sized>(
    points: &PointBatch,
    predictor: &P,
    options: &MarkOptions,
) -> Result<CutScores> {
    if options.batch_size == 0 {
        return Err(Error::Config("batch_size must be at least 1".to_string()));
    }
    points.check()?;

    let clouds = points.clouds();
    let mut rows: Vec<Vec<f32>> = Vec::with_capacity(clouds.len());

    for (chunk_index, chunk) in clouds.chunks(options.batch_size).enumerate() {
        let output = predictor.predict(chunk)?;
        if output.len() != chunk.len() {
            return Err(Error::Inference(format!(
                "batch {} returned {} rows for {} clouds",
                chunk_index,
                output.len(),
                chunk.len()
            )));
        }
        for (cloud, row) in chunk.iter().zip(&output) {
            if row.len() != cloud.len() {
                return Err(Error::Inference(format!(
                    "batch {} returned {} scores for a cloud of {} points",
                    chunk_index,
                    row.len(),
                    cloud.len()
                )));
            }
        }
        log::debug!("batch {}: {} clouds", chunk_index, chunk.len());
        rows.extend(output);
    }

    if !options.no_threshold {
        for row in &mut rows {
            cutmark_algorithms::threshold_in_place(row, options.cut_point_threshold);
        }
    }

    Ok(match points {
        PointBatch::Single(_) => CutScores::Single(rows.pop().unwrap_or_default()),
        PointBatch::Batched(_) => CutScores::Batched(rows),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;

    /// Scores each point by its x coordinate and records the chunk sizes it saw
    struct XScore {
        calls: RefCell<Vec<usize>>,
    }

    impl XScore {
        fn new() -> Self {
            Self { calls: RefCell::new(Vec::new()) }
        }
    }

    impl CutPredictor for XScore {
        fn predict(&self, batch: &[&[Point3f]]) -> Result<Vec<Vec<f32>>> {
            self.calls.borrow_mut().push(batch.len());
            Ok(batch.iter().map(|cloud| cloud.iter().map(|p| p.x).collect()).collect())
        }
    }

    struct DropsRow;

    impl CutPredictor for DropsRow {
        fn predict(&self, batch: &[&[Point3f]]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![Vec::new(); batch.len().saturating_sub(1)])
        }
    }

    fn cloud(tag: f32, n: usize) -> Vec<Point3f> {
        (0..n).map(|i| Point3f::new(tag + i as f32 * 0.01, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_batches_are_concatenated_in_order() {
        let clouds: Vec<Vec<Point3f>> = (0..5).map(|i| cloud(i as f32, 4)).collect();
        let predictor = XScore::new();
        let options = MarkOptions { batch_size: 2, no_threshold: true, ..Default::default() };

        let scores = mark_cuts(&PointBatch::Batched(clouds.clone()), &predictor, &options).unwrap();
        assert_eq!(*predictor.calls.borrow(), vec![2, 2, 1]);

        let rows = scores.into_rows();
        assert_eq!(rows.len(), 5);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), 4);
            assert_relative_eq!(row[0], i as f32);
        }
    }

    #[test]
    fn test_single_cloud_is_squeezed() {
        let predictor = XScore::new();
        let options = MarkOptions { batch_size: 8, no_threshold: true, ..Default::default() };
        let scores = mark_cuts(&PointBatch::Single(cloud(0.3, 3)), &predictor, &options).unwrap();

        assert_eq!(*predictor.calls.borrow(), vec![1]);
        match scores {
            CutScores::Single(row) => {
                assert_eq!(row.len(), 3);
                assert_relative_eq!(row[2], 0.32, epsilon = 1e-6);
            }
            other => panic!("expected a single row, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_applied() {
        let points = vec![
            Point3f::new(0.1, 0.0, 0.0),
            Point3f::new(0.5, 0.0, 0.0),
            Point3f::new(0.9, 0.0, 0.0),
        ];
        let scores = mark_cuts(&points.into(), &XScore::new(), &MarkOptions::default()).unwrap();
        assert_eq!(scores, CutScores::Single(vec![0.0, 1.0, 1.0]));
    }

    #[test]
    fn test_batch_size_larger_than_input() {
        let clouds: Vec<Vec<Point3f>> = (0..3).map(|i| cloud(i as f32, 2)).collect();
        let predictor = XScore::new();
        let options = MarkOptions { batch_size: 10, ..Default::default() };
        mark_cuts(&clouds.into(), &predictor, &options).unwrap();
        assert_eq!(*predictor.calls.borrow(), vec![3]);
    }

    #[test]
    fn test_zero_batch_size() {
        let result = mark_cuts(
            &PointBatch::Single(cloud(0.0, 2)),
            &XScore::new(),
            &MarkOptions { batch_size: 0, ..Default::default() },
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_ragged_batch_rejected() {
        let batch = PointBatch::Batched(vec![cloud(0.0, 2), cloud(1.0, 3)]);
        let result = mark_cuts(&batch, &XScore::new(), &MarkOptions::default());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_wrong_row_count() {
        let result = mark_cuts(&PointBatch::Single(cloud(0.0, 2)), &DropsRow, &MarkOptions::default());
        assert!(matches!(result, Err(Error::Inference(_))));
    }

    #[test]
    fn test_empty_batch() {
        let scores = mark_cuts(&PointBatch::Batched(Vec::new()), &XScore::new(), &MarkOptions::default()).unwrap();
        assert_eq!(scores, CutScores::Batched(Vec::new()));
    }

    #[cfg(not(feature = "torch"))]
    #[test]
    fn test_load_model_without_torch() {
        assert!(matches!(load_model("model/checkpoint.pt"), Err(Error::Unsupported(_))));
    }
}
