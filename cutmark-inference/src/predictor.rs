use cutmark_core::{Point3f, Result};

/// Anything that turns a batch of clouds into per point cut scores.
///
/// `predict` receives `B` clouds and must return `B` rows, row `i` holding one
/// raw score per point of cloud `i`.
pub trait CutPredictor {
    fn predict(&self, batch: &[&[Point3f]]) -> Result<Vec<Vec<f32>>>;
}

impl<P: CutPredictor + ?Sized> CutPredictor for Box<P> {
    fn predict(&self, batch: &[&[Point3f]]) -> Result<Vec<Vec<f32>>> {
        (**self).predict(batch)
    }
}

impl<P: CutPredictor + ?Sized> CutPredictor for &P {
    fn predict(&self, batch: &[&[Point3f]]) -> Result<Vec<Vec<f32>>> {
        (**self).predict(batch)
    }
}
