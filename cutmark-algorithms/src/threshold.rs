//! Binary thresholding of cut scores

/// Binarize scores: values below `cutoff` become 0, everything else becomes 1.
///
/// NaN never compares below the cutoff and therefore maps to 1.
pub fn threshold_scores(scores: &[f32], cutoff: f32) -> Vec<f32> {
    scores.iter().map(|&s| binarize(s, cutoff)).collect()
}

/// In-place variant of [`threshold_scores`].
pub fn threshold_in_place(scores: &mut [f32], cutoff: f32) {
    for s in scores.iter_mut() {
        *s = binarize(*s, cutoff);
    }
}

#[inline]
fn binarize(score: f32, cutoff: f32) -> f32 {
    if score < cutoff {
        0.0
    } else {
        1.0
    }
}
