//! The `jet` colormap
//!
//! Piecewise linear anchors per channel, sampled into a 256 entry table exactly
//! like a matplotlib `LinearSegmentedColormap`.

/// Number of entries in the lookup table
pub const JET_LUT_SIZE: usize = 256;

const RED: &[(f32, f32)] = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const GREEN: &[(f32, f32)] = &[
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const BLUE: &[(f32, f32)] = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

fn interpolate(anchors: &[(f32, f32)], x: f32) -> f32 {
    for pair in anchors.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 0.0 };
            return y0 + t * (y1 - y0);
        }
    }
    anchors.last().map_or(0.0, |&(_, y)| y)
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Color of lookup table entry `index`
pub fn jet_entry(index: usize) -> [u8; 3] {
    let x = index.min(JET_LUT_SIZE - 1) as f32 / (JET_LUT_SIZE - 1) as f32;
    [
        to_byte(interpolate(RED, x)),
        to_byte(interpolate(GREEN, x)),
        to_byte(interpolate(BLUE, x)),
    ]
}

/// The full lookup table
pub fn jet_lut() -> Vec<[u8; 3]> {
    (0..JET_LUT_SIZE).map(jet_entry).collect()
}

/// Lookup table slot for `value`: clipped to `[0, 1]`, NaN at the low end
pub fn jet_index(value: f32) -> usize {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    ((value * JET_LUT_SIZE as f32) as usize).min(JET_LUT_SIZE - 1)
}

/// Map `value` in `[0, 1]` to a jet color.
///
/// Values outside the range are clipped; NaN maps to the low end.
pub fn jet(value: f32) -> [u8; 3] {
    jet_entry(jet_index(value))
}

/// Rescale scores to `[0, 1]` so the full colormap is used; a constant input maps to 0.
pub fn rescale_scores(scores: &[f32]) -> Vec<f32> {
    let (min, max) = scores
        .iter()
        .filter(|s| s.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let span = max - min;
    scores
        .iter()
        .map(|&s| if span > 0.0 { (s - min) / span } else { 0.0 })
        .collect()
}
