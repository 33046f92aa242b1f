//! # Waveform Preview Module
//!
//! Decimates a raw frame to a small fixed number of points for display.
//! The preview is never used by detection.

/// Number of points in a waveform preview.
pub const PREVIEW_POINTS: usize = 100;

/// Picks `PREVIEW_POINTS` evenly spaced samples from a frame.
///
/// Point `i` is `signal[floor(i × N / PREVIEW_POINTS)]`. Frames shorter than
/// the preview repeat samples; an empty frame gives an all-zero preview.
pub fn preview(signal: &[f32]) -> Vec<f32> {
    decimate(signal, PREVIEW_POINTS)
}

/// Picks `points` evenly spaced samples from a signal.
pub fn decimate(signal: &[f32], points: usize) -> Vec<f32> {
    let len = signal.len();
    (0..points)
        .map(|i| signal.get(i * len / points).copied().unwrap_or(0.0))
        .collect()
}

/// Maps a preview to polyline coordinates in a 100 × 100 box, with silence on
/// the horizontal centre line.
pub fn to_points(preview: &[f32]) -> Vec<(f32, f32)> {
    let span = (preview.len().saturating_sub(1)).max(1) as f32;
    preview
        .iter()
        .enumerate()
        .map(|(i, &value)| (i as f32 / span * 100.0, 50.0 + value * 40.0))
        .collect()
}
