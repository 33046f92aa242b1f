//! # Pitch Detection Module
//!
//! Estimates the fundamental frequency of a frame of time-domain samples by
//! counting zero crossings. The estimator is cheap and has no latency beyond
//! the frame itself, which suits monophonic, harmonically simple input such
//! as a single plucked string.
//!
//! ## Limitations
//! Zero-crossing counting is biased by harmonic content and noise: a strong
//! second harmonic or broadband hiss adds crossings and pulls the estimate
//! upwards. The only protection is the tuning's valid band, which discards
//! estimates outside the selected instrument's range. The detector is not an
//! accuracy target; its resolution is `sample_rate / (2 × N)` Hz.
//!
//! Crossings are counted in both directions, not only upward. Counting only
//! upward crossings with the same formula would report half the frequency.

use crate::tuning::Tuning;

/// A frame of captured audio, owned by the caller for one detection call.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFrame {
    /// Mono samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    /// Sample rate at capture time in Hz
    pub sample_rate: u32,
}

impl SampleFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Runs [`detect_pitch`] on this frame.
    pub fn detect(&self, tuning: &Tuning) -> Option<f32> {
        detect_pitch(&self.samples, self.sample_rate, tuning)
    }
}

/// Counts the zero crossings of a signal.
///
/// An upward crossing is counted at index `i` (1 ≤ i < N) when
/// `signal[i-1] < 0` and `signal[i] >= 0`; a downward crossing when
/// `signal[i-1] >= 0` and `signal[i] < 0`. A periodic signal contributes two
/// crossings per period.
pub fn count_zero_crossings(signal: &[f32]) -> usize {
    signal
        .windows(2)
        .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
        .count()
}

/// Estimates the dominant frequency of a signal without any band check.
///
/// `frequency = crossings × sample_rate / (2 × N)`.
///
/// # Returns
/// * `Some(frequency)` - A positive estimate in Hz, full precision
/// * `None` - Degenerate frame (N < 2), zero sample rate, or no crossings
pub fn estimate_frequency(signal: &[f32], sample_rate: u32) -> Option<f32> {
    let frame_size = signal.len();
    if frame_size < 2 || sample_rate == 0 {
        return None;
    }

    let crossings = count_zero_crossings(signal);
    let frequency = (crossings as f32 * sample_rate as f32) / (2.0 * frame_size as f32);

    if frequency.is_finite() && frequency > 0.0 {
        Some(frequency)
    } else {
        None
    }
}

/// Detects the pitch of a frame for the active tuning.
///
/// The estimate is accepted only when it falls strictly inside the tuning's
/// valid band `(lowest × 0.8, highest × 1.2)`. Everything else (silence,
/// DC offset, out-of-instrument artifacts, degenerate frames) is reported
/// as "no signal". The detector keeps no state between calls.
///
/// # Arguments
/// * `signal` - Input audio frame
/// * `sample_rate` - Sample rate in Hz
/// * `tuning` - Active tuning, which scopes the accepted range
///
/// # Returns
/// * `Some(frequency)` - In-band estimate in Hz
/// * `None` - No signal for this frame
pub fn detect_pitch(signal: &[f32], sample_rate: u32, tuning: &Tuning) -> Option<f32> {
    let frequency = estimate_frequency(signal, sample_rate)?;

    if tuning.in_band(frequency) {
        Some(frequency)
    } else {
        log::trace!(
            "estimate {:.2} Hz outside band of {:?}",
            frequency,
            tuning.id
        );
        None
    }
}

/// Rounds an estimate to whole Hz for presentation.
pub fn rounded_hz(frequency: f32) -> u32 {
    frequency.round().max(0.0) as u32
}
