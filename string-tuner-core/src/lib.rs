// string-tuner-core/src/lib.rs

//! The core logic for the string instrument tuner.
//! This crate is responsible for pitch detection, note matching against
//! instrument tunings, and reference-tone synthesis. It is completely
//! headless and contains no GUI code.

#[cfg(feature = "device")]
pub mod audio;
pub mod error;
pub mod matcher;
#[cfg(feature = "device")]
pub mod output;
pub mod pitch;
pub mod session;
pub mod settings;
pub mod synth;
pub mod tuning;
pub mod waveform;

pub use error::TunerError;
pub use matcher::{Classification, MatchResult};
pub use pitch::SampleFrame;
pub use settings::TunerSettings;
pub use synth::{ToneEnvelope, ToneRequest};
pub use tuning::{Tuning, TuningNote};

/// Represents the result of analyzing a single audio frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    /// The in-band detected frequency in Hz, `None` when the frame had no signal.
    pub detected_frequency: Option<f32>,
    /// The nearest note of the active tuning and the deviation from it.
    pub matched: Option<MatchResult>,
    /// Down-sampled waveform for visualization.
    pub waveform: Vec<f32>,
}
