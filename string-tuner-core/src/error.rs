//! # Error Module
//!
//! Configuration-level failures surfaced to the caller. A frame without an
//! in-band estimate is not an error: the detector reports it as `None`.

use snafu::Snafu;

/// Failures returned by catalog lookups, the note matcher, the tone
/// synthesizer and settings validation.
#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum TunerError {
    /// The requested tuning id is not in the catalog.
    #[snafu(display("Unknown tuning id {:?}", id))]
    InvalidTuning { id: String },

    /// A tuning with no notes was handed to the matcher.
    #[snafu(display("Tuning {:?} has no notes", id))]
    EmptyTuning { id: String },

    /// A numeric argument was rejected without being applied.
    #[snafu(display("Invalid {}: {} ({})", name, value, reason))]
    InvalidArgument {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },
}

impl TunerError {
    pub(crate) fn invalid(name: &'static str, value: f32, reason: &'static str) -> Self {
        TunerError::InvalidArgument {
            name,
            value,
            reason,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = TunerError> = std::result::Result<T, E>;
