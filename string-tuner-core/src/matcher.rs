//! # Note Matcher Module
//!
//! Finds the tuning note closest to a measured frequency and reports how far
//! off it is, as a percentage of the reference frequency and in cents.

use serde::Serialize;

use crate::error::{Result, TunerError};
use crate::tuning::{self, Tuning, TuningNote};

/// |deviation| below this percentage counts as in tune.
pub const IN_TUNE_PERCENT: f32 = 5.0;

/// Whether a string needs to go up, down, or nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    InTune,
    /// Measured pitch is above the reference ("too high").
    Sharp,
    /// Measured pitch is below the reference ("too low").
    Flat,
}

impl Classification {
    /// Classifies a signed percentage deviation.
    pub fn from_percent(deviation_percent: f32) -> Self {
        if deviation_percent.abs() < IN_TUNE_PERCENT {
            Classification::InTune
        } else if deviation_percent > 0.0 {
            Classification::Sharp
        } else {
            Classification::Flat
        }
    }

    /// Short status line for a display sink.
    pub fn label(self) -> &'static str {
        match self {
            Classification::InTune => "In tune!",
            Classification::Sharp => "Too high",
            Classification::Flat => "Too low",
        }
    }
}

/// The nearest note to a measured frequency and the deviation from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched_note: TuningNote,
    /// The frequency that was matched, in Hz
    pub measured_freq: f32,
    /// `100 × (measured − reference) / reference`
    pub deviation_percent: f32,
    /// `1200 × log2(measured / reference)`
    pub deviation_cents: f32,
}

impl MatchResult {
    pub fn classification(&self) -> Classification {
        Classification::from_percent(self.deviation_percent)
    }

    pub fn is_in_tune(&self) -> bool {
        self.classification() == Classification::InTune
    }

    /// Position of a deviation indicator, in percent of the meter's
    /// half-width: `2 × deviation`, clamped to ±50.
    pub fn meter_offset(&self) -> f32 {
        (self.deviation_percent * 2.0).clamp(-50.0, 50.0)
    }
}

/// Finds the note of `tuning` nearest to `freq`.
///
/// The scan runs in list order and only replaces the current best on a
/// strictly smaller distance, so the earlier note wins a tie.
///
/// # Returns
/// * `Ok(MatchResult)` - The nearest note and the signed deviation
/// * `Err(TunerError::InvalidArgument)` - `freq` is not a positive finite number
/// * `Err(TunerError::EmptyTuning)` - The tuning has no notes
pub fn match_note(freq: f32, tuning: &Tuning) -> Result<MatchResult> {
    if !freq.is_finite() || freq <= 0.0 {
        return Err(TunerError::invalid(
            "frequency",
            freq,
            "must be a positive finite number",
        ));
    }

    let mut notes = tuning.notes.iter();
    let mut closest = notes.next().ok_or_else(|| TunerError::EmptyTuning {
        id: tuning.id.to_string(),
    })?;
    let mut min_diff = (freq - closest.freq).abs();

    for note in notes {
        let diff = (freq - note.freq).abs();
        if diff < min_diff {
            closest = note;
            min_diff = diff;
        }
    }

    Ok(MatchResult {
        matched_note: closest.clone(),
        measured_freq: freq,
        deviation_percent: 100.0 * (freq - closest.freq) / closest.freq,
        deviation_cents: tuning::calculate_cents_deviation(freq, closest.freq),
    })
}
