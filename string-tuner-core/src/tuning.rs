//! # Tuning Catalog Module
//!
//! Static registry of instrument tunings, plus the pitch arithmetic shared by
//! the matcher and the tone synthesizer (cents and calibration offsets).
//!
//! ## Features
//! - Sixteen built-in tunings for guitar, bass, ukulele, banjo, mandolin,
//!   violin and cello, kept in declaration order
//! - Lookup by id with an explicit `InvalidTuning` failure
//! - Fallback to the default tuning for configuration suppliers
//! - Valid detection band per tuning (lowest × 0.8, highest × 1.2)

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{Result, TunerError};

/// Id of the tuning used when no (valid) tuning has been selected.
pub const DEFAULT_TUNING_ID: &str = "guitar-standard";

/// Lower edge of the detection band, relative to the lowest note.
pub const BAND_LOW_FACTOR: f32 = 0.8;
/// Upper edge of the detection band, relative to the highest note.
pub const BAND_HIGH_FACTOR: f32 = 1.2;

/// A single string of an instrument with its reference frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningNote {
    /// Note label (e.g., "E2", "F#3")
    pub note: &'static str,
    /// Reference frequency in Hz
    pub freq: f32,
}

/// A named tuning for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tuning {
    pub id: &'static str,
    /// Display name (e.g., "Drop D")
    pub name: &'static str,
    /// Instrument name (e.g., "Guitar")
    pub instrument: &'static str,
    /// Notes in string order. Usually ascending, but re-entrant tunings
    /// (ukulele, banjo) start with a high string.
    pub notes: Vec<TuningNote>,
}

impl Tuning {
    /// The note with the lowest reference frequency.
    pub fn lowest(&self) -> Option<&TuningNote> {
        self.notes
            .iter()
            .min_by(|a, b| a.freq.total_cmp(&b.freq))
    }

    /// The note with the highest reference frequency.
    pub fn highest(&self) -> Option<&TuningNote> {
        self.notes
            .iter()
            .max_by(|a, b| a.freq.total_cmp(&b.freq))
    }

    /// Open interval `(lowest × 0.8, highest × 1.2)` in which pitch estimates
    /// are accepted for this tuning.
    ///
    /// Returns `None` for a tuning without notes.
    pub fn valid_band(&self) -> Option<(f32, f32)> {
        let low = self.lowest()?.freq * BAND_LOW_FACTOR;
        let high = self.highest()?.freq * BAND_HIGH_FACTOR;
        Some((low, high))
    }

    /// Whether `freq` lies strictly inside the valid band.
    pub fn in_band(&self, freq: f32) -> bool {
        match self.valid_band() {
            Some((low, high)) => freq > low && freq < high,
            None => false,
        }
    }
}

macro_rules! notes {
    ($(($note:literal, $freq:literal)),* $(,)?) => {
        vec![$(TuningNote { note: $note, freq: $freq }),*]
    };
}

/// Every built-in tuning, in declaration order.
static TUNINGS: Lazy<Vec<Tuning>> = Lazy::new(|| {
    vec![
        Tuning {
            id: "guitar-standard",
            name: "Standard",
            instrument: "Guitar",
            notes: notes![
                ("E2", 82.41),
                ("A2", 110.0),
                ("D3", 146.83),
                ("G3", 196.0),
                ("B3", 246.94),
                ("E4", 329.63),
            ],
        },
        Tuning {
            id: "guitar-drop-d",
            name: "Drop D",
            instrument: "Guitar",
            notes: notes![
                ("D2", 73.42),
                ("A2", 110.0),
                ("D3", 146.83),
                ("G3", 196.0),
                ("B3", 246.94),
                ("E4", 329.63),
            ],
        },
        Tuning {
            id: "guitar-drop-c",
            name: "Drop C",
            instrument: "Guitar",
            notes: notes![
                ("C2", 65.41),
                ("G2", 98.0),
                ("C3", 130.81),
                ("F3", 174.61),
                ("A3", 220.0),
                ("D4", 293.66),
            ],
        },
        Tuning {
            id: "guitar-open-g",
            name: "Open G",
            instrument: "Guitar",
            notes: notes![
                ("D2", 73.42),
                ("G2", 98.0),
                ("D3", 146.83),
                ("G3", 196.0),
                ("B3", 246.94),
                ("D4", 293.66),
            ],
        },
        Tuning {
            id: "guitar-open-d",
            name: "Open D",
            instrument: "Guitar",
            notes: notes![
                ("D2", 73.42),
                ("A2", 110.0),
                ("D3", 146.83),
                ("F#3", 185.0),
                ("A3", 220.0),
                ("D4", 293.66),
            ],
        },
        Tuning {
            id: "guitar-7",
            name: "7-String",
            instrument: "Guitar",
            notes: notes![
                ("B1", 61.74),
                ("E2", 82.41),
                ("A2", 110.0),
                ("D3", 146.83),
                ("G3", 196.0),
                ("B3", 246.94),
                ("E4", 329.63),
            ],
        },
        Tuning {
            id: "guitar-8",
            name: "8-String",
            instrument: "Guitar",
            notes: notes![
                ("F#1", 46.25),
                ("B1", 61.74),
                ("E2", 82.41),
                ("A2", 110.0),
                ("D3", 146.83),
                ("G3", 196.0),
                ("B3", 246.94),
                ("E4", 329.63),
            ],
        },
        Tuning {
            id: "bass-standard",
            name: "Standard",
            instrument: "Bass",
            notes: notes![("E1", 41.2), ("A1", 55.0), ("D2", 73.42), ("G2", 98.0)],
        },
        Tuning {
            id: "bass-5",
            name: "5-String",
            instrument: "Bass",
            notes: notes![
                ("B0", 30.87),
                ("E1", 41.2),
                ("A1", 55.0),
                ("D2", 73.42),
                ("G2", 98.0),
            ],
        },
        Tuning {
            id: "ukulele-soprano",
            name: "Soprano (GCEA)",
            instrument: "Ukulele",
            notes: notes![("G4", 392.0), ("C4", 261.63), ("E4", 329.63), ("A4", 440.0)],
        },
        Tuning {
            id: "ukulele-concert",
            name: "Concert",
            instrument: "Ukulele",
            notes: notes![("G4", 392.0), ("C4", 261.63), ("E4", 329.63), ("A4", 440.0)],
        },
        Tuning {
            id: "ukulele-baritone",
            name: "Baritone (DGBE)",
            instrument: "Ukulele",
            notes: notes![("D3", 146.83), ("G3", 196.0), ("B3", 246.94), ("E4", 329.63)],
        },
        Tuning {
            id: "banjo-5",
            name: "5-String (G)",
            instrument: "Banjo",
            notes: notes![
                ("G4", 392.0),
                ("D3", 146.83),
                ("G3", 196.0),
                ("B3", 246.94),
                ("D4", 293.66),
            ],
        },
        Tuning {
            id: "mandolin",
            name: "Standard",
            instrument: "Mandolin",
            notes: notes![("G3", 196.0), ("D4", 293.66), ("A4", 440.0), ("E5", 659.25)],
        },
        Tuning {
            id: "violin",
            name: "Standard",
            instrument: "Violin",
            notes: notes![("G3", 196.0), ("D4", 293.66), ("A4", 440.0), ("E5", 659.25)],
        },
        Tuning {
            id: "cello",
            name: "Standard",
            instrument: "Cello",
            notes: notes![("C2", 65.41), ("G2", 98.0), ("D3", 146.83), ("A3", 220.0)],
        },
    ]
});

/// Looks up a tuning by id.
///
/// # Returns
/// * `Ok(tuning)` - The catalog entry
/// * `Err(TunerError::InvalidTuning)` - No tuning with that id exists
pub fn get(id: &str) -> Result<&'static Tuning> {
    TUNINGS
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| TunerError::InvalidTuning { id: id.to_string() })
}

/// Looks up a tuning by id, falling back to [`DEFAULT_TUNING_ID`] on a miss.
pub fn get_or_default(id: &str) -> &'static Tuning {
    match get(id) {
        Ok(tuning) => tuning,
        Err(e) => {
            log::warn!("{}, falling back to {:?}", e, DEFAULT_TUNING_ID);
            default_tuning()
        }
    }
}

/// The tuning selected when nothing else has been configured.
pub fn default_tuning() -> &'static Tuning {
    // The default id is part of the static table above.
    &TUNINGS[0]
}

/// All tuning ids in declaration order.
pub fn list_ids() -> Vec<&'static str> {
    TUNINGS.iter().map(|t| t.id).collect()
}

/// All tunings in declaration order.
pub fn all() -> &'static [Tuning] {
    &TUNINGS
}

/// Shifts a frequency by a calibration offset in cents.
///
/// `adjusted = freq × 2^(cents / 1200)`; 1200 cents is one octave.
pub fn adjusted_frequency(freq: f32, cents: f32) -> f32 {
    freq * 2.0_f32.powf(cents / 1200.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values indicate sharpness, negative values flatness.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_keep_declaration_order() {
        let ids = list_ids();
        assert_eq!(ids.len(), 16);
        assert_eq!(ids[0], "guitar-standard");
        assert_eq!(ids[1], "guitar-drop-d");
        assert_eq!(ids[15], "cello");
    }

    #[test]
    fn default_tuning_matches_default_id() {
        assert_eq!(default_tuning().id, DEFAULT_TUNING_ID);
    }

    #[test]
    fn every_tuning_has_notes_and_unique_id() {
        let ids = list_ids();
        for tuning in all() {
            assert!(!tuning.notes.is_empty(), "{} has no notes", tuning.id);
            assert!(tuning.notes.iter().all(|n| n.freq > 0.0));
            assert_eq!(ids.iter().filter(|id| **id == tuning.id).count(), 1);
        }
    }

    #[test]
    fn unknown_id_is_invalid_tuning() {
        assert_eq!(
            get("theremin"),
            Err(TunerError::InvalidTuning {
                id: "theremin".to_string()
            })
        );
        assert_eq!(get_or_default("theremin").id, DEFAULT_TUNING_ID);
        assert_eq!(get_or_default("cello").id, "cello");
    }

    #[test]
    fn band_uses_extreme_notes() {
        let (low, high) = get("guitar-standard").unwrap().valid_band().unwrap();
        assert!((low - 82.41 * 0.8).abs() < 1e-4);
        assert!((high - 329.63 * 1.2).abs() < 1e-3);
    }

    #[test]
    fn band_of_reentrant_tuning_uses_true_extremes() {
        let uke = get("ukulele-soprano").unwrap();
        assert_eq!(uke.lowest().unwrap().note, "C4");
        assert_eq!(uke.highest().unwrap().note, "A4");
        assert!(uke.in_band(261.63));
        assert!(!uke.in_band(200.0));
    }

    #[test]
    fn band_edges_are_exclusive() {
        let tuning = Tuning {
            id: "test",
            name: "Test",
            instrument: "Test",
            notes: notes![("A", 125.0), ("B", 250.0)],
        };
        assert_eq!(tuning.valid_band(), Some((100.0, 300.0)));
        assert!(!tuning.in_band(100.0));
        assert!(!tuning.in_band(300.0));
        assert!(tuning.in_band(100.5));
        assert!(tuning.in_band(299.5));
    }

    #[test]
    fn calibration_zero_is_identity_and_1200_is_an_octave() {
        assert_eq!(adjusted_frequency(440.0, 0.0), 440.0);
        assert_eq!(adjusted_frequency(440.0, 1200.0), 880.0);
        assert!((adjusted_frequency(440.0, -1200.0) - 220.0).abs() < 1e-4);
    }

    #[test]
    fn cents_deviation_sign() {
        assert!(calculate_cents_deviation(442.0, 440.0) > 0.0);
        assert!(calculate_cents_deviation(438.0, 440.0) < 0.0);
        assert!((calculate_cents_deviation(880.0, 440.0) - 1200.0).abs() < 1e-3);
    }
}
