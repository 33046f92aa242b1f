//! # Settings Module
//!
//! Configuration handed to the detector, matcher and synthesizer by the
//! settings layer: active tuning, reference-tone volume and duration, and the
//! calibration offset. Settings are passed explicitly into each call; the core
//! keeps no global configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::TunerError;
use crate::synth::ToneRequest;
use crate::tuning::{self, Tuning, DEFAULT_TUNING_ID};

pub const DEFAULT_REF_TONE_VOLUME: f32 = 0.5;
pub const DEFAULT_REF_TONE_DURATION: f32 = 1.5;

/// User-facing tuner configuration.
///
/// Missing fields in a JSON document fall back to their defaults one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TunerSettings {
    pub tuning_id: String,
    /// Reference-tone volume in `[0, 1]`
    pub ref_tone_volume: f32,
    /// Reference-tone duration in seconds
    pub ref_tone_duration: f32,
    /// Calibration offset in cents
    pub calibration_cents: f32,
}

impl Default for TunerSettings {
    fn default() -> Self {
        Self {
            tuning_id: DEFAULT_TUNING_ID.to_string(),
            ref_tone_volume: DEFAULT_REF_TONE_VOLUME,
            ref_tone_duration: DEFAULT_REF_TONE_DURATION,
            calibration_cents: 0.0,
        }
    }
}

impl TunerSettings {
    /// Parses settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse tuner settings")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize tuner settings")
    }

    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = Self::from_json(&data)?;
        log::info!("Loaded tuner settings from {}", path.display());
        Ok(settings)
    }

    /// Loads settings from a JSON file, using the defaults if the file is
    /// missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{:#}, using default settings", e);
                Self::default()
            }
        }
    }

    /// Checks every value without changing any of them.
    pub fn validate(&self) -> Result<(), TunerError> {
        tuning::get(&self.tuning_id)?;
        // Any positive target frequency works; only the shared tone
        // parameters are being checked.
        self.tone_request(1.0).validate()
    }

    /// The selected tuning.
    ///
    /// # Returns
    /// * `Err(TunerError::InvalidTuning)` - The id is not in the catalog
    pub fn tuning(&self) -> Result<&'static Tuning, TunerError> {
        tuning::get(&self.tuning_id)
    }

    /// The selected tuning, or the default tuning if the id is unknown.
    pub fn resolve_tuning(&self) -> &'static Tuning {
        tuning::get_or_default(&self.tuning_id)
    }

    /// Builds a reference-tone request for `target_freq` from these settings.
    pub fn tone_request(&self, target_freq: f32) -> ToneRequest {
        ToneRequest::new(
            target_freq,
            self.ref_tone_volume,
            self.ref_tone_duration,
            self.calibration_cents,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = TunerSettings::default();
        assert_eq!(settings.tuning_id, "guitar-standard");
        assert_eq!(settings.ref_tone_volume, 0.5);
        assert_eq!(settings.ref_tone_duration, 1.5);
        assert_eq!(settings.calibration_cents, 0.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_individually() {
        let settings = TunerSettings::from_json(r#"{"tuningId":"cello","calibrationCents":-12}"#).unwrap();
        assert_eq!(settings.tuning_id, "cello");
        assert_eq!(settings.calibration_cents, -12.0);
        assert_eq!(settings.ref_tone_volume, DEFAULT_REF_TONE_VOLUME);
        assert_eq!(settings.ref_tone_duration, DEFAULT_REF_TONE_DURATION);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(TunerSettings::from_json("{not json").is_err());
        assert!(TunerSettings::from_json(r#"{"refToneVolume":"loud"}"#).is_err());
    }

    #[test]
    fn json_round_trip_uses_camel_case() {
        let json = TunerSettings::default().to_json().unwrap();
        assert!(json.contains("\"refToneDuration\""));
        assert_eq!(TunerSettings::from_json(&json).unwrap(), TunerSettings::default());
    }

    #[test]
    fn unknown_tuning_reports_and_falls_back() {
        let settings = TunerSettings {
            tuning_id: "sitar".to_string(),
            ..TunerSettings::default()
        };
        assert_eq!(
            settings.tuning(),
            Err(TunerError::InvalidTuning {
                id: "sitar".to_string()
            })
        );
        assert_eq!(settings.resolve_tuning().id, DEFAULT_TUNING_ID);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let loud = TunerSettings {
            ref_tone_volume: 1.5,
            ..TunerSettings::default()
        };
        let instant = TunerSettings {
            ref_tone_duration: 0.0,
            ..TunerSettings::default()
        };
        let endless = TunerSettings {
            ref_tone_duration: 1.0e30,
            ..TunerSettings::default()
        };
        let absurd = TunerSettings {
            calibration_cents: f32::INFINITY,
            ..TunerSettings::default()
        };
        for settings in [loud, instant, endless, absurd] {
            assert!(matches!(
                settings.validate(),
                Err(TunerError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn tone_request_carries_settings() {
        let settings = TunerSettings {
            calibration_cents: 10.0,
            ..TunerSettings::default()
        };
        let request = settings.tone_request(110.0);
        assert_eq!(request, ToneRequest::new(110.0, 0.5, 1.5, 10.0));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let settings = TunerSettings::load_or_default("/nonexistent/tuner-settings.json");
        assert_eq!(settings, TunerSettings::default());
    }
}
