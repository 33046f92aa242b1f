//! # Tone Synthesizer Module
//!
//! Builds the envelope of a reference tone: a pure sine at the calibrated
//! target frequency with a short linear attack, a gentle linear sag and an
//! exponential decay towards a small floor. The envelope is a plain value;
//! an audio-output collaborator either schedules its breakpoints directly or
//! discretizes it with a [`ToneVoice`].
//!
//! Every request yields an independent envelope. Overlapping tones are not
//! suppressed, so a new reference note can be started while the previous one
//! is still decaying.

use std::f32::consts::PI;

use serde::Serialize;

use crate::error::{Result, TunerError};
use crate::tuning;

/// Length of the attack ramp in seconds.
pub const ATTACK_SECONDS: f32 = 0.05;
/// Gain reached at the end of the attack, relative to the volume.
pub const ATTACK_LEVEL: f32 = 0.3;
/// Gain reached at the end of the sustain ramp, relative to the volume.
pub const SUSTAIN_LEVEL: f32 = 0.25;
/// Fraction of the duration after which the exponential decay begins.
pub const SUSTAIN_FRACTION: f32 = 0.3;
/// Level the decay approaches at the stop time. Exponential ramps cannot
/// target zero.
pub const DECAY_FLOOR: f32 = 0.001;
/// Calibration offsets beyond one octave either way are rejected.
pub const MAX_CALIBRATION_CENTS: f32 = 1200.0;
/// Longest tone a request may ask for. Voices are discretized up front, so
/// the bound keeps the sample count representable.
pub const MAX_DURATION_SECONDS: f32 = 60.0;

/// Parameters of one reference tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRequest {
    /// Uncalibrated target frequency in Hz
    pub target_freq: f32,
    /// Gain scale in `[0, 1]`
    pub volume: f32,
    pub duration_seconds: f32,
    /// Calibration offset in cents
    pub calibration_cents: f32,
}

impl ToneRequest {
    pub fn new(target_freq: f32, volume: f32, duration_seconds: f32, calibration_cents: f32) -> Self {
        Self {
            target_freq,
            volume,
            duration_seconds,
            calibration_cents,
        }
    }

    /// Rejects the request if any parameter is out of range. Nothing is
    /// clamped.
    pub fn validate(&self) -> Result<()> {
        if !self.target_freq.is_finite() || self.target_freq <= 0.0 {
            return Err(TunerError::invalid(
                "target frequency",
                self.target_freq,
                "must be a positive finite number",
            ));
        }
        if !(self.duration_seconds > 0.0 && self.duration_seconds <= MAX_DURATION_SECONDS) {
            return Err(TunerError::invalid(
                "duration",
                self.duration_seconds,
                "must be positive and at most 60 seconds",
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(TunerError::invalid(
                "volume",
                self.volume,
                "must lie in [0, 1]",
            ));
        }
        validate_calibration(self.calibration_cents)
    }
}

/// Rejects non-finite calibration offsets and offsets beyond one octave.
pub fn validate_calibration(cents: f32) -> Result<()> {
    if !cents.is_finite() || cents.abs() > MAX_CALIBRATION_CENTS {
        return Err(TunerError::invalid(
            "calibration",
            cents,
            "must be finite and within ±1200 cents",
        ));
    }
    Ok(())
}

/// How the gain travels from the previous breakpoint to this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Ramp {
    /// Jump to the value at the breakpoint time.
    Set,
    Linear,
    Exponential,
}

/// A scheduled gain value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GainBreakpoint {
    /// Seconds after the tone starts
    pub time: f32,
    pub gain: f32,
    pub ramp: Ramp,
}

/// Complete description of one reference tone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToneEnvelope {
    /// Sine frequency after calibration, in Hz
    pub played_freq: f32,
    /// Time-ordered gain breakpoints, starting at `t = 0`
    pub breakpoints: Vec<GainBreakpoint>,
    duration: f32,
}

/// Builds the envelope for a tone request.
///
/// The breakpoints are:
/// 1. `0` at `t = 0`
/// 2. linear to `0.3 × volume` at `t = 0.05 s`
/// 3. linear to `0.25 × volume` at `t = 0.3 × duration`
/// 4. exponential to `0.001` at `t = duration`, where the oscillator stops
///
/// For durations short enough that these times would run backwards, each
/// breakpoint time is clamped between its predecessor and the duration.
///
/// # Returns
/// * `Ok(ToneEnvelope)` - The envelope
/// * `Err(TunerError::InvalidArgument)` - The request failed validation
pub fn synthesize(request: &ToneRequest) -> Result<ToneEnvelope> {
    request.validate()?;

    let duration = request.duration_seconds;
    let volume = request.volume;
    let attack_end = ATTACK_SECONDS.min(duration);
    let sustain_end = (duration * SUSTAIN_FRACTION).clamp(attack_end, duration);

    let envelope = ToneEnvelope {
        played_freq: tuning::adjusted_frequency(request.target_freq, request.calibration_cents),
        breakpoints: vec![
            GainBreakpoint {
                time: 0.0,
                gain: 0.0,
                ramp: Ramp::Set,
            },
            GainBreakpoint {
                time: attack_end,
                gain: volume * ATTACK_LEVEL,
                ramp: Ramp::Linear,
            },
            GainBreakpoint {
                time: sustain_end,
                gain: volume * SUSTAIN_LEVEL,
                ramp: Ramp::Linear,
            },
            GainBreakpoint {
                time: duration,
                gain: DECAY_FLOOR,
                ramp: Ramp::Exponential,
            },
        ],
        duration,
    };

    log::debug!(
        "reference tone {:.2} Hz (target {:.2} Hz, {:+.1} cents) for {:.2} s",
        envelope.played_freq,
        request.target_freq,
        request.calibration_cents,
        duration
    );

    Ok(envelope)
}

impl ToneEnvelope {
    /// Time at which the oscillator starts, in seconds.
    pub fn start(&self) -> f32 {
        0.0
    }

    /// Time at which the oscillator is silenced, in seconds.
    pub fn stop(&self) -> f32 {
        self.duration
    }

    /// Gain at `t` seconds after the start. Zero outside `[start, stop]`.
    pub fn gain_at(&self, t: f32) -> f32 {
        if t < self.start() || t > self.stop() {
            return 0.0;
        }

        let Some(index) = self.breakpoints.iter().position(|bp| bp.time >= t) else {
            return 0.0;
        };
        if index == 0 {
            return self.breakpoints[0].gain;
        }

        let prev = self.breakpoints[index - 1];
        let next = self.breakpoints[index];

        match next.ramp {
            // An exponential ramp starting from silence stays silent.
            Ramp::Exponential if prev.gain <= 0.0 => prev.gain,
            _ if t >= next.time => next.gain,
            Ramp::Set => prev.gain,
            Ramp::Linear => {
                let frac = (t - prev.time) / (next.time - prev.time);
                prev.gain + (next.gain - prev.gain) * frac
            }
            Ramp::Exponential => {
                let frac = (t - prev.time) / (next.time - prev.time);
                prev.gain * (next.gain / prev.gain).powf(frac)
            }
        }
    }

    /// Creates a voice that renders this envelope at `sample_rate`.
    pub fn voice(&self, sample_rate: u32) -> ToneVoice {
        ToneVoice::new(self.clone(), sample_rate)
    }

    /// Renders the whole tone into a buffer.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        self.voice(sample_rate).collect()
    }
}

/// Discretized playback of one [`ToneEnvelope`].
///
/// The sine phase is continuous from the first sample; the voice ends at the
/// envelope's stop time.
#[derive(Debug, Clone)]
pub struct ToneVoice {
    envelope: ToneEnvelope,
    sample_rate: f32,
    total_samples: usize,
    position: usize,
    phase: f32,
    phase_increment: f32,
}

impl ToneVoice {
    pub fn new(envelope: ToneEnvelope, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f32;
        let total_samples = (envelope.stop() * sample_rate).ceil() as usize;
        let phase_increment = if sample_rate > 0.0 {
            2.0 * PI * envelope.played_freq / sample_rate
        } else {
            0.0
        };
        Self {
            envelope,
            sample_rate,
            total_samples,
            position: 0,
            phase: 0.0,
            phase_increment,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }

    /// Number of samples left before the stop time.
    pub fn remaining(&self) -> usize {
        self.total_samples.saturating_sub(self.position)
    }
}

impl Iterator for ToneVoice {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.is_finished() {
            return None;
        }

        let t = self.position as f32 / self.sample_rate;
        let sample = self.phase.sin() * self.envelope.gain_at(t);

        self.position += 1;
        self.phase += self.phase_increment;
        if self.phase >= 2.0 * PI {
            self.phase -= 2.0 * PI;
        }

        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

/// Adds the next samples of every voice into `out` and drops voices that
/// have finished. Voices do not interact.
pub fn mix(voices: &mut Vec<ToneVoice>, out: &mut [f32]) {
    for slot in out.iter_mut() {
        *slot = voices.iter_mut().filter_map(|voice| voice.next()).sum();
    }
    voices.retain(|voice| !voice.is_finished());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_tone() -> ToneEnvelope {
        synthesize(&ToneRequest::new(440.0, 0.5, 1.5, 0.0)).unwrap()
    }

    #[test]
    fn envelope_levels_at_key_times() {
        let envelope = reference_tone();
        assert_eq!(envelope.gain_at(0.0), 0.0);
        assert!((envelope.gain_at(0.05) - 0.15).abs() < 1e-6);
        assert!((envelope.gain_at(0.45) - 0.125).abs() < 1e-6);
        assert!(envelope.gain_at(1.5) <= 0.001);
        assert_eq!(envelope.gain_at(1.6), 0.0);
    }

    #[test]
    fn envelope_shape_between_breakpoints() {
        let envelope = reference_tone();
        assert!((envelope.gain_at(0.025) - 0.075).abs() < 1e-6);
        // Sustain sags linearly from 0.15 to 0.125.
        let mid = envelope.gain_at(0.25);
        assert!(mid < 0.15 && mid > 0.125);
        // Decay is monotonic and stays above the floor until the stop time.
        let mut last = envelope.gain_at(0.45);
        for step in 1..100 {
            let g = envelope.gain_at(0.45 + step as f32 * 0.0105);
            assert!(g <= last && g > DECAY_FLOOR * 0.999);
            last = g;
        }
    }

    #[test]
    fn breakpoints_are_time_ordered() {
        let envelope = reference_tone();
        let times: Vec<f32> = envelope.breakpoints.iter().map(|bp| bp.time).collect();
        for (time, want) in times.iter().zip([0.0, 0.05, 0.45, 1.5]) {
            assert!((time - want).abs() < 1e-6, "{:?}", times);
        }
        assert_eq!(envelope.breakpoints[3].ramp, Ramp::Exponential);
        assert_eq!(envelope.stop(), 1.5);

        let short = synthesize(&ToneRequest::new(440.0, 1.0, 0.04, 0.0)).unwrap();
        assert!(short.breakpoints.windows(2).all(|w| w[0].time <= w[1].time));
        assert_eq!(short.breakpoints[1].time, 0.04);
    }

    #[test]
    fn calibration_shifts_played_frequency() {
        let request = ToneRequest::new(440.0, 0.5, 1.0, 1200.0);
        assert_eq!(synthesize(&request).unwrap().played_freq, 880.0);
        assert_eq!(reference_tone().played_freq, 440.0);
    }

    #[test]
    fn invalid_requests_are_rejected_not_clamped() {
        for request in [
            ToneRequest::new(440.0, 0.5, 0.0, 0.0),
            ToneRequest::new(440.0, -0.1, 1.5, 0.0),
            ToneRequest::new(440.0, 1.1, 1.5, 0.0),
            ToneRequest::new(0.0, 0.5, 1.5, 0.0),
            ToneRequest::new(-110.0, 0.5, 1.5, 0.0),
            ToneRequest::new(440.0, 0.5, f32::INFINITY, 0.0),
            ToneRequest::new(440.0, 0.5, 1.5, f32::NAN),
            ToneRequest::new(440.0, 0.5, 1.5, 5000.0),
        ] {
            assert!(
                matches!(synthesize(&request), Err(TunerError::InvalidArgument { .. })),
                "{:?} should be rejected",
                request
            );
        }
    }

    #[test]
    fn huge_durations_are_rejected_before_rendering() {
        for duration in [1.0e30, MAX_DURATION_SECONDS + 0.5, f32::MAX, f32::NAN] {
            let request = ToneRequest::new(440.0, 0.5, duration, 0.0);
            assert!(
                matches!(synthesize(&request), Err(TunerError::InvalidArgument { .. })),
                "duration {} should be rejected",
                duration
            );
        }

        let longest = synthesize(&ToneRequest::new(440.0, 0.5, MAX_DURATION_SECONDS, 0.0)).unwrap();
        let voice = longest.voice(48000);
        assert_eq!(voice.remaining(), 60 * 48000);
    }

    #[test]
    fn mix_fills_caller_buffer_in_place() {
        let mut voices = Vec::with_capacity(4);
        voices.push(reference_tone().voice(44100));
        voices.push(reference_tone().voice(44100));
        let mut out = vec![0.0f32; 256];

        mix(&mut voices, &mut out);
        assert_eq!(out.len(), 256);
        assert_eq!(voices.capacity(), 4);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn silent_volume_stays_silent() {
        let envelope = synthesize(&ToneRequest::new(440.0, 0.0, 1.0, 0.0)).unwrap();
        assert_eq!(envelope.gain_at(0.5), 0.0);
        assert_eq!(envelope.gain_at(1.0), 0.0);
    }

    #[test]
    fn voice_renders_until_stop_time() {
        let envelope = reference_tone();
        let samples = envelope.render(8000);
        assert_eq!(samples.len(), 12000);
        assert_eq!(samples[0], 0.0);
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.14 && peak <= 0.15 + 1e-6);
    }

    #[test]
    fn overlapping_voices_are_independent() {
        let a = synthesize(&ToneRequest::new(440.0, 0.5, 0.01, 0.0)).unwrap();
        let b = synthesize(&ToneRequest::new(660.0, 0.5, 0.02, 0.0)).unwrap();
        let expected_a = a.render(8000);
        let expected_b = b.render(8000);

        let mut voices = vec![a.voice(8000), b.voice(8000)];
        let mut out = vec![0.0; 160];
        mix(&mut voices, &mut out);

        for (i, sample) in out.iter().enumerate() {
            let want = expected_a.get(i).copied().unwrap_or(0.0) + expected_b.get(i).copied().unwrap_or(0.0);
            assert!((sample - want).abs() < 1e-6);
        }
        assert!(voices.is_empty());
    }
}
