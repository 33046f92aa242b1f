//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! Incoming samples are downmixed to mono, sliced into fixed-size frames and
//! handed to the detection loop over a channel.
//!
//! ## Features
//! - Automatic input device selection
//! - Sample rate closest to 44.1 kHz within the device's supported range
//! - Non-blocking hand-off: frames are dropped, never queued, when the
//!   consumer falls behind

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;
use anyhow::{Result, anyhow};

use crate::pitch::SampleFrame;

/// Number of samples per detection frame (~46ms at 44.1kHz).
pub const FRAME_SIZE: usize = 2048;

/// Preferred capture sample rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `sender` - Channel sender for frames; a full channel drops the frame.
///   Anything built from a [`SampleFrame`] works, so the sender of a
///   [`DetectionWorker`](crate::session::DetectionWorker) can be passed
///   directly.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its sample rate.
///   Capture stops when the stream is dropped.
/// * `Err(e)` - No usable input device or configuration
pub fn start_audio_capture<T>(sender: Sender<T>) -> Result<(cpal::Stream, u32)>
where
    T: From<SampleFrame> + Send + 'static,
{
    let host = cpal::default_host();
    let device = host.default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("[AUDIO] Using input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
    let channels = config.channels().max(1) as usize;
    let config: cpal::StreamConfig = config.into();

    log::info!("[AUDIO] Capturing {} channel(s) at {} Hz", channels, sample_rate);

    let err_fn = |err| log::error!("[AUDIO] An error occurred on the input stream: {}", err);

    // Accumulates mono samples until a full frame is available.
    let mut pending = Vec::with_capacity(FRAME_SIZE * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend(
                data.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );

            while pending.len() >= FRAME_SIZE {
                let samples = pending[..FRAME_SIZE].to_vec();
                let _ = sender.try_send(SampleFrame::new(samples, sample_rate).into());
                pending.drain(..FRAME_SIZE);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks the input configuration to capture with.
///
/// Only 32-bit float formats are considered; among those, mono is preferred,
/// then the range that contains (or comes closest to) the target rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let rate_distance = if TARGET_SAMPLE_RATE < min {
                min - TARGET_SAMPLE_RATE
            } else {
                TARGET_SAMPLE_RATE.saturating_sub(max)
            };
            (c.channels(), rate_distance)
        })
}
