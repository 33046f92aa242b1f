//! # Audio Output Module
//!
//! Plays reference tones on the default output device. Each tone becomes an
//! independent [`ToneVoice`]; overlapping tones are summed, and each voice
//! falls silent at its envelope's stop time. The stream callback works on
//! buffers sized when the stream opens.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use anyhow::{Result, anyhow};

use crate::synth::{self, ToneEnvelope, ToneVoice};

/// Voices mixed at once. Tones started beyond this wait in the channel until
/// a voice finishes.
pub const MAX_VOICES: usize = 16;

/// Mono frames mixed per pass; longer device buffers are mixed in chunks.
const MIX_FRAMES: usize = 4096;

/// An open output stream that reference tones can be started on.
pub struct ToneOutput {
    voice_tx: Sender<ToneVoice>,
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl ToneOutput {
    /// Opens the default output device.
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;

        log::info!("[OUTPUT] Using output device: {}", device.name()?);

        let supported = device.default_output_config()?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(anyhow!(
                "Unsupported output sample format {:?}",
                supported.sample_format()
            ));
        }
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels().max(1) as usize;
        let config: cpal::StreamConfig = supported.into();

        let (voice_tx, voice_rx) = crossbeam_channel::unbounded::<ToneVoice>();
        // Both buffers are sized here; the callback never allocates.
        let mut voices: Vec<ToneVoice> = Vec::with_capacity(MAX_VOICES);
        let mut mono = vec![0.0f32; MIX_FRAMES];

        let err_fn = |err| log::error!("[OUTPUT] An error occurred on the output stream: {}", err);

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let room = MAX_VOICES - voices.len();
                voices.extend(voice_rx.try_iter().take(room));

                for block in data.chunks_mut(MIX_FRAMES * channels) {
                    let mono = &mut mono[..block.len().div_ceil(channels)];
                    synth::mix(&mut voices, mono);

                    for (frame, &sample) in block.chunks_mut(channels).zip(mono.iter()) {
                        frame.fill(sample);
                    }
                }
            },
            err_fn,
            None,
        )?;

        stream.play()?;

        Ok(Self {
            voice_tx,
            sample_rate,
            _stream: stream,
        })
    }

    /// Starts a tone. Tones already playing keep playing.
    pub fn play_tone(&self, envelope: &ToneEnvelope) -> Result<()> {
        self.voice_tx
            .send(envelope.voice(self.sample_rate))
            .map_err(|_| anyhow!("Output stream is closed"))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
