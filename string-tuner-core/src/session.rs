//! # Detection Session Module
//!
//! Drives the detector and matcher over a stream of captured frames.
//!
//! ## Architecture
//! - **Per frame**: [`analyze_frame`] is a pure function of frame and tuning
//! - **Loop**: [`run_detection`] consumes frames from a channel in arrival
//!   order and emits one [`FrameAnalysis`] per frame, in the same order
//! - **Worker**: [`DetectionWorker`] runs the loop on a dedicated thread; frames
//!   and tuning changes arrive on one ordered channel
//! - **Display state**: [`TunerDisplay`] keeps the last in-band reading
//!   across frames without signal

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::matcher::{self, MatchResult};
use crate::pitch::{self, SampleFrame};
use crate::tuning::Tuning;
use crate::waveform;
use crate::FrameAnalysis;

/// Analyzes a single frame against the active tuning.
///
/// 1. Builds the waveform preview for display
/// 2. Detects the in-band pitch, if any
/// 3. Matches the pitch to the nearest note of the tuning
pub fn analyze_frame(frame: &SampleFrame, tuning: &Tuning) -> FrameAnalysis {
    let waveform = waveform::preview(&frame.samples);
    let detected_frequency = frame.detect(tuning);

    let matched = detected_frequency.and_then(|freq| match matcher::match_note(freq, tuning) {
        Ok(result) => Some(result),
        Err(e) => {
            log::warn!("[DETECT] Match failed: {}", e);
            None
        }
    });

    FrameAnalysis {
        detected_frequency,
        matched,
        waveform,
    }
}

/// Processes frames until the frame channel closes or the result receiver
/// hangs up.
///
/// Frames are handled one at a time in arrival order, so results leave in
/// capture order. An empty stream is not an error.
///
/// # Returns
/// * Number of frames processed
pub fn run_detection(
    frames: &Receiver<SampleFrame>,
    tuning: &Tuning,
    results: &Sender<FrameAnalysis>,
) -> usize {
    let mut processed = 0;
    for frame in frames.iter() {
        if results.send(analyze_frame(&frame, tuning)).is_err() {
            log::debug!("[DETECT] Result receiver dropped");
            break;
        }
        processed += 1;
    }
    log::debug!("[DETECT] Processed {} frames", processed);
    processed
}

/// Capacity of the worker's result channel. Results that do not fit are
/// dropped rather than queued.
pub const RESULT_CAPACITY: usize = 64;

/// One message on the worker's input channel.
///
/// Frames and tuning changes share a channel, so a tuning change applies to
/// exactly the frames sent after it.
#[derive(Debug, Clone)]
pub enum WorkerInput {
    Frame(SampleFrame),
    Tuning(Tuning),
}

impl From<SampleFrame> for WorkerInput {
    fn from(frame: SampleFrame) -> Self {
        WorkerInput::Frame(frame)
    }
}

/// Detection loop running on its own thread.
#[derive(Debug)]
pub struct DetectionWorker {
    input_tx: Sender<WorkerInput>,
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<usize>>,
}

impl DetectionWorker {
    /// Spawns the worker thread.
    ///
    /// # Returns
    /// * The worker handle and the receiver for per-frame results
    pub fn spawn(tuning: Tuning) -> (Self, Receiver<FrameAnalysis>) {
        let (input_tx, input_rx) = crossbeam_channel::unbounded::<WorkerInput>();
        let (result_tx, result_rx) = crossbeam_channel::bounded(RESULT_CAPACITY);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::spawn(move || {
            log::info!("[DETECT-THREAD] Starting with tuning {:?}", tuning.id);
            let mut tuning = tuning;
            let mut processed = 0;

            loop {
                crossbeam_channel::select! {
                    recv(input_rx) -> msg => match msg {
                        Ok(WorkerInput::Frame(frame)) => {
                            match result_tx.try_send(analyze_frame(&frame, &tuning)) {
                                Ok(()) => {}
                                Err(TrySendError::Full(_)) => {
                                    log::trace!("[DETECT-THREAD] Result channel full, dropping result");
                                }
                                Err(TrySendError::Disconnected(_)) => {
                                    log::debug!("[DETECT-THREAD] Result receiver dropped");
                                    break;
                                }
                            }
                            processed += 1;
                        }
                        Ok(WorkerInput::Tuning(next)) => {
                            log::info!("[DETECT-THREAD] Switching tuning to {:?}", next.id);
                            tuning = next;
                        }
                        Err(_) => {
                            log::debug!("[DETECT-THREAD] Input channel closed");
                            break;
                        }
                    },
                    recv(shutdown_rx) -> _ => {
                        log::debug!("[DETECT-THREAD] Received shutdown signal");
                        break;
                    },
                }
            }

            log::info!("[DETECT-THREAD] Finished after {} frames", processed);
            processed
        });

        (
            Self {
                input_tx,
                shutdown_tx,
                thread_handle: Some(thread_handle),
            },
            result_rx,
        )
    }

    /// A sender for feeding the worker from another thread, e.g. a capture
    /// callback. Anything sent through it is ordered with [`submit`] and
    /// [`set_tuning`].
    ///
    /// [`submit`]: DetectionWorker::submit
    /// [`set_tuning`]: DetectionWorker::set_tuning
    pub fn input(&self) -> Sender<WorkerInput> {
        self.input_tx.clone()
    }

    /// Queues a frame for analysis.
    pub fn submit(&self, frame: SampleFrame) {
        self.send(WorkerInput::Frame(frame));
    }

    /// Switches the active tuning for every frame queued after this call.
    /// Frames queued earlier are still analysed with the previous tuning.
    pub fn set_tuning(&self, tuning: Tuning) {
        self.send(WorkerInput::Tuning(tuning));
    }

    fn send(&self, input: WorkerInput) {
        if self.input_tx.send(input).is_err() {
            log::warn!("[DETECT] Worker already stopped, input ignored");
        }
    }

    /// Stops the worker and waits for it. Input still queued is discarded.
    ///
    /// # Returns
    /// * Number of frames the worker processed
    pub fn shutdown(mut self) -> usize {
        // The worker may already have exited on its own.
        let _ = self.shutdown_tx.try_send(());
        self.join()
    }

    /// Closes the input channel and waits until everything queued has been
    /// processed. Blocks for as long as a sender from [`input`] is alive.
    ///
    /// [`input`]: DetectionWorker::input
    ///
    /// # Returns
    /// * Number of frames the worker processed
    pub fn finish(mut self) -> usize {
        let (closed_tx, _) = crossbeam_channel::unbounded();
        drop(std::mem::replace(&mut self.input_tx, closed_tx));
        self.join()
    }

    fn join(&mut self) -> usize {
        match self.thread_handle.take().map(JoinHandle::join) {
            Some(Ok(processed)) => processed,
            Some(Err(_)) => {
                log::error!("[DETECT] Worker thread panicked");
                0
            }
            None => 0,
        }
    }
}

/// What a display sink currently shows.
///
/// Frames without signal leave the last reading in place; the waveform is
/// refreshed on every frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TunerDisplay {
    /// Last in-band pitch, full precision
    pub pitch: Option<f32>,
    pub matched: Option<MatchResult>,
    pub waveform: Vec<f32>,
}

impl TunerDisplay {
    pub fn apply(&mut self, analysis: FrameAnalysis) {
        self.waveform = analysis.waveform;
        if analysis.detected_frequency.is_some() {
            self.pitch = analysis.detected_frequency;
            self.matched = analysis.matched;
        }
    }

    /// Clears the reading, e.g. after the active tuning changed.
    pub fn reset(&mut self) {
        self.pitch = None;
        self.matched = None;
    }

    /// Pitch rounded to whole Hz.
    pub fn rounded_pitch(&self) -> Option<u32> {
        self.pitch.map(pitch::rounded_hz)
    }

    /// Status line for the current reading.
    pub fn status(&self) -> Option<&'static str> {
        self.matched.as_ref().map(|m| m.classification().label())
    }
}
