//! # Streaming Detection Module
//!
//! Ties the capture callback and the pitch estimator together into one
//! running session: a crossbeam channel hands raw blocks from the audio
//! thread to a dedicated processing thread, which conditions each block,
//! estimates its pitch, and notifies a sink whenever the detected note
//! changes.
//!
//! ## Concurrency model
//! The hand-off channel is the only state shared between the capture
//! callback and the processing thread. The debounce state lives on the
//! processing thread; the run flag is an `AtomicBool` written by `stop()`
//! and polled by the processing loop with a bounded `recv_timeout`, so
//! shutdown latency is bounded by the poll interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::audio::{self, AudioBlock};
use crate::config::{DetectorConfig, QueuePolicy};
use crate::note::{self, Note};
use crate::{pitch, NoteEvent};

/// Receives note-change notifications from a running session.
///
/// Called synchronously on the processing thread, once per *change*; blocks
/// that resolve to the note already reported are suppressed. A slow sink
/// delays every subsequent block, so implementations should return quickly
/// or hand the event off. The `Sender<NoteEvent>` impl is that hand-off
/// form.
pub trait NoteSink: Send {
    fn on_note_change(&mut self, note: &Note, frequency_hz: f32);
}

/// Forwards events into a channel. A send to a dropped receiver is logged
/// and otherwise ignored; the session keeps running.
impl NoteSink for Sender<NoteEvent> {
    fn on_note_change(&mut self, note: &Note, frequency_hz: f32) {
        let event = NoteEvent {
            note: note.clone(),
            frequency_hz,
        };
        if self.send(event).is_err() {
            tracing::warn!("note event receiver dropped");
        }
    }
}

impl NoteSink for Box<dyn FnMut(&Note, f32) + Send> {
    fn on_note_change(&mut self, note: &Note, frequency_hz: f32) {
        self(note, frequency_hz)
    }
}

/// A pitch-detection session over one input device.
///
/// The session is a two-state machine, stopped or running. `start` opens the
/// capture stream and spawns the processing thread; `stop` tears both down.
/// Dropping a running detector stops it.
pub struct PitchDetector {
    config: DetectorConfig,
    session: Option<Session>,
}

/// Live resources of a running session.
struct Session {
    // Held for its side effect: dropping the stream stops capture.
    stream: cpal::Stream,
    worker: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl PitchDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Starts capture and processing, delivering note changes to `sink`.
    ///
    /// Fails if the session is already running, or if the capture device
    /// cannot be opened; in the latter case no thread or queue is left
    /// behind and the session remains stopped.
    pub fn start<S: NoteSink + 'static>(&mut self, sink: S) -> Result<()> {
        if self.session.is_some() {
            return Err(anyhow!("detector is already running"));
        }

        let (tx, rx) = block_channel(self.config.queue);
        let (stream, sample_rate) = audio::start_capture(tx, &self.config)?;

        let running = Arc::new(AtomicBool::new(true));
        let processor = BlockProcessor::new(&self.config, sink);
        let worker = spawn_worker(rx, processor, running.clone(), self.config.poll_interval())
            .context("failed to spawn processing thread")?;

        tracing::info!(
            sample_rate,
            block_size = self.config.block_size,
            "pitch detection started"
        );
        self.session = Some(Session {
            stream,
            worker,
            running,
        });
        Ok(())
    }

    /// Stops capture and joins the processing thread.
    ///
    /// Idempotent: calling `stop` on a stopped session is a no-op. Worst
    /// case this blocks for one poll interval plus the block currently
    /// being processed.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.running.store(false, Ordering::SeqCst);
        // Stop capture first so no new blocks arrive while the worker winds
        // down.
        drop(session.stream);
        if session.worker.join().is_err() {
            tracing::error!("processing thread panicked");
        }
        tracing::info!("pitch detection stopped");
    }
}

impl Drop for PitchDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builds the capture hand-off channel for the given policy.
///
/// Both ends are used with `try_send` on the capture side: an unbounded
/// channel never reports full, a bounded one drops the newest block.
fn block_channel(policy: QueuePolicy) -> (Sender<AudioBlock>, Receiver<AudioBlock>) {
    match policy {
        QueuePolicy::Unbounded => crossbeam_channel::unbounded(),
        QueuePolicy::Bounded(capacity) => crossbeam_channel::bounded(capacity),
    }
}

fn spawn_worker<S: NoteSink + 'static>(
    rx: Receiver<AudioBlock>,
    mut processor: BlockProcessor<S>,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pitch-detector".to_string())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                match rx.recv_timeout(poll_interval) {
                    Ok(block) => processor.process(block),
                    // Timeout just means no block yet; loop around and
                    // observe the stop flag.
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        tracing::warn!("capture side disconnected");
                        break;
                    }
                }
            }
        })
}

/// Per-block pipeline stage: conditioning, estimation, range filtering, and
/// note debouncing. Owns the "last emitted note" state; nothing else touches
/// it.
struct BlockProcessor<S> {
    gain: f32,
    min_frequency: f32,
    max_frequency: f32,
    last_note: Option<Note>,
    sink: S,
}

impl<S: NoteSink> BlockProcessor<S> {
    fn new(config: &DetectorConfig, sink: S) -> Self {
        Self {
            gain: config.gain,
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            last_note: None,
            sink,
        }
    }

    fn process(&mut self, mut block: AudioBlock) {
        for sample in block.samples.iter_mut() {
            *sample *= self.gain;
        }

        // Peak-normalize the block. An all-zero block is left alone;
        // dividing by its peak would produce NaNs.
        let peak = block
            .samples
            .iter()
            .fold(0.0_f32, |max, &s| max.max(s.abs()));
        if peak > 0.0 {
            for sample in block.samples.iter_mut() {
                *sample /= peak;
            }
        }

        let Some(frequency) = pitch::detect_pitch_autocorrelation(&block.samples, block.sample_rate)
        else {
            return;
        };
        if frequency <= self.min_frequency || frequency >= self.max_frequency {
            return;
        }
        let Some(current) = note::frequency_to_note(frequency) else {
            return;
        };

        if self.last_note.as_ref() != Some(&current) {
            tracing::debug!(%current, frequency, "note change");
            self.sink.on_note_change(&current, frequency);
            self.last_note = Some(current);
        }
    }
}
