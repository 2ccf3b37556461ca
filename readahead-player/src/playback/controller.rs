//! Playback controller
//!
//! Transport API (play/pause/stop/seek/reload), channel map changes and
//! position/state queries,
//! usable from any non-real-time thread. Cloning is cheap; all clones drive
//! the same player.
//!
//! Transitions are serialized by a mutex that the render path never takes.
//! The render supplier and the worker only observe the shared atomics.

use super::channel_map::ChannelMapSender;
use super::diagnostics::PlaybackStats;
use super::reader::ReadGate;
use super::scheduler::ReadRequest;
use super::shared::SharedPlayback;
use super::state::{transition, Command, TransportContext, TransportState};
use crate::audio::provider::ProviderError;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use readahead_common::events::{EventBus, PlaybackState, PlayerEvent, ReadErrorKind};
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};

/// Transport facts only touched under the transition lock
#[derive(Debug, Default)]
struct RunFlags {
    /// The current run drained the end of the file
    completed: bool,
}

/// State shared by the controller and the buffering worker
pub(crate) struct TransportCore {
    pub(crate) shared: Arc<SharedPlayback>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) wake: Arc<Notify>,
    buffer_count: usize,
    frames_per_buffer: usize,

    /// Serializes transitions
    lock: Mutex<RunFlags>,
    last_error: Mutex<Option<ProviderError>>,
    channel_maps: Mutex<ChannelMapSender>,
}

impl TransportCore {
    pub(crate) fn new(
        shared: Arc<SharedPlayback>,
        events: Arc<EventBus>,
        buffer_count: usize,
        frames_per_buffer: usize,
        channel_maps: ChannelMapSender,
    ) -> Self {
        Self {
            shared,
            events,
            wake: Arc::new(Notify::new()),
            buffer_count,
            frames_per_buffer,
            lock: Mutex::new(RunFlags::default()),
            last_error: Mutex::new(None),
            channel_maps: Mutex::new(channel_maps),
        }
    }

    /// Apply a transport command
    pub(crate) fn apply(&self, command: Command) -> Result<TransportState> {
        let mut flags = self.lock.lock();
        self.apply_locked(&mut flags, command)
    }

    fn apply_locked(&self, flags: &mut RunFlags, command: Command) -> Result<TransportState> {
        let current = self.shared.state();
        let length = self.shared.length_frames();

        if let (Command::Seek(offset), Some(length)) = (command, length) {
            if offset > length {
                return Err(Error::InvalidSeek { offset, length });
            }
        }

        let ctx = TransportContext {
            position: self.shared.position(),
            completed: flags.completed,
        };
        let t = transition(current, command, ctx);
        if t.is_noop(current) {
            debug!("Ignoring {:?} in state {:?}", command, current);
            return Ok(current);
        }

        if let Some(anchor) = t.reanchor {
            let generation = self.shared.reanchor(anchor);
            flags.completed = false;
            // Stopping keeps the failure visible; a new run clears it
            if command != Command::Stop {
                self.shared.set_error(false);
                *self.last_error.lock() = None;
            }
            debug!("Re-anchored at frame {} (generation {})", anchor, generation);
        }
        if t.error {
            self.shared.set_error(true);
        }
        self.shared.set_state(t.next);

        if current.public() != t.next.public() {
            info!("Playback state: {} -> {}", current.public(), t.next.public());
            self.events.emit_lossy(PlayerEvent::StateChanged {
                old_state: current.public(),
                new_state: t.next.public(),
                timestamp: chrono::Utc::now(),
            });
        }
        if let (Command::Seek(frame), Some(_)) = (command, t.reanchor) {
            self.events.emit_lossy(PlayerEvent::Seeked {
                frame,
                timestamp: chrono::Utc::now(),
            });
        }

        self.wake.notify_one();
        Ok(t.next)
    }

    /// Re-anchor at the current position if `frames` may already be buffered
    ///
    /// The window covers what has been admitted to the ready queue plus the
    /// one read that can be in flight past it. Nothing is buffered while
    /// stopped.
    pub(crate) fn reload_range(&self, frames: Range<u64>) -> Result<bool> {
        let mut flags = self.lock.lock();
        if self.shared.state() == TransportState::Stopped {
            return Ok(false);
        }
        let position = self.shared.position();
        let window = position..self.shared.read_cursor() + self.frames_per_buffer as u64;

        if frames.is_empty() || frames.end <= window.start || frames.start >= window.end {
            debug!(
                "Reload of {:?} outside buffered window {:?}, nothing to discard",
                frames, window
            );
            return Ok(false);
        }

        info!("Reloading {:?} from frame {}", frames, position);
        self.apply_locked(&mut flags, Command::Seek(position))?;
        Ok(true)
    }

    /// Stop playback once the end-of-stream buffer has drained
    ///
    /// Returns true if playback finished in this call.
    pub(crate) fn settle(&self) -> bool {
        if self.shared.state() != TransportState::Playing || !self.shared.is_drained() {
            return false;
        }

        let mut flags = self.lock.lock();
        if self.shared.state() != TransportState::Playing || !self.shared.is_drained() {
            return false;
        }

        let frame = self.shared.position();
        if self.apply_locked(&mut flags, Command::Finished).is_err() {
            return false;
        }
        flags.completed = true;
        info!("Playback finished at frame {}", frame);
        self.events.emit_lossy(PlayerEvent::PlaybackFinished {
            frame,
            frames_emitted: self.shared.frames_emitted(),
            timestamp: chrono::Utc::now(),
        });
        true
    }

    /// Worker: the buffering run for `generation` is primed
    pub(crate) fn anchored(&self, generation: u64, look_ahead_frames: u64) -> bool {
        let mut flags = self.lock.lock();
        if self.shared.generation() != generation || !self.shared.state().is_seeking() {
            return false;
        }

        let frame = self.shared.anchor();
        if self.apply_locked(&mut flags, Command::Anchored).is_err() {
            return false;
        }
        debug!(
            "Buffering anchored at frame {} with {} frames ahead",
            frame, look_ahead_frames
        );
        self.events.emit_lossy(PlayerEvent::Anchored {
            frame,
            look_ahead_frames,
            timestamp: chrono::Utc::now(),
        });
        true
    }

    /// Worker: a read for `generation` failed
    pub(crate) fn fail(&self, generation: u64, error: ProviderError) {
        let mut flags = self.lock.lock();
        if self.shared.generation() != generation {
            debug!("Ignoring failure from stale generation {}", generation);
            return;
        }

        warn!("Read failed, stopping playback: {}", error);
        let kind = match error {
            ProviderError::Decode { .. } => ReadErrorKind::Decode,
            _ => ReadErrorKind::Io,
        };
        let frame = error.offset();
        let message = error.to_string();

        if self.apply_locked(&mut flags, Command::Fail).is_err() {
            return;
        }
        // A failure while already stopped still leaves its trace
        self.shared.set_error(true);
        *self.last_error.lock() = Some(error);

        self.events.emit_lossy(PlayerEvent::ReadFailed {
            kind,
            frame,
            message,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(crate) fn last_error(&self) -> Option<ProviderError> {
        self.last_error.lock().clone()
    }
}

impl ReadGate for TransportCore {
    fn admit(&self, request: &ReadRequest, end_frame: u64) -> bool {
        let _flags = self.lock.lock();
        if self.shared.generation() != request.generation {
            return false;
        }
        self.shared.extend_read_cursor(end_frame);
        true
    }
}

/// Cloneable handle for transport control and observation
#[derive(Clone)]
pub struct PlaybackController {
    core: Arc<TransportCore>,
}

impl PlaybackController {
    pub(crate) fn new(core: Arc<TransportCore>) -> Self {
        Self { core }
    }

    /// Start or resume playback
    ///
    /// From stopped, playback restarts at the current position (or at the
    /// beginning once the end has been reached) after buffering is primed.
    pub fn play(&self) -> Result<()> {
        self.core.settle();
        self.core.apply(Command::Play).map(|_| ())
    }

    /// Pause playback, keeping buffered data
    pub fn pause(&self) -> Result<()> {
        self.core.settle();
        self.core.apply(Command::Pause).map(|_| ())
    }

    /// Stop playback and rewind to the beginning
    pub fn stop(&self) -> Result<()> {
        self.core.apply(Command::Stop).map(|_| ())
    }

    /// Move playback to `frame`
    ///
    /// Fails with `Error::InvalidSeek` beyond the known file length; seeking
    /// to exactly the length is allowed.
    pub fn seek(&self, frame: u64) -> Result<()> {
        self.core.settle();
        self.core.apply(Command::Seek(frame)).map(|_| ())
    }

    /// Discard buffered data and re-read from the current position
    ///
    /// Keeps playing/paused. Use when the underlying file changed.
    pub fn reload(&self) -> Result<()> {
        self.core.settle();
        let position = self.core.shared.position();
        info!("Reloading from frame {}", position);
        self.core.apply(Command::Seek(position)).map(|_| ())
    }

    /// Reload after the frames in `frames` changed on disk
    ///
    /// Only data that may already be buffered is affected; changes past the
    /// read-ahead window are picked up by normal reading. If the range
    /// overlaps the window, everything buffered is discarded and re-read from
    /// the current position, exactly like `reload()`. Returns true in that
    /// case.
    pub fn reload_range(&self, frames: Range<u64>) -> Result<bool> {
        self.core.settle();
        self.core.reload_range(frames)
    }

    /// Replace the output channel map
    ///
    /// Output channel i plays source channel `map[i]`; `None` passes source
    /// channels through. The number of output channels cannot change. The
    /// render supplier adopts the map at the start of its next cycle.
    pub fn set_channel_map(&self, map: Option<Vec<usize>>) -> Result<()> {
        self.core.channel_maps.lock().send(map)
    }

    /// Render position in frames
    pub fn position(&self) -> u64 {
        self.core.shared.position()
    }

    /// Public transport state
    pub fn state(&self) -> PlaybackState {
        self.core.settle();
        self.core.shared.state().public()
    }

    /// Internal transport state, including seeking
    pub fn transport_state(&self) -> TransportState {
        self.core.settle();
        self.core.shared.state()
    }

    /// True while a re-anchor is buffering
    pub fn is_seeking(&self) -> bool {
        self.transport_state().is_seeking()
    }

    pub fn underrun_count(&self) -> u64 {
        self.core.shared.underruns()
    }

    /// Known file length in frames
    pub fn length_frames(&self) -> Option<u64> {
        self.core.shared.length_frames()
    }

    /// Error flag raised by a failed read
    ///
    /// Survives `stop()`; cleared by the next play or seek.
    pub fn has_error(&self) -> bool {
        self.core.shared.has_error()
    }

    pub fn last_error(&self) -> Option<ProviderError> {
        self.core.last_error()
    }

    pub fn generation(&self) -> u64 {
        self.core.shared.generation()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.core.events.subscribe()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.core.events)
    }

    /// Snapshot of counters and cursors
    pub fn stats(&self) -> PlaybackStats {
        // Holding the transition lock keeps the read cursor and the
        // generation consistent with the position
        let _flags = self.core.lock.lock();
        let shared = &self.core.shared;
        let position = shared.position();
        let read_cursor = shared.read_cursor();
        PlaybackStats {
            state: shared.state().public(),
            seeking: shared.state().is_seeking(),
            generation: shared.generation(),
            position_frames: position,
            read_cursor_frames: read_cursor,
            look_ahead_frames: read_cursor.saturating_sub(position),
            capacity_frames: self.core.buffer_count as u64 * self.core.frames_per_buffer as u64,
            output_clock_frames: shared.clock_frames(),
            frames_emitted: shared.frames_emitted(),
            underruns: shared.underruns(),
            length_frames: shared.length_frames(),
            error: shared.has_error(),
        }
    }
}
