//! Shared playback block
//!
//! Atomics shared between the control side, the buffering worker and the
//! render supplier. This is the only state the render path touches besides
//! the pool queues.
//!
//! Ordering contract for a re-anchor (always under the controller lock):
//! 1. store the anchor and reset the read cursor to it
//! 2. bump the generation (Release)
//! 3. store the new transport state (Release)
//!
//! The render supplier loads the state (Acquire) before the generation, so a
//! completed transition is never observed ahead of the invalidation it
//! depends on.
//!
//! The read cursor only moves under the same lock and is extended before a
//! buffer reaches the ready queue, so it never trails the render position.

use super::state::TransportState;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

/// Marker for "length not known"
const UNKNOWN_LENGTH: u64 = u64::MAX;

/// Marker for "no generation drained"
const NOT_DRAINED: u64 = u64::MAX;

#[derive(Debug)]
pub struct SharedPlayback {
    state: AtomicU8,
    generation: AtomicU64,
    anchor: AtomicU64,

    /// Generation the render supplier has synced to
    render_generation: AtomicU64,

    /// File offset of the next content frame the render supplier will emit
    stream_cursor: AtomicU64,

    /// Frames handed to the render clock while playing, silence included
    clock_frames: AtomicU64,

    /// End of the data published for the current generation
    read_cursor: AtomicU64,

    /// File length in frames, once known
    length_frames: AtomicU64,

    /// Render cycles that came up short while playing
    underruns: AtomicU64,

    /// Content frames emitted since startup
    frames_emitted: AtomicU64,

    /// Generation whose end-of-stream buffer has been fully rendered
    drained_generation: AtomicU64,

    error: AtomicBool,
}

impl SharedPlayback {
    pub fn new(length_frames: Option<u64>) -> Self {
        Self {
            state: AtomicU8::new(TransportState::Stopped as u8),
            generation: AtomicU64::new(0),
            anchor: AtomicU64::new(0),
            render_generation: AtomicU64::new(0),
            stream_cursor: AtomicU64::new(0),
            clock_frames: AtomicU64::new(0),
            read_cursor: AtomicU64::new(0),
            length_frames: AtomicU64::new(length_frames.unwrap_or(UNKNOWN_LENGTH)),
            underruns: AtomicU64::new(0),
            frames_emitted: AtomicU64::new(0),
            drained_generation: AtomicU64::new(NOT_DRAINED),
            error: AtomicBool::new(false),
        }
    }

    // ---- transport (written under the controller lock) ----

    pub fn state(&self) -> TransportState {
        TransportState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: TransportState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn anchor(&self) -> u64 {
        self.anchor.load(Ordering::Acquire)
    }

    /// Invalidate everything buffered and restart at `anchor`
    ///
    /// Returns the new generation.
    pub(crate) fn reanchor(&self, anchor: u64) -> u64 {
        self.anchor.store(anchor, Ordering::Release);
        self.read_cursor.store(anchor, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn length_frames(&self) -> Option<u64> {
        match self.length_frames.load(Ordering::Acquire) {
            UNKNOWN_LENGTH => None,
            len => Some(len),
        }
    }

    pub(crate) fn set_length_frames(&self, length: u64) {
        self.length_frames.store(length, Ordering::Release);
    }

    pub fn has_error(&self) -> bool {
        self.error.load(Ordering::Acquire)
    }

    pub(crate) fn set_error(&self, error: bool) {
        self.error.store(error, Ordering::Release);
    }

    // ---- render side ----

    /// Render position; the anchor while the render supplier has not yet
    /// picked up the current generation
    pub fn position(&self) -> u64 {
        let generation = self.generation();
        if self.render_generation.load(Ordering::Acquire) != generation {
            self.anchor()
        } else {
            self.stream_cursor.load(Ordering::Acquire)
        }
    }

    pub fn render_generation(&self) -> u64 {
        self.render_generation.load(Ordering::Acquire)
    }

    pub(crate) fn publish_render_sync(&self, generation: u64, cursor: u64) {
        self.stream_cursor.store(cursor, Ordering::Release);
        self.render_generation.store(generation, Ordering::Release);
    }

    pub(crate) fn publish_stream_cursor(&self, cursor: u64) {
        self.stream_cursor.store(cursor, Ordering::Release);
    }

    pub fn clock_frames(&self) -> u64 {
        self.clock_frames.load(Ordering::Relaxed)
    }

    pub(crate) fn add_clock_frames(&self, frames: u64) {
        self.clock_frames.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted.load(Ordering::Relaxed)
    }

    pub(crate) fn add_frames_emitted(&self, frames: u64) {
        self.frames_emitted.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub(crate) fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    /// True once the end-of-stream buffer of the current generation drained
    pub fn is_drained(&self) -> bool {
        self.drained_generation.load(Ordering::Acquire) == self.generation()
    }

    pub(crate) fn mark_drained(&self, generation: u64) {
        self.drained_generation.store(generation, Ordering::Release);
    }

    // ---- worker side ----

    pub fn read_cursor(&self) -> u64 {
        self.read_cursor.load(Ordering::Acquire)
    }

    /// Called under the controller lock before the buffer ending at
    /// `end_frame` is handed to the render side
    pub(crate) fn extend_read_cursor(&self, end_frame: u64) {
        self.read_cursor.fetch_max(end_frame, Ordering::AcqRel);
    }
}
