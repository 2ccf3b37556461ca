//! Event types for the readahead event system
//!
//! Provides the shared event definitions and the `EventBus` used to deliver
//! them from the background side of the player to any number of observers.
//!
//! # Architecture
//!
//! - **EventBus** (tokio::broadcast): one-to-many event broadcasting
//! - **Atomics** in the player: lock-free counters read by anyone
//!
//! Nothing on the real-time render thread emits events. Counters bumped there
//! are turned into events by the background worker.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Transport state as seen by callers
///
/// The player also has a transient seeking state internally; it is reported
/// as the state playback will resume into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Category of a failed background read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadErrorKind {
    /// File could not be read
    Io,
    /// Data at the offset is corrupt or unsupported
    Decode,
}

impl std::fmt::Display for ReadErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadErrorKind::Io => write!(f, "io"),
            ReadErrorKind::Decode => write!(f, "decode"),
        }
    }
}

/// Player event types
///
/// Events are broadcast via EventBus and can be serialized (tagged by `type`)
/// for logging or forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Transport state changed
    StateChanged {
        /// State before change
        old_state: PlaybackState,
        /// State after change
        new_state: PlaybackState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Seek accepted; buffering restarts at `frame`
    Seeked {
        /// Seek target (file frame offset)
        frame: u64,
        /// When the seek was accepted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Buffering re-anchored after a seek or start and playback may proceed
    Anchored {
        /// Frame the new buffering run starts at
        frame: u64,
        /// Frames buffered ahead when the run became playable
        look_ahead_frames: u64,
        /// When the run became playable
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Background read failed; playback has been stopped
    ReadFailed {
        /// Failure category
        kind: ReadErrorKind,
        /// File frame offset of the failed read
        frame: u64,
        /// Provider error details
        message: String,
        /// When the failure was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Render thread found no ready data while playing
    Underrun {
        /// Total underrun cycles since startup
        underrun_count: u64,
        /// Render cursor when the underrun was observed
        frame: u64,
        /// When the underrun was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Render thread is emitting buffered data again
    UnderrunRecovered {
        /// Underrun cycles in this stall
        underrun_cycles: u64,
        /// Stall duration in milliseconds (as observed by the worker)
        recovery_time_ms: u64,
        /// When recovery was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Reader reached the end of the file; no more reads will be issued
    EndOfStream {
        /// File length in frames as discovered by the reader
        frame: u64,
        /// When end of file was reached
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The last buffered frame was rendered and playback stopped
    PlaybackFinished {
        /// Final render cursor
        frame: u64,
        /// Valid frames emitted since startup
        frames_emitted: u64,
        /// When completion was settled
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PlayerEvent::StateChanged { .. } => "StateChanged",
            PlayerEvent::Seeked { .. } => "Seeked",
            PlayerEvent::Anchored { .. } => "Anchored",
            PlayerEvent::ReadFailed { .. } => "ReadFailed",
            PlayerEvent::Underrun { .. } => "Underrun",
            PlayerEvent::UnderrunRecovered { .. } => "UnderrunRecovered",
            PlayerEvent::EndOfStream { .. } => "EndOfStream",
            PlayerEvent::PlaybackFinished { .. } => "PlaybackFinished",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over a tokio broadcast channel. Slow subscribers lose the
/// oldest events rather than blocking emitters.
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use readahead_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
