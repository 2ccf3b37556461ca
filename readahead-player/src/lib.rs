//! # Readahead Player Library (readahead-player)
//!
//! Buffered audio file playback core.
//!
//! **Purpose:** Stream decoded audio from storage into a real-time render
//! callback without glitches, while callers control transport and observe
//! playback position.
//!
//! **Architecture:** A background worker reads ahead into a fixed pool of
//! frame buffers; a wait-free render supplier drains them each render cycle.
//! The two sides share only lock-free SPSC queues (ringbuf) and atomics.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use audio::{MemoryProvider, ProviderError, SampleProvider, SymphoniaProvider};
pub use config::{BufferingConfig, TomlConfig};
pub use error::{Error, Result};
pub use playback::{PlaybackController, PlaybackEngine, PlaybackStats, RenderSupplier};
pub use readahead_common::{PlaybackState, PlayerEvent};
