//! # readahead common library
//!
//! Shared code for the readahead playback crates:
//! - Error type shared by configuration and event plumbing
//! - Event types (`PlayerEvent`) and the broadcast `EventBus`
//! - Public transport state (`PlaybackState`)
//! - Configuration file resolution and TOML loading

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, PlayerEvent, ReadErrorKind};
