//! Test helper modules for readahead-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - providers: ramp engines and fault-injecting sample providers
//! - harness: deterministic drive loop (worker pass + render cycle)
//! - audio_generator: WAV files for the symphonia provider

#![allow(dead_code)]

pub mod audio_generator;
pub mod harness;
pub mod providers;

// Re-export commonly used types
pub use audio_generator::{decode_marker, generate_marker_wav};
pub use harness::Harness;
pub use providers::{ramp_config, ramp_engine, FaultyProvider};
