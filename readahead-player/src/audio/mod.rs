//! Audio data types and sample providers

pub mod decoder;
pub mod provider;
pub mod types;

pub use decoder::SymphoniaProvider;
pub use provider::{MemoryProvider, ProviderError, SampleProvider};
pub use types::{BufferState, FrameBuffer};
