//! Sample providers and engine builders for tests

use readahead_player::audio::{MemoryProvider, ProviderError, SampleProvider};
use readahead_player::config::BufferingConfig;
use readahead_player::playback::PlaybackEngine;
use std::sync::{Arc, Mutex};

/// Mono configuration with a small pool and 1 ms polling
pub fn ramp_config(buffer_count: usize, frames_per_buffer: usize) -> BufferingConfig {
    BufferingConfig {
        buffer_count,
        frames_per_buffer,
        channels: 1,
        poll_interval_ms: 1,
        ..Default::default()
    }
}

/// Engine over a mono ramp where sample value == frame index
pub fn ramp_engine(
    buffer_count: usize,
    frames_per_buffer: usize,
    length: u64,
) -> PlaybackEngine<MemoryProvider> {
    PlaybackEngine::build(
        &ramp_config(buffer_count, frames_per_buffer),
        MemoryProvider::ramp(length, 1),
    )
    .unwrap()
}

/// Which error a `FaultyProvider` injects
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Io,
    Decode,
}

/// Ramp provider that fails any read touching `fail_at`
pub struct FaultyProvider {
    inner: MemoryProvider,
    fail_at: u64,
    fault: Fault,
    pub reads: usize,
}

impl FaultyProvider {
    pub fn new(length: u64, fail_at: u64, fault: Fault) -> Self {
        Self {
            inner: MemoryProvider::ramp(length, 1),
            fail_at,
            fault,
            reads: 0,
        }
    }
}

impl SampleProvider for FaultyProvider {
    fn channels(&self) -> usize {
        self.inner.channels()
    }

    fn length_frames(&self) -> Option<u64> {
        self.inner.length_frames()
    }

    fn read(&mut self, offset: u64, out: &mut [f32]) -> Result<usize, ProviderError> {
        self.reads += 1;
        let frames = (out.len() / self.channels()) as u64;
        if offset <= self.fail_at && self.fail_at < offset + frames {
            return Err(match self.fault {
                Fault::Io => ProviderError::Io {
                    offset: self.fail_at,
                    message: "injected read failure".to_string(),
                },
                Fault::Decode => ProviderError::Decode {
                    offset: self.fail_at,
                    message: "injected corrupt frame".to_string(),
                },
            });
        }
        self.inner.read(offset, out)
    }
}

/// Ramp provider that does not report its length up front
pub struct UnsizedProvider {
    inner: MemoryProvider,
}

impl UnsizedProvider {
    pub fn new(length: u64) -> Self {
        Self {
            inner: MemoryProvider::ramp(length, 1),
        }
    }
}

impl SampleProvider for UnsizedProvider {
    fn channels(&self) -> usize {
        1
    }

    fn length_frames(&self) -> Option<u64> {
        None
    }

    fn read(&mut self, offset: u64, out: &mut [f32]) -> Result<usize, ProviderError> {
        self.inner.read(offset, out)
    }
}

/// Callback run from inside a provider read
pub type ReadHook = Arc<Mutex<Option<Box<dyn FnMut() + Send>>>>;

/// Ramp provider that runs a hook when a read starts at `hook_at`
///
/// Lets a test act on the render side while the worker is mid-read.
pub struct HookedProvider {
    inner: MemoryProvider,
    hook_at: u64,
    hook: ReadHook,
}

impl HookedProvider {
    pub fn new(length: u64, hook_at: u64, hook: ReadHook) -> Self {
        Self {
            inner: MemoryProvider::ramp(length, 1),
            hook_at,
            hook,
        }
    }
}

impl SampleProvider for HookedProvider {
    fn channels(&self) -> usize {
        1
    }

    fn length_frames(&self) -> Option<u64> {
        self.inner.length_frames()
    }

    fn read(&mut self, offset: u64, out: &mut [f32]) -> Result<usize, ProviderError> {
        if offset == self.hook_at {
            if let Some(hook) = self.hook.lock().unwrap().as_mut() {
                hook();
            }
        }
        self.inner.read(offset, out)
    }
}
