//! Decoded sample provider interface
//!
//! The buffering core never decodes anything itself. It asks a provider for
//! interleaved `f32` frames at a file-relative frame offset and writes them
//! straight into a pool buffer. Providers run on the background worker and
//! may block on I/O.

use thiserror::Error;

/// Errors reported by a sample provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Underlying file could not be read
    #[error("I/O error at frame {offset}: {message}")]
    Io { offset: u64, message: String },

    /// Data at the offset is corrupt or in an unsupported format
    #[error("Decode error at frame {offset}: {message}")]
    Decode { offset: u64, message: String },

    /// Offset is at or beyond the end of the file
    #[error("End of file at frame {offset}")]
    Eof { offset: u64 },
}

impl ProviderError {
    /// Frame offset the error refers to
    pub fn offset(&self) -> u64 {
        match self {
            ProviderError::Io { offset, .. }
            | ProviderError::Decode { offset, .. }
            | ProviderError::Eof { offset } => *offset,
        }
    }
}

/// Source of decoded interleaved frames
pub trait SampleProvider: Send {
    /// Samples per frame
    fn channels(&self) -> usize;

    /// Total length in frames, if known before reaching the end
    fn length_frames(&self) -> Option<u64>;

    /// Sample rate in Hz, if the source has one
    fn sample_rate(&self) -> Option<u32> {
        None
    }

    /// Decode frames starting at `offset` into `out`
    ///
    /// `out` holds a whole number of frames. Returns the number of frames
    /// written; fewer than requested means the end of the file was reached.
    /// Reading at or past the end returns `Ok(0)` or `Err(ProviderError::Eof)`.
    fn read(&mut self, offset: u64, out: &mut [f32]) -> Result<usize, ProviderError>;
}

impl<P: SampleProvider + ?Sized> SampleProvider for Box<P> {
    fn channels(&self) -> usize {
        (**self).channels()
    }

    fn length_frames(&self) -> Option<u64> {
        (**self).length_frames()
    }

    fn sample_rate(&self) -> Option<u32> {
        (**self).sample_rate()
    }

    fn read(&mut self, offset: u64, out: &mut [f32]) -> Result<usize, ProviderError> {
        (**self).read(offset, out)
    }
}

/// Provider over interleaved samples held in memory
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: Option<u32>,
}

impl MemoryProvider {
    /// Wrap interleaved samples; a trailing partial frame is ignored
    pub fn new(samples: Vec<f32>, channels: usize) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() / channels * channels;
        let mut samples = samples;
        samples.truncate(whole);
        Self {
            samples,
            channels,
            sample_rate: None,
        }
    }

    /// Provider where every sample of frame `i` has the value `i`
    ///
    /// Makes it trivial to check which file frame ended up where.
    pub fn ramp(frames: u64, channels: usize) -> Self {
        let channels = channels.max(1);
        let mut samples = Vec::with_capacity(frames as usize * channels);
        for frame in 0..frames {
            for _ in 0..channels {
                samples.push(frame as f32);
            }
        }
        Self::new(samples, channels)
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    fn frames(&self) -> u64 {
        (self.samples.len() / self.channels) as u64
    }
}

impl SampleProvider for MemoryProvider {
    fn channels(&self) -> usize {
        self.channels
    }

    fn length_frames(&self) -> Option<u64> {
        Some(self.frames())
    }

    fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    fn read(&mut self, offset: u64, out: &mut [f32]) -> Result<usize, ProviderError> {
        let total = self.frames();
        if offset >= total {
            return Err(ProviderError::Eof { offset });
        }

        let wanted = out.len() / self.channels;
        let frames = wanted.min((total - offset) as usize);
        let start = offset as usize * self.channels;
        let len = frames * self.channels;
        out[..len].copy_from_slice(&self.samples[start..start + len]);
        Ok(frames)
    }
}
