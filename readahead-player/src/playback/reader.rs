//! File reader
//!
//! Executes read requests on the background worker: takes a free buffer,
//! lets the provider decode straight into it, and publishes it to the ready
//! queue. May block on provider I/O.
//!
//! Completion goes through a [`ReadGate`]: data read for a generation that
//! has since been invalidated is never published, and the published read
//! cursor covers a buffer before the render side can see it.

use super::pool::PoolWriter;
use super::scheduler::ReadRequest;
use crate::audio::provider::{ProviderError, SampleProvider};
use tracing::{debug, trace};

/// Admits finished reads into the ready queue
pub trait ReadGate {
    /// Record that `request` produced data up to `end_frame`
    ///
    /// Returns false if the request's generation is no longer current; the
    /// buffer must then be discarded.
    fn admit(&self, request: &ReadRequest, end_frame: u64) -> bool;
}

/// Result of executing one read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Buffer published to the ready queue
    Published { frames: usize, end_of_stream: bool },
    /// Generation changed while reading; data discarded
    Stale,
    /// No free buffer available
    NoBuffer,
    /// Provider failed; buffer discarded
    Failed(ProviderError),
}

pub struct FileReader<P: SampleProvider> {
    provider: P,
    pool: PoolWriter,
    sequence: u64,
}

impl<P: SampleProvider> FileReader<P> {
    pub fn new(provider: P, pool: PoolWriter) -> Self {
        Self {
            provider,
            pool,
            sequence: 0,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn free_count(&self) -> usize {
        self.pool.free_count()
    }

    pub fn buffer_count(&self) -> usize {
        self.pool.buffer_count()
    }

    /// Read one buffer's worth of frames for `request`
    pub fn read(&mut self, request: &ReadRequest, gate: &impl ReadGate) -> ReadOutcome {
        let Some(mut buffer) = self.pool.acquire_free() else {
            return ReadOutcome::NoBuffer;
        };

        let channels = buffer.channels();
        let wanted = request.frames.min(buffer.capacity_frames());
        trace!(
            "Reading {} frames at {} into slot {}",
            wanted,
            request.start_frame,
            buffer.slot()
        );

        let region = buffer.prepare(request.generation, request.start_frame);
        let result = self
            .provider
            .read(request.start_frame, &mut region[..wanted * channels]);

        let (frames, end_of_stream) = match result {
            Ok(frames) => {
                let frames = frames.min(wanted);
                let end = request.start_frame + frames as u64;
                let at_length = self.provider.length_frames().map_or(false, |len| end >= len);
                (frames, frames < wanted || at_length)
            }
            Err(ProviderError::Eof { .. }) => (0, true),
            Err(e) => {
                self.pool.discard(buffer);
                return ReadOutcome::Failed(e);
            }
        };

        if !gate.admit(request, request.start_frame + frames as u64) {
            debug!(
                "Discarding stale read at frame {} (generation {})",
                request.start_frame, request.generation
            );
            self.pool.discard(buffer);
            return ReadOutcome::Stale;
        }

        buffer.commit(frames, self.sequence, end_of_stream);
        self.sequence += 1;
        self.pool.mark_ready(buffer);

        ReadOutcome::Published {
            frames,
            end_of_stream,
        }
    }
}
