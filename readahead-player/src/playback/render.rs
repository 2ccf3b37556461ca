//! Render supplier
//!
//! Called once per render cycle from the real-time audio context. Everything
//! here is wait-free: no locks, no allocation, no logging, no I/O. It talks to
//! the rest of the player only through the pool's SPSC queues and the shared
//! atomics.
//!
//! Per cycle:
//! 1. adopt a pending channel map, if any
//! 2. load transport state, then generation
//! 3. on a new generation, drop the held buffer, jump to the new anchor and
//!    reload the state the controller stores after the bump
//! 4. not playing: emit silence (stale buffers are still recycled)
//! 5. playing: copy frames from ready buffers that continue the stream
//!    exactly at the cursor; fill any shortfall with silence and count one
//!    underrun unless the end of the file has drained or the cycle resynced

use super::channel_map::ChannelMapReceiver;
use super::pool::PoolReader;
use super::shared::SharedPlayback;
use super::state::TransportState;
use crate::audio::types::FrameBuffer;
use std::sync::Arc;

pub struct RenderSupplier {
    pool: PoolReader,
    shared: Arc<SharedPlayback>,

    /// Buffer being emitted
    current: Option<FrameBuffer>,
    /// Next frame within `current`
    frame_pos: usize,

    generation: u64,
    /// File offset of the next content frame
    cursor: u64,
    /// End-of-stream buffer of this generation fully emitted
    drained: bool,

    channel_maps: ChannelMapReceiver,
    out_channels: usize,
}

impl RenderSupplier {
    pub(crate) fn new(
        pool: PoolReader,
        shared: Arc<SharedPlayback>,
        channels: usize,
        channel_maps: ChannelMapReceiver,
    ) -> Self {
        let out_channels = channel_maps.current().map_or(channels, <[usize]>::len);
        let generation = shared.generation();
        let cursor = shared.anchor();
        shared.publish_render_sync(generation, cursor);
        Self {
            pool,
            shared,
            current: None,
            frame_pos: 0,
            generation,
            cursor,
            drained: false,
            channel_maps,
            out_channels,
        }
    }

    /// Samples per output frame
    pub fn output_channels(&self) -> usize {
        self.out_channels
    }

    /// Buffers waiting in the ready queue
    pub fn ready_buffers(&self) -> usize {
        self.pool.ready_count()
    }

    /// True while a buffer is held for emitting
    pub fn holds_buffer(&self) -> bool {
        self.current.is_some()
    }

    /// Fill `out` (interleaved) for one render cycle
    ///
    /// Returns the number of content frames written; the rest is silence.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        self.channel_maps.pull();

        let mut state = self.shared.state();
        let generation = self.shared.generation();
        let resynced = generation != self.generation;
        if resynced {
            self.resync(generation);
            // The state loaded above may predate the bump
            state = self.shared.state();
        }

        let frames = out.len() / self.out_channels;

        if state != TransportState::Playing {
            if self.current.is_none() && !self.drained {
                self.next_buffer();
            }
            out.fill(0.0);
            return 0;
        }

        let mut written = 0;
        let mut interrupted = resynced;

        while written < frames && !self.drained {
            if self.current.is_none() {
                match self.next_buffer() {
                    NextBuffer::Ready => {}
                    NextBuffer::Empty => break,
                    NextBuffer::Resynced => {
                        interrupted = true;
                        break;
                    }
                }
            }

            let Some(buffer) = self.current.as_ref() else {
                break;
            };

            let available = buffer.valid_frames() - self.frame_pos;
            let n = available.min(frames - written);
            if n > 0 {
                copy_frames(
                    buffer,
                    self.frame_pos,
                    n,
                    &mut out[written * self.out_channels..(written + n) * self.out_channels],
                    self.channel_maps.current(),
                );
                self.frame_pos += n;
                written += n;
                self.cursor += n as u64;
                self.shared.publish_stream_cursor(self.cursor);
            }

            if self.frame_pos >= buffer.valid_frames() {
                self.finish_current();
            }
        }

        out[written * self.out_channels..].fill(0.0);

        self.shared.add_clock_frames(frames as u64);
        self.shared.add_frames_emitted(written as u64);
        if written < frames && !self.drained && !interrupted {
            self.shared.record_underrun();
        }

        written
    }

    /// Jump to a new generation's anchor
    fn resync(&mut self, generation: u64) {
        if let Some(buffer) = self.current.take() {
            self.pool.release(buffer);
        }
        self.frame_pos = 0;
        self.generation = generation;
        self.cursor = self.shared.anchor();
        self.drained = false;
        self.shared.publish_render_sync(generation, self.cursor);
    }

    /// Take the next ready buffer that continues the stream at the cursor
    ///
    /// Stale or out-of-place buffers are returned to the pool unread.
    fn next_buffer(&mut self) -> NextBuffer {
        while let Some(buffer) = self.pool.acquire_ready() {
            if buffer.generation() > self.generation {
                // Published for a generation this cycle has not loaded yet
                self.resync(buffer.generation());
                if buffer.start_frame() == self.cursor {
                    self.current = Some(buffer);
                } else {
                    self.pool.release(buffer);
                }
                return NextBuffer::Resynced;
            }

            if buffer.generation() == self.generation && buffer.start_frame() == self.cursor {
                self.frame_pos = 0;
                self.current = Some(buffer);
                return NextBuffer::Ready;
            }

            self.pool.release(buffer);
        }
        NextBuffer::Empty
    }

    /// Return the exhausted buffer; note when it was the last one
    fn finish_current(&mut self) {
        if let Some(buffer) = self.current.take() {
            let end_of_stream = buffer.is_end_of_stream();
            self.pool.release(buffer);
            self.frame_pos = 0;
            if end_of_stream {
                self.drained = true;
                self.shared.mark_drained(self.generation);
            }
        }
    }
}

enum NextBuffer {
    Ready,
    Empty,
    Resynced,
}

/// Copy `n` frames starting at `from` into `out`
fn copy_frames(
    buffer: &FrameBuffer,
    from: usize,
    n: usize,
    out: &mut [f32],
    channel_map: Option<&[usize]>,
) {
    let channels = buffer.channels();
    match channel_map {
        None => {
            out.copy_from_slice(&buffer.samples()[from * channels..(from + n) * channels]);
        }
        Some(map) => {
            for (i, frame_out) in out.chunks_exact_mut(map.len()).enumerate() {
                let frame = buffer.frame(from + i);
                for (sample, &source) in frame_out.iter_mut().zip(map) {
                    *sample = frame.get(source).copied().unwrap_or(0.0);
                }
            }
        }
    }
}
