//! Buffering scheduler
//!
//! Decides when the reader should fetch more data. Look-ahead is the distance
//! between the read cursor (frames requested so far) and the render position.
//!
//! **Hysteresis:**
//! - look-ahead below the low-water mark starts a refill
//! - a refill issues strictly sequential requests until the high-water mark
//!   is reached, no free buffer is left, or the end of the file is found
//! - then the scheduler idles until look-ahead drops below low water again
//!
//! A run is primed (playable) once look-ahead reaches the low-water mark or
//! the end of the file has been read.
//!
//! After end-of-file or a read failure no further requests are issued until
//! the next re-anchor.

use super::reader::ReadOutcome;
use crate::config::BufferingConfig;
use tracing::{debug, warn};

/// One unit of read work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// Generation the data is read for
    pub generation: u64,
    /// File frame offset to start at
    pub start_frame: u64,
    /// Frames to read (at most one buffer)
    pub frames: usize,
}

#[derive(Debug)]
pub struct BufferingScheduler {
    low_water: u64,
    high_water: u64,
    frames_per_buffer: usize,

    generation: u64,
    read_cursor: u64,
    refilling: bool,
    end_of_stream: bool,
    failed: bool,
}

impl BufferingScheduler {
    pub fn new(config: &BufferingConfig) -> Self {
        Self {
            low_water: config.low_water(),
            high_water: config.high_water(),
            frames_per_buffer: config.frames_per_buffer,
            generation: 0,
            read_cursor: 0,
            refilling: false,
            end_of_stream: false,
            failed: false,
        }
    }

    /// Start a new buffering run at `anchor`
    pub fn reanchor(&mut self, generation: u64, anchor: u64) {
        debug!(
            "Scheduler re-anchored: generation {} at frame {}",
            generation, anchor
        );
        self.generation = generation;
        self.read_cursor = anchor;
        self.refilling = false;
        self.end_of_stream = false;
        self.failed = false;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn read_cursor(&self) -> u64 {
        self.read_cursor
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_refilling(&self) -> bool {
        self.refilling
    }

    /// Frames buffered (or requested) beyond the render position
    pub fn look_ahead(&self, render_cursor: u64) -> u64 {
        self.read_cursor.saturating_sub(render_cursor)
    }

    /// Next read to issue, if any
    pub fn next_request(
        &mut self,
        render_cursor: u64,
        free_buffers: usize,
        length: Option<u64>,
    ) -> Option<ReadRequest> {
        if self.end_of_stream || self.failed {
            return None;
        }

        let look_ahead = self.look_ahead(render_cursor);
        if !self.refilling {
            if look_ahead >= self.low_water {
                return None;
            }
            debug!(
                "Refill started: look-ahead {} below low water {}",
                look_ahead, self.low_water
            );
            self.refilling = true;
        }

        if look_ahead >= self.high_water || free_buffers == 0 {
            debug!(
                "Refill paused: look-ahead {}, free buffers {}",
                look_ahead, free_buffers
            );
            self.refilling = false;
            return None;
        }

        let frames = match length {
            Some(len) if self.read_cursor < len => {
                (len - self.read_cursor).min(self.frames_per_buffer as u64) as usize
            }
            _ => self.frames_per_buffer,
        };

        Some(ReadRequest {
            generation: self.generation,
            start_frame: self.read_cursor,
            frames,
        })
    }

    /// Account for a finished read
    pub fn complete(&mut self, request: &ReadRequest, outcome: &ReadOutcome) {
        if request.generation != self.generation {
            return;
        }

        match outcome {
            ReadOutcome::Published {
                frames,
                end_of_stream,
            } => {
                self.read_cursor = request.start_frame + *frames as u64;
                if *end_of_stream {
                    debug!("End of stream at frame {}", self.read_cursor);
                    self.end_of_stream = true;
                    self.refilling = false;
                }
            }
            ReadOutcome::NoBuffer => {
                self.refilling = false;
            }
            ReadOutcome::Stale => {}
            ReadOutcome::Failed(_) => {
                self.failed = true;
                self.refilling = false;
            }
        }
    }

    /// Pull the read cursor back when buffered data vanished
    ///
    /// With every buffer free there is nothing buffered, so any gap between
    /// the read cursor and the render position was lost (for example a
    /// buffer dropped by the render side as stale). Returns true when the
    /// cursor moved.
    pub fn recover_lost_range(
        &mut self,
        render_cursor: u64,
        free_buffers: usize,
        buffer_count: usize,
    ) -> bool {
        if free_buffers < buffer_count || self.read_cursor == render_cursor || self.failed {
            return false;
        }
        if self.end_of_stream && self.read_cursor <= render_cursor {
            return false;
        }

        warn!(
            "Lost buffered range {}..{}, re-reading from {}",
            render_cursor.min(self.read_cursor),
            self.read_cursor.max(render_cursor),
            render_cursor
        );
        self.read_cursor = render_cursor;
        self.end_of_stream = false;
        self.refilling = false;
        true
    }

    /// True when the current run has enough data to start rendering
    ///
    /// Buffers still holding data from an older generation do not count;
    /// the render supplier recycles them while the transport is seeking.
    pub fn is_primed(&self, render_cursor: u64) -> bool {
        if self.failed {
            return false;
        }
        self.end_of_stream || self.look_ahead(render_cursor) >= self.low_water
    }
}
