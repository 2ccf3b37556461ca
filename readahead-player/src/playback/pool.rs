//! Frame buffer pool
//!
//! Owns N pre-allocated frame buffers and two lock-free single-producer
//! single-consumer queues:
//!
//! - **free path**: render supplier → reader
//! - **ready path**: reader → render supplier
//!
//! Buffers move by value, so a buffer is always held by exactly one of: the
//! free queue (or the reader's spare list), the reader while filling, the
//! ready queue, or the render supplier while consuming. Both queues have
//! capacity N, so a push can never find a queue full.
//!
//! A shared slot-state table mirrors each buffer's state for observation from
//! any thread. It is written only by whichever side currently owns the buffer.

use crate::audio::types::{BufferState, FrameBuffer};
use crate::error::{Error, Result};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Observable per-slot buffer state
#[derive(Debug, Clone)]
pub struct SlotStates {
    slots: Arc<[AtomicU8]>,
}

impl SlotStates {
    fn new(count: usize) -> Self {
        let slots: Vec<AtomicU8> = (0..count)
            .map(|_| AtomicU8::new(BufferState::Free as u8))
            .collect();
        Self {
            slots: slots.into(),
        }
    }

    fn set(&self, slot: usize, state: BufferState) {
        self.slots[slot].store(state as u8, Ordering::Release);
    }

    /// Current state of one slot
    pub fn get(&self, slot: usize) -> BufferState {
        BufferState::from_u8(self.slots[slot].load(Ordering::Acquire))
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots currently in `state`
    pub fn count(&self, state: BufferState) -> usize {
        (0..self.len()).filter(|&slot| self.get(slot) == state).count()
    }

    /// States of all slots
    pub fn snapshot(&self) -> Vec<BufferState> {
        (0..self.len()).map(|slot| self.get(slot)).collect()
    }
}

/// Pool of frame buffers, before splitting into its two halves
pub struct BufferPool {
    writer: PoolWriter,
    reader: PoolReader,
}

impl BufferPool {
    /// Allocate `count` buffers of `frames_per_buffer` frames each
    ///
    /// All allocation happens here; nothing on either side allocates later.
    pub fn new(count: usize, frames_per_buffer: usize, channels: usize) -> Result<Self> {
        if count < 2 {
            return Err(Error::Config(format!(
                "Buffer pool needs at least 2 buffers (got {})",
                count
            )));
        }
        if frames_per_buffer == 0 || channels == 0 {
            return Err(Error::Config(
                "Buffer pool needs non-zero frames per buffer and channels".to_string(),
            ));
        }

        debug!(
            "Creating buffer pool: {} buffers x {} frames x {} channels",
            count, frames_per_buffer, channels
        );

        let states = SlotStates::new(count);
        let (mut free_prod, free_cons) = HeapRb::<FrameBuffer>::new(count).split();
        let (ready_prod, ready_cons) = HeapRb::<FrameBuffer>::new(count).split();

        for slot in 0..count {
            let buffer = FrameBuffer::new(slot, frames_per_buffer, channels);
            if free_prod.try_push(buffer).is_err() {
                return Err(Error::Internal("Free queue rejected initial buffer".to_string()));
            }
        }

        Ok(Self {
            writer: PoolWriter {
                free: free_cons,
                ready: ready_prod,
                spare: Vec::with_capacity(count),
                states: states.clone(),
                count,
                frames_per_buffer,
            },
            reader: PoolReader {
                ready: ready_cons,
                free: free_prod,
                states,
            },
        })
    }

    /// Observable slot-state table
    pub fn slot_states(&self) -> SlotStates {
        self.writer.states.clone()
    }

    /// Split into the reader-side and render-side halves
    ///
    /// Each half can be moved to a different thread.
    pub fn split(self) -> (PoolWriter, PoolReader) {
        (self.writer, self.reader)
    }
}

/// Reader-side half: takes free buffers, publishes ready ones
pub struct PoolWriter {
    free: HeapCons<FrameBuffer>,
    ready: HeapProd<FrameBuffer>,

    /// Buffers the reader took but did not publish
    ///
    /// Still free; re-used before the free queue so the free path keeps a
    /// single producer.
    spare: Vec<FrameBuffer>,

    states: SlotStates,
    count: usize,
    frames_per_buffer: usize,
}

impl PoolWriter {
    /// Take a free buffer for filling
    pub fn acquire_free(&mut self) -> Option<FrameBuffer> {
        let mut buffer = self.spare.pop().or_else(|| self.free.try_pop())?;
        buffer.set_state(BufferState::Filling);
        self.states.set(buffer.slot(), BufferState::Filling);
        Some(buffer)
    }

    /// Publish a filled buffer to the render supplier
    pub fn mark_ready(&mut self, mut buffer: FrameBuffer) {
        buffer.set_state(BufferState::Ready);
        self.states.set(buffer.slot(), BufferState::Ready);
        if let Err(buffer) = self.ready.try_push(buffer) {
            debug_assert!(false, "ready queue holds every buffer");
            self.discard(buffer);
        }
    }

    /// Abandon a buffer without publishing it
    pub fn discard(&mut self, mut buffer: FrameBuffer) {
        buffer.set_state(BufferState::Free);
        self.states.set(buffer.slot(), BufferState::Free);
        self.spare.push(buffer);
    }

    /// Buffers available to `acquire_free`
    pub fn free_count(&self) -> usize {
        self.spare.len() + self.free.occupied_len()
    }

    /// Total buffers in the pool
    pub fn buffer_count(&self) -> usize {
        self.count
    }

    pub fn frames_per_buffer(&self) -> usize {
        self.frames_per_buffer
    }

    pub fn slot_states(&self) -> &SlotStates {
        &self.states
    }
}

/// Render-side half: takes ready buffers, returns consumed ones
///
/// Every method is wait-free and allocation-free.
pub struct PoolReader {
    ready: HeapCons<FrameBuffer>,
    free: HeapProd<FrameBuffer>,
    states: SlotStates,
}

impl PoolReader {
    /// Take the oldest ready buffer
    pub fn acquire_ready(&mut self) -> Option<FrameBuffer> {
        let mut buffer = self.ready.try_pop()?;
        buffer.set_state(BufferState::Consuming);
        self.states.set(buffer.slot(), BufferState::Consuming);
        Some(buffer)
    }

    /// Return a consumed (or stale) buffer to the free queue
    pub fn release(&mut self, mut buffer: FrameBuffer) {
        buffer.set_state(BufferState::Free);
        self.states.set(buffer.slot(), BufferState::Free);
        let pushed = self.free.try_push(buffer).is_ok();
        debug_assert!(pushed, "free queue holds every buffer");
    }

    /// Buffers waiting in the ready queue
    pub fn ready_count(&self) -> usize {
        self.ready.occupied_len()
    }
}
