//! Frame buffer types
//!
//! A `FrameBuffer` is the unit handed between the file reader and the render
//! supplier. Storage is allocated once when the pool is built and reused for
//! the lifetime of the player; buffers move by value through the pool queues,
//! so whoever holds one owns it exclusively.

/// Ownership state of a frame buffer slot
///
/// Mirrored into the pool's slot-state table so any thread can observe where
/// each buffer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BufferState {
    /// In the free queue or parked as a reader-side spare
    Free = 0,
    /// Held by the reader while decoded data is written into it
    Filling = 1,
    /// Published to the ready queue, waiting for the render supplier
    Ready = 2,
    /// Held by the render supplier while its frames are emitted
    Consuming = 3,
}

impl BufferState {
    /// Decode a slot-state tag
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => BufferState::Filling,
            2 => BufferState::Ready,
            3 => BufferState::Consuming,
            _ => BufferState::Free,
        }
    }
}

/// Fixed-capacity block of decoded interleaved frames
#[derive(Debug)]
pub struct FrameBuffer {
    /// Pool slot this buffer occupies
    slot: usize,

    /// Interleaved sample storage (`capacity_frames * channels`)
    samples: Box<[f32]>,

    /// Samples per frame
    channels: usize,

    /// Frames holding decoded data
    valid_frames: usize,

    /// File frame offset of the first frame
    start_frame: u64,

    /// Order in which the reader published this buffer
    sequence: u64,

    /// Generation the data was read for
    generation: u64,

    /// Last buffer of the file
    end_of_stream: bool,

    /// Current ownership state
    state: BufferState,
}

impl FrameBuffer {
    /// Allocate a free buffer for `slot`
    pub fn new(slot: usize, capacity_frames: usize, channels: usize) -> Self {
        Self {
            slot,
            samples: vec![0.0; capacity_frames * channels].into_boxed_slice(),
            channels,
            valid_frames: 0,
            start_frame: 0,
            sequence: 0,
            generation: 0,
            end_of_stream: false,
            state: BufferState::Free,
        }
    }

    /// Reset metadata for a new read and return the writable sample region
    ///
    /// The returned slice covers the whole buffer; the caller reports how many
    /// frames it filled through `commit`.
    pub fn prepare(&mut self, generation: u64, start_frame: u64) -> &mut [f32] {
        self.generation = generation;
        self.start_frame = start_frame;
        self.valid_frames = 0;
        self.end_of_stream = false;
        &mut self.samples
    }

    /// Record the result of a read into this buffer
    pub fn commit(&mut self, frames: usize, sequence: u64, end_of_stream: bool) {
        self.valid_frames = frames.min(self.capacity_frames());
        self.sequence = sequence;
        self.end_of_stream = end_of_stream;
    }

    /// Pool slot index
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Capacity in frames
    pub fn capacity_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Samples per frame
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames holding decoded data
    pub fn valid_frames(&self) -> usize {
        self.valid_frames
    }

    /// File frame offset of the first frame
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// File frame offset one past the last valid frame
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.valid_frames as u64
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: BufferState) {
        self.state = state;
    }

    /// Valid interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.valid_frames * self.channels]
    }

    /// Interleaved samples of one frame
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.channels;
        &self.samples[start..start + self.channels]
    }
}
