//! Playback statistics snapshot

use readahead_common::PlaybackState;
use serde::Serialize;

/// Point-in-time view of the buffering pipeline
///
/// Fields are read from independent atomics, so a snapshot taken during
/// playback may mix values from adjacent render cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackStats {
    pub state: PlaybackState,
    /// A re-anchor is still buffering
    pub seeking: bool,
    pub generation: u64,
    pub position_frames: u64,
    pub read_cursor_frames: u64,
    pub look_ahead_frames: u64,
    /// Pool capacity (buffers x frames per buffer)
    pub capacity_frames: u64,
    /// Frames handed to the render clock while playing, silence included
    pub output_clock_frames: u64,
    pub frames_emitted: u64,
    pub underruns: u64,
    pub length_frames: Option<u64>,
    pub error: bool,
}

impl PlaybackStats {
    /// Look-ahead as a fraction of pool capacity
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity_frames == 0 {
            return 0.0;
        }
        self.look_ahead_frames as f64 / self.capacity_frames as f64
    }
}
