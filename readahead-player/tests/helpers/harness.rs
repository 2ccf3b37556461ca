//! Deterministic drive loop
//!
//! Runs the worker pass and the render cycle alternately on the test thread,
//! so every test sees the same interleaving.

use readahead_player::audio::SampleProvider;
use readahead_player::playback::{
    BufferingWorker, PlaybackController, PlaybackEngine, RenderSupplier, SlotStates,
};
use readahead_player::PlaybackState;

pub struct Harness<P: SampleProvider> {
    pub controller: PlaybackController,
    pub worker: BufferingWorker<P>,
    pub supplier: RenderSupplier,
    pub slot_states: SlotStates,
    out: Vec<f32>,
}

impl<P: SampleProvider> Harness<P> {
    pub fn new(engine: PlaybackEngine<P>, period_frames: usize) -> Self {
        let out = vec![0.0; period_frames * engine.supplier.output_channels()];
        Self {
            controller: engine.controller,
            worker: engine.worker,
            supplier: engine.supplier,
            slot_states: engine.slot_states,
            out,
        }
    }

    /// One render cycle; returns the content samples it produced
    pub fn render(&mut self) -> Vec<f32> {
        let frames = self.supplier.render(&mut self.out);
        self.out[..frames * self.supplier.output_channels()].to_vec()
    }

    /// Full output of one render cycle, silence included
    pub fn render_raw(&mut self) -> (usize, Vec<f32>) {
        let frames = self.supplier.render(&mut self.out);
        (frames, self.out.clone())
    }

    /// Worker pass followed by a render cycle
    pub fn cycle(&mut self) -> Vec<f32> {
        self.worker.service();
        self.render()
    }

    /// Cycle until playback stops; returns all content samples
    pub fn run_until_stopped(&mut self, max_cycles: usize) -> Vec<f32> {
        let mut collected = Vec::new();
        for _ in 0..max_cycles {
            collected.extend(self.cycle());
            if self.controller.state() == PlaybackState::Stopped {
                break;
            }
        }
        collected
    }

    /// Cycle until `frames` content frames were produced
    pub fn run_frames(&mut self, frames: usize, max_cycles: usize) -> Vec<f32> {
        let channels = self.supplier.output_channels();
        let mut collected = Vec::new();
        for _ in 0..max_cycles {
            if collected.len() >= frames * channels {
                break;
            }
            collected.extend(self.cycle());
        }
        collected
    }

    /// Every buffer is in exactly one place: free, ready, or held by render
    pub fn assert_ownership(&self) {
        use readahead_player::audio::BufferState;

        let total = self.slot_states.len();
        let free = self.worker.free_buffers();
        let ready = self.supplier.ready_buffers();
        let held = usize::from(self.supplier.holds_buffer());

        assert_eq!(free + ready + held, total, "buffers lost or duplicated");
        assert_eq!(self.slot_states.count(BufferState::Free), free);
        assert_eq!(self.slot_states.count(BufferState::Ready), ready);
        assert_eq!(self.slot_states.count(BufferState::Consuming), held);
        assert_eq!(self.slot_states.count(BufferState::Filling), 0);
    }
}

/// Assert `samples` is the ramp `start, start + 1, ...`
pub fn assert_ramp(samples: &[f32], start: u64) {
    for (i, &value) in samples.iter().enumerate() {
        assert_eq!(
            value,
            (start + i as u64) as f32,
            "frame {} should be file frame {}",
            i,
            start + i as u64
        );
    }
}
