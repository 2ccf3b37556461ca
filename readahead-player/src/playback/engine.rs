//! Playback engine assembly
//!
//! Builds the pool, shared block, controller, worker and render supplier for
//! one provider and hands the three endpoints to the caller:
//!
//! - `controller`: cloneable, any control thread
//! - `worker`: background side, usually started on the tokio runtime
//! - `supplier`: real-time side, moved into the render callback

use super::channel_map::channel_map_queue;
use super::controller::{PlaybackController, TransportCore};
use super::pool::{BufferPool, SlotStates};
use super::reader::FileReader;
use super::render::RenderSupplier;
use super::scheduler::BufferingScheduler;
use super::shared::SharedPlayback;
use super::worker::BufferingWorker;
use crate::audio::provider::SampleProvider;
use crate::config::BufferingConfig;
use crate::error::{Error, Result};
use readahead_common::events::EventBus;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct PlaybackEngine<P: SampleProvider> {
    pub controller: PlaybackController,
    pub worker: BufferingWorker<P>,
    pub supplier: RenderSupplier,
    pub slot_states: SlotStates,
}

impl<P: SampleProvider> PlaybackEngine<P> {
    /// Assemble a player for `provider`
    ///
    /// Fails if the configuration is invalid or the provider's channel count
    /// differs from `config.channels`.
    pub fn build(config: &BufferingConfig, provider: P) -> Result<Self> {
        config.validate()?;

        if provider.channels() != config.channels {
            return Err(Error::Config(format!(
                "Provider has {} channels, configuration expects {}",
                provider.channels(),
                config.channels
            )));
        }

        let length = provider.length_frames();
        info!(
            "Building playback engine: {} buffers x {} frames, {} channels, length {:?}",
            config.buffer_count, config.frames_per_buffer, config.channels, length
        );

        let pool = BufferPool::new(config.buffer_count, config.frames_per_buffer, config.channels)?;
        let slot_states = pool.slot_states();
        let (writer, reader) = pool.split();

        let shared = Arc::new(SharedPlayback::new(length));
        let events = Arc::new(EventBus::new(config.event_capacity));
        let (maps, map_receiver) = channel_map_queue(config.channels, config.channel_map.clone());
        let core = Arc::new(TransportCore::new(
            Arc::clone(&shared),
            events,
            config.buffer_count,
            config.frames_per_buffer,
            maps,
        ));

        let worker = BufferingWorker::new(
            Arc::clone(&core),
            FileReader::new(provider, writer),
            BufferingScheduler::new(config),
            Duration::from_millis(config.poll_interval_ms.max(1)),
        );
        let supplier = RenderSupplier::new(reader, shared, config.channels, map_receiver);

        Ok(Self {
            controller: PlaybackController::new(core),
            worker,
            supplier,
            slot_states,
        })
    }
}
