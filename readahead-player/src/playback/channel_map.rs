//! Channel map hand-off
//!
//! Carries channel map changes from control threads to the render supplier
//! without locks on the render side. Two SPSC queues:
//!
//! - **updates**: control → render, the new map
//! - **retired**: render → control, the map it replaced
//!
//! Maps are allocated and freed on the control side only; the render side
//! just swaps boxes.

use crate::error::{Error, Result};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use tracing::debug;

/// `None` passes buffer channels straight through
pub type ChannelMap = Option<Box<[usize]>>;

/// Updates that may be queued before the render side picks them up
const PENDING_UPDATES: usize = 4;

/// Create a connected sender/receiver pair
pub fn channel_map_queue(
    source_channels: usize,
    initial: Option<Vec<usize>>,
) -> (ChannelMapSender, ChannelMapReceiver) {
    let output_channels = initial.as_ref().map_or(source_channels, Vec::len);
    let (updates_prod, updates_cons) = HeapRb::<ChannelMap>::new(PENDING_UPDATES).split();
    // Every queued update can come back, plus the map replaced first
    let (retired_prod, retired_cons) = HeapRb::<ChannelMap>::new(PENDING_UPDATES + 1).split();

    (
        ChannelMapSender {
            updates: updates_prod,
            retired: retired_cons,
            source_channels,
            output_channels,
        },
        ChannelMapReceiver {
            updates: updates_cons,
            retired: retired_prod,
            current: initial.map(Vec::into_boxed_slice),
        },
    )
}

/// Control side
pub struct ChannelMapSender {
    updates: HeapProd<ChannelMap>,
    retired: HeapCons<ChannelMap>,
    source_channels: usize,
    output_channels: usize,
}

impl ChannelMapSender {
    /// Queue `map` for the render side
    ///
    /// The output channel count is fixed when the engine is built, so the
    /// new map must produce the same number of channels. Source indexes past
    /// the buffer's channel count render as silence.
    pub fn send(&mut self, map: Option<Vec<usize>>) -> Result<()> {
        let produces = map.as_ref().map_or(self.source_channels, Vec::len);
        if produces != self.output_channels {
            return Err(Error::Config(format!(
                "Channel map produces {} channels, output has {}",
                produces, self.output_channels
            )));
        }

        self.collect_retired();
        if self.updates.try_push(map.map(Vec::into_boxed_slice)).is_err() {
            return Err(Error::Internal(format!(
                "{} channel map updates already pending",
                PENDING_UPDATES
            )));
        }
        debug!("Queued channel map update");
        Ok(())
    }

    /// Free maps the render side has replaced
    fn collect_retired(&mut self) {
        let dropped = self.retired.pop_iter().count();
        if dropped > 0 {
            debug!("Released {} retired channel maps", dropped);
        }
    }
}

/// Render side
pub struct ChannelMapReceiver {
    updates: HeapCons<ChannelMap>,
    retired: HeapProd<ChannelMap>,
    current: ChannelMap,
}

impl ChannelMapReceiver {
    /// Adopt the newest queued map, if any
    ///
    /// Wait-free. Returns true if the map changed.
    pub fn pull(&mut self) -> bool {
        let mut changed = false;
        while let Some(map) = self.updates.try_pop() {
            let old = std::mem::replace(&mut self.current, map);
            // Capacity covers every update plus the first map; a failed push
            // would drop the map here, which is never reached
            let _ = self.retired.try_push(old);
            changed = true;
        }
        changed
    }

    pub fn current(&self) -> Option<&[usize]> {
        self.current.as_deref()
    }
}
