//! Buffered playback pipeline
//!
//! Bridges the background file reader with the real-time render callback:
//!
//! ```text
//! PlaybackController ──(generation, anchor, state)──► SharedPlayback
//!                                                        │
//! BufferingWorker: BufferingScheduler + FileReader ──► ready queue ──► RenderSupplier
//!                          ▲                                              │
//!                          └──────────────── free queue ◄─────────────────┘
//! ```

pub mod channel_map;
pub mod controller;
pub mod diagnostics;
pub mod engine;
pub mod pool;
pub mod reader;
pub mod render;
pub mod scheduler;
pub mod shared;
pub mod state;
pub mod worker;

pub use channel_map::{ChannelMapReceiver, ChannelMapSender};
pub use controller::PlaybackController;
pub use diagnostics::PlaybackStats;
pub use engine::PlaybackEngine;
pub use pool::{BufferPool, PoolReader, PoolWriter, SlotStates};
pub use reader::{FileReader, ReadOutcome};
pub use render::RenderSupplier;
pub use scheduler::{BufferingScheduler, ReadRequest};
pub use shared::SharedPlayback;
pub use state::{Command, TransportContext, TransportState};
pub use worker::{BufferingWorker, WorkerHandle};
