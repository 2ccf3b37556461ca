//! Buffering worker
//!
//! Runs the scheduler and the file reader on the background side.
//!
//! **Architecture:**
//! - `service()` is one synchronous pass: settle completion, follow the
//!   current generation, issue reads until the scheduler idles, finish a
//!   pending seek, and turn render-side counters into events
//! - `start()` runs passes on the tokio blocking pool, waking on transport
//!   commands or after the poll interval (the render path cannot notify)

use super::controller::TransportCore;
use super::reader::{FileReader, ReadOutcome};
use super::scheduler::BufferingScheduler;
use super::shared::SharedPlayback;
use super::state::TransportState;
use crate::audio::provider::SampleProvider;
use readahead_common::events::PlayerEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Tracks an ongoing run of underrun cycles
struct Stall {
    started: Instant,
    underruns_at_start: u64,
}

pub struct BufferingWorker<P: SampleProvider> {
    core: Arc<TransportCore>,
    reader: FileReader<P>,
    scheduler: BufferingScheduler,
    poll_interval: Duration,

    /// Generation whose end of stream has been announced
    eos_reported: Option<u64>,
    last_underruns: u64,
    last_emitted: u64,
    stall: Option<Stall>,
}

impl<P: SampleProvider> BufferingWorker<P> {
    pub(crate) fn new(
        core: Arc<TransportCore>,
        reader: FileReader<P>,
        scheduler: BufferingScheduler,
        poll_interval: Duration,
    ) -> Self {
        Self {
            core,
            reader,
            scheduler,
            poll_interval,
            eos_reported: None,
            last_underruns: 0,
            last_emitted: 0,
            stall: None,
        }
    }

    pub fn scheduler(&self) -> &BufferingScheduler {
        &self.scheduler
    }

    /// Buffers the reader can fill right now
    pub fn free_buffers(&self) -> usize {
        self.reader.free_count()
    }

    /// Run one buffering pass
    ///
    /// Returns the number of buffers published.
    pub fn service(&mut self) -> usize {
        self.core.settle();

        let shared = Arc::clone(&self.core.shared);
        let generation = shared.generation();
        if generation != self.scheduler.generation() {
            debug!("Worker following generation {}", generation);
            self.scheduler.reanchor(generation, shared.anchor());
        }

        let published = match shared.state() {
            TransportState::Stopped => 0,
            _ => self.fill(&shared),
        };

        if shared.state().is_seeking() && self.scheduler.generation() == shared.generation() {
            let position = shared.position();
            if self.scheduler.is_primed(position) {
                self.core.anchored(
                    self.scheduler.generation(),
                    self.scheduler.look_ahead(position),
                );
            }
        }

        self.observe_render(&shared);
        self.core.settle();
        published
    }

    /// Issue reads until the scheduler idles
    fn fill(&mut self, shared: &SharedPlayback) -> usize {
        let core = Arc::clone(&self.core);
        let mut published = 0;

        // Never more reads per pass than there are buffers
        for _ in 0..=self.reader.buffer_count() {
            // Free count first: once every buffer is back, the render
            // cursor it published before releasing them is final
            let free = self.reader.free_count();
            let position = shared.position();
            self.scheduler
                .recover_lost_range(position, free, self.reader.buffer_count());

            let Some(request) = self
                .scheduler
                .next_request(position, free, shared.length_frames())
            else {
                break;
            };

            debug!(
                "Read request: {} frames at {} (generation {})",
                request.frames, request.start_frame, request.generation
            );
            let outcome = self.reader.read(&request, core.as_ref());
            self.scheduler.complete(&request, &outcome);

            match outcome {
                ReadOutcome::Published {
                    frames,
                    end_of_stream,
                } => {
                    published += 1;
                    if end_of_stream {
                        let end = request.start_frame + frames as u64;
                        self.end_of_stream(shared, request.generation, end);
                    }
                }
                ReadOutcome::NoBuffer | ReadOutcome::Stale => break,
                ReadOutcome::Failed(e) => {
                    self.core.fail(request.generation, e);
                    break;
                }
            }
        }

        published
    }

    fn end_of_stream(&mut self, shared: &SharedPlayback, generation: u64, frame: u64) {
        if shared.length_frames().is_none() {
            shared.set_length_frames(frame);
        }
        if self.eos_reported == Some(generation) {
            return;
        }
        self.eos_reported = Some(generation);
        info!("End of stream reached at frame {}", frame);
        self.core.events.emit_lossy(PlayerEvent::EndOfStream {
            frame,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Publish underrun events from the render-side counters
    fn observe_render(&mut self, shared: &SharedPlayback) {
        let underruns = shared.underruns();
        let emitted = shared.frames_emitted();

        if underruns > self.last_underruns {
            if self.stall.is_none() {
                debug!("Underrun at frame {}", shared.position());
                self.stall = Some(Stall {
                    started: Instant::now(),
                    underruns_at_start: self.last_underruns,
                });
                self.core.events.emit_lossy(PlayerEvent::Underrun {
                    underrun_count: underruns,
                    frame: shared.position(),
                    timestamp: chrono::Utc::now(),
                });
            }
        } else if emitted > self.last_emitted {
            if let Some(stall) = self.stall.take() {
                let underrun_cycles = underruns - stall.underruns_at_start;
                let recovery_time_ms = stall.started.elapsed().as_millis() as u64;
                info!(
                    "Recovered from underrun after {} cycles ({} ms)",
                    underrun_cycles, recovery_time_ms
                );
                self.core.events.emit_lossy(PlayerEvent::UnderrunRecovered {
                    underrun_cycles,
                    recovery_time_ms,
                    timestamp: chrono::Utc::now(),
                });
            }
        }

        self.last_underruns = underruns;
        self.last_emitted = emitted;
    }
}

impl<P: SampleProvider + 'static> BufferingWorker<P> {
    /// Run the worker on the current tokio runtime
    pub fn start(self) -> WorkerHandle {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let wake = Arc::clone(&self.core.wake);
        let poll_interval = self.poll_interval;

        let task = {
            let stop_flag = Arc::clone(&stop_flag);
            let wake = Arc::clone(&wake);
            tokio::spawn(async move {
                info!("Buffering worker started");
                let mut worker = self;
                while !stop_flag.load(Ordering::Relaxed) {
                    worker = match tokio::task::spawn_blocking(move || {
                        worker.service();
                        worker
                    })
                    .await
                    {
                        Ok(worker) => worker,
                        Err(e) => {
                            error!("Buffering pass failed: {}", e);
                            return;
                        }
                    };

                    tokio::select! {
                        _ = wake.notified() => {}
                        _ = tokio::time::sleep(poll_interval) => {}
                    }
                }
                info!("Buffering worker stopped");
            })
        };

        WorkerHandle {
            stop_flag,
            wake,
            task,
        }
    }
}

/// Handle to a running buffering worker
pub struct WorkerHandle {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop the worker and wait for the current pass to finish
    pub async fn shutdown(self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.wake.notify_one();
        if let Err(e) = self.task.await {
            error!("Buffering worker task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
