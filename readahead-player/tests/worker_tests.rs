//! Background worker tests
//!
//! Run the worker on the tokio runtime with the render supplier on its own
//! thread, the way a real audio callback would drive it.

mod helpers;

use helpers::harness::assert_ramp;
use helpers::{ramp_config, ramp_engine};
use readahead_player::audio::MemoryProvider;
use readahead_player::playback::{PlaybackEngine, RenderSupplier, TransportState};
use readahead_player::{PlaybackState, PlayerEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::time::timeout;

/// Render `period` frames roughly every millisecond until told to stop
fn spawn_render_thread(
    mut supplier: RenderSupplier,
    period: usize,
    running: Arc<AtomicBool>,
) -> JoinHandle<Vec<f32>> {
    std::thread::spawn(move || {
        let mut out = vec![0.0f32; period * supplier.output_channels()];
        let mut collected = Vec::new();
        while running.load(Ordering::Relaxed) {
            let frames = supplier.render(&mut out);
            collected.extend_from_slice(&out[..frames * supplier.output_channels()]);
            std::thread::sleep(Duration::from_millis(1));
        }
        collected
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_plays_file_with_background_worker() {
    let PlaybackEngine {
        controller,
        worker,
        supplier,
        ..
    } = ramp_engine(8, 1024, 44_100);
    let mut rx = controller.subscribe();

    let handle = worker.start();
    let running = Arc::new(AtomicBool::new(true));
    let render = spawn_render_thread(supplier, 256, Arc::clone(&running));

    controller.play().unwrap();

    let finished = timeout(Duration::from_secs(20), async {
        loop {
            match rx.recv().await {
                Ok(PlayerEvent::PlaybackFinished { frame, .. }) => return frame,
                Ok(_) => {}
                Err(e) => panic!("event stream failed: {}", e),
            }
        }
    })
    .await
    .expect("playback did not finish");

    running.store(false, Ordering::Relaxed);
    let samples = render.join().unwrap();
    handle.shutdown().await;

    assert_eq!(finished, 44_100);
    assert_eq!(samples.len(), 44_100);
    assert_ramp(&samples, 0);
    assert_eq!(controller.state(), PlaybackState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_playback_from_seek_position() {
    let PlaybackEngine {
        controller,
        worker,
        supplier,
        ..
    } = ramp_engine(4, 1024, 30_000);
    let mut rx = controller.subscribe();

    let handle = worker.start();
    let running = Arc::new(AtomicBool::new(true));
    let render = spawn_render_thread(supplier, 256, Arc::clone(&running));

    controller.seek(20_000).unwrap();
    controller.play().unwrap();

    timeout(Duration::from_secs(20), async {
        loop {
            if let Ok(PlayerEvent::PlaybackFinished { .. }) = rx.recv().await {
                return;
            }
        }
    })
    .await
    .expect("playback did not finish");

    running.store(false, Ordering::Relaxed);
    let samples = render.join().unwrap();
    handle.shutdown().await;

    assert_eq!(samples.len(), 10_000);
    assert_ramp(&samples, 20_000);
}

#[tokio::test]
async fn test_worker_shutdown() {
    let engine = ramp_engine(4, 1024, 10_000);
    let handle = engine.worker.start();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!handle.is_finished());

    timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("worker did not stop");
}

#[tokio::test]
async fn test_command_wakes_idle_worker() {
    // Polling alone would take a minute to notice the play command
    let config = readahead_player::BufferingConfig {
        poll_interval_ms: 60_000,
        ..ramp_config(4, 1024)
    };
    let engine = PlaybackEngine::build(&config, MemoryProvider::ramp(10_000, 1)).unwrap();
    let controller = engine.controller.clone();
    let handle = engine.worker.start();

    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.play().unwrap();

    timeout(Duration::from_secs(5), async {
        while controller.transport_state() != TransportState::Playing {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker did not react to play");

    timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("worker did not stop");
}
