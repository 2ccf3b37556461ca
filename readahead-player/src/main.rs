//! Readahead Player (readahead-player) - Main entry point
//!
//! Plays an audio file through the buffering core against a simulated render
//! clock (no audio device) and reports transport events. Useful for checking
//! buffer sizing and file decoding.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use readahead_player::config::LoggingConfig;
use readahead_player::playback::PlaybackEngine;
use readahead_player::{PlayerEvent, RenderSupplier, SampleProvider, SymphoniaProvider, TomlConfig};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sample rate assumed when the file does not report one
const FALLBACK_SAMPLE_RATE: u32 = 44_100;

/// Command-line arguments for readahead-player
#[derive(Parser, Debug)]
#[command(name = "readahead-player")]
#[command(about = "Buffered audio file playback against a simulated render clock")]
#[command(version)]
struct Args {
    /// Audio file to play
    file: PathBuf,

    /// Configuration file
    #[arg(short, long, env = "READAHEAD_CONFIG")]
    config: Option<PathBuf>,

    /// Number of frame buffers in the pool
    #[arg(long)]
    buffer_count: Option<usize>,

    /// Frames per buffer
    #[arg(long)]
    frames_per_buffer: Option<usize>,

    /// Frames requested per simulated render cycle
    #[arg(long, default_value = "512")]
    period_frames: usize,

    /// Start playback at this frame
    #[arg(long, default_value = "0")]
    start_frame: u64,

    /// Print events as JSON lines on stdout
    #[arg(long)]
    json_events: bool,
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("readahead_player={}", config.level).into());

    let file_layer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };
    let stderr_layer = config
        .file
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

/// Drive the render supplier at the file's real-time rate
fn spawn_render_clock(
    mut supplier: RenderSupplier,
    period_frames: usize,
    sample_rate: u32,
    running: Arc<AtomicBool>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("render-clock".to_string())
        .spawn(move || {
            let mut out = vec![0.0f32; period_frames * supplier.output_channels()];
            let period = Duration::from_secs_f64(period_frames as f64 / sample_rate as f64);
            while running.load(Ordering::Relaxed) {
                supplier.render(&mut out);
                std::thread::sleep(period);
            }
        })
}

fn report(event: &PlayerEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize event: {}", e),
        }
    } else {
        info!("Event: {:?}", event);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("Opening {}", args.file.display());
    let provider = SymphoniaProvider::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let sample_rate = provider.sample_rate().unwrap_or(FALLBACK_SAMPLE_RATE);

    // Buffer layout follows the file
    config.buffering.channels = provider.channels();
    if let Some(count) = args.buffer_count {
        config.buffering.buffer_count = count;
    }
    if let Some(frames) = args.frames_per_buffer {
        config.buffering.frames_per_buffer = frames;
    }

    let PlaybackEngine {
        controller,
        worker,
        supplier,
        ..
    } = PlaybackEngine::build(&config.buffering, provider)
        .context("Failed to initialize playback engine")?;

    let mut events = controller.subscribe();
    let worker_handle = worker.start();

    let running = Arc::new(AtomicBool::new(true));
    let render_thread = spawn_render_clock(
        supplier,
        args.period_frames.max(1),
        sample_rate,
        Arc::clone(&running),
    )
    .context("Failed to start render clock")?;

    if args.start_frame > 0 {
        controller
            .seek(args.start_frame)
            .context("Failed to seek to start frame")?;
    }
    controller.play().context("Failed to start playback")?;
    info!(
        "Playing at {} Hz, {} frames per render cycle",
        sample_rate, args.period_frames
    );

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                controller.stop().context("Failed to stop playback")?;
                break;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    report(&event, args.json_events);
                    if matches!(
                        event,
                        PlayerEvent::PlaybackFinished { .. } | PlayerEvent::ReadFailed { .. }
                    ) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged, {} events skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    if render_thread.join().is_err() {
        warn!("Render clock thread panicked");
    }
    worker_handle.shutdown().await;

    let stats = controller.stats();
    info!(
        "Finished: {} frames emitted, {} underruns, position {}",
        stats.frames_emitted, stats.underruns, stats.position_frames
    );
    if let Some(error) = controller.last_error() {
        anyhow::bail!("Playback stopped on read error: {}", error);
    }
    Ok(())
}
