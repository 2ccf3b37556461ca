//! Transport control tests
//!
//! Drive the engine deterministically (worker pass, then render cycle) and
//! check play/pause/stop/seek/reload semantics against a ramp file.

mod helpers;

use helpers::harness::assert_ramp;
use helpers::{ramp_engine, Harness};
use readahead_player::playback::TransportState;
use readahead_player::{Error, PlaybackState, PlayerEvent};
use tokio::sync::broadcast;

const PERIOD: usize = 256;

fn drain(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn state_changes(events: &[PlayerEvent]) -> Vec<(PlaybackState, PlaybackState)> {
    events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::StateChanged {
                old_state,
                new_state,
                ..
            } => Some((*old_state, *new_state)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_play_whole_file() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);

    h.controller.play().unwrap();
    let samples = h.run_until_stopped(200);

    assert_eq!(samples.len(), 10_000);
    assert_ramp(&samples, 0);
    assert_eq!(h.controller.state(), PlaybackState::Stopped);
    assert_eq!(h.controller.underrun_count(), 0);
    assert_eq!(h.controller.position(), 10_000);
    assert!(!h.controller.has_error());
}

#[test]
fn test_seek_to_last_frame_plays_one_frame() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);

    h.controller.seek(9_999).unwrap();
    assert_eq!(h.controller.state(), PlaybackState::Stopped);
    assert_eq!(h.controller.position(), 9_999);

    h.controller.play().unwrap();
    let samples = h.run_until_stopped(10);

    assert_eq!(samples, vec![9_999.0]);
    assert_eq!(h.controller.state(), PlaybackState::Stopped);
}

#[test]
fn test_seek_past_end_is_rejected() {
    let h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    let generation = h.controller.generation();

    let err = h.controller.seek(10_001).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidSeek {
            offset: 10_001,
            length: 10_000
        }
    ));
    assert_eq!(h.controller.generation(), generation);
    assert_eq!(h.controller.state(), PlaybackState::Stopped);
    assert_eq!(h.controller.position(), 0);
}

#[test]
fn test_seek_to_end_then_play_finishes_immediately() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    let mut rx = h.controller.subscribe();

    h.controller.seek(10_000).unwrap();
    h.controller.play().unwrap();
    let samples = h.run_until_stopped(10);

    assert!(samples.is_empty());
    assert_eq!(h.controller.state(), PlaybackState::Stopped);
    assert_eq!(h.controller.underrun_count(), 0);

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, PlayerEvent::PlaybackFinished { frame: 10_000, .. })));
}

#[test]
fn test_pause_is_idempotent() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    h.run_frames(1000, 50);

    let mut rx = h.controller.subscribe();
    h.controller.pause().unwrap();
    h.controller.pause().unwrap();

    let changes = state_changes(&drain(&mut rx));
    assert_eq!(changes, vec![(PlaybackState::Playing, PlaybackState::Paused)]);
    assert_eq!(h.controller.state(), PlaybackState::Paused);
}

#[test]
fn test_pause_holds_position_and_resume_continues() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    let played = h.run_frames(1000, 50);
    let paused_at = h.controller.position();
    assert_eq!(paused_at, played.len() as u64);

    h.controller.pause().unwrap();
    for _ in 0..5 {
        assert!(h.cycle().is_empty());
    }
    assert_eq!(h.controller.position(), paused_at);
    assert_eq!(h.controller.underrun_count(), 0);

    h.controller.play().unwrap();
    let resumed = h.run_frames(512, 10);
    assert_ramp(&resumed, paused_at);
}

#[test]
fn test_seek_while_playing_resumes_at_target() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    h.run_frames(1000, 50);

    h.controller.seek(5_000).unwrap();
    assert_eq!(h.controller.position(), 5_000);
    assert_eq!(h.controller.state(), PlaybackState::Playing);

    let samples = h.run_frames(1024, 20);
    assert!(!samples.is_empty());
    assert_ramp(&samples, 5_000);
    assert_eq!(h.controller.underrun_count(), 0);
}

#[test]
fn test_seek_while_paused_stays_paused() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    h.run_frames(1000, 50);
    h.controller.pause().unwrap();

    h.controller.seek(3_000).unwrap();
    assert_eq!(h.controller.transport_state(), TransportState::SeekingPause);

    for _ in 0..3 {
        assert!(h.cycle().is_empty());
    }
    assert_eq!(h.controller.transport_state(), TransportState::Paused);
    assert_eq!(h.controller.position(), 3_000);

    h.controller.play().unwrap();
    let samples = h.run_frames(512, 10);
    assert_ramp(&samples, 3_000);
}

#[test]
fn test_seek_while_stopped_does_not_start_buffering() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);

    h.controller.seek(2_000).unwrap();
    for _ in 0..3 {
        assert!(h.cycle().is_empty());
    }
    assert_eq!(h.controller.state(), PlaybackState::Stopped);
    assert_eq!(h.worker.free_buffers(), 4);
    assert_eq!(h.controller.position(), 2_000);

    h.controller.play().unwrap();
    let samples = h.run_frames(256, 10);
    assert_ramp(&samples, 2_000);
}

#[test]
fn test_stop_rewinds() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    h.run_frames(1500, 50);

    let generation = h.controller.generation();
    h.controller.stop().unwrap();
    assert_eq!(h.controller.state(), PlaybackState::Stopped);
    assert_eq!(h.controller.position(), 0);
    assert!(h.controller.generation() > generation);

    h.controller.play().unwrap();
    let samples = h.run_frames(512, 10);
    assert_ramp(&samples, 0);
}

#[test]
fn test_play_after_completion_restarts() {
    let mut h = Harness::new(ramp_engine(4, 1024, 3_000), PERIOD);
    h.controller.play().unwrap();
    assert_eq!(h.run_until_stopped(100).len(), 3_000);
    assert_eq!(h.controller.position(), 3_000);

    h.controller.play().unwrap();
    let samples = h.run_until_stopped(100);
    assert_eq!(samples.len(), 3_000);
    assert_ramp(&samples, 0);
}

#[test]
fn test_reload_keeps_position_and_state() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    let played = h.run_frames(1000, 50);
    let position = h.controller.position();
    assert_eq!(position, played.len() as u64);
    let generation = h.controller.generation();

    h.controller.reload().unwrap();
    assert_eq!(h.controller.generation(), generation + 1);
    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert_eq!(h.controller.position(), position);

    let samples = h.run_frames(1024, 20);
    assert_ramp(&samples, position);
}

#[test]
fn test_reload_range_only_discards_when_buffered() {
    let mut h = Harness::new(ramp_engine(4, 1024, 20_000), PERIOD);
    assert!(!h.controller.reload_range(0..100).unwrap());

    h.controller.play().unwrap();
    h.run_frames(1000, 50);
    let generation = h.controller.generation();
    let stats = h.controller.stats();
    let window_end = stats.read_cursor_frames + 1024;

    // Past the read-ahead window, already played, or empty
    assert!(!h.controller.reload_range(window_end..window_end + 500).unwrap());
    assert!(!h.controller.reload_range(0..stats.position_frames).unwrap());
    assert!(!h.controller.reload_range(2_000..2_000).unwrap());
    assert_eq!(h.controller.generation(), generation);

    let position = h.controller.position();
    assert!(h
        .controller
        .reload_range(position + 100..position + 101)
        .unwrap());
    assert_eq!(h.controller.generation(), generation + 1);
    assert_eq!(h.controller.position(), position);
    assert_eq!(h.controller.state(), PlaybackState::Playing);

    let samples = h.run_frames(1024, 20);
    assert_ramp(&samples, position);
}

#[test]
fn test_play_is_idempotent_while_playing() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    h.run_frames(512, 20);

    let generation = h.controller.generation();
    h.controller.play().unwrap();
    assert_eq!(h.controller.generation(), generation);

    let samples = h.run_frames(512, 20);
    assert_ramp(&samples, 512);
}

#[test]
fn test_seek_events() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    let mut rx = h.controller.subscribe();

    h.controller.play().unwrap();
    h.run_frames(512, 20);
    h.controller.seek(4_000).unwrap();
    h.run_frames(256, 20);

    let events = drain(&mut rx);
    let seeked: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::Seeked { frame, .. } => Some(*frame),
            _ => None,
        })
        .collect();
    let anchored: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::Anchored { frame, .. } => Some(*frame),
            _ => None,
        })
        .collect();

    assert_eq!(seeked, vec![4_000]);
    assert_eq!(anchored, vec![0, 4_000]);
    // Seeking while playing never reports a state change
    assert_eq!(
        state_changes(&events),
        vec![(PlaybackState::Stopped, PlaybackState::Playing)]
    );
}

#[test]
fn test_stats_snapshot() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    h.run_frames(1024, 20);

    let stats = h.controller.stats();
    assert_eq!(stats.state, PlaybackState::Playing);
    assert!(!stats.seeking);
    assert_eq!(stats.position_frames, 1024);
    assert_eq!(stats.capacity_frames, 4096);
    assert!(stats.read_cursor_frames >= stats.position_frames);
    assert_eq!(
        stats.look_ahead_frames,
        stats.read_cursor_frames - stats.position_frames
    );
    assert_eq!(stats.length_frames, Some(10_000));
    assert_eq!(stats.frames_emitted, 1024);
}

#[test]
fn test_seek_moves_read_cursor_to_target() {
    let mut h = Harness::new(ramp_engine(4, 1024, 10_000), PERIOD);
    h.controller.play().unwrap();
    h.run_frames(512, 20);
    assert!(h.controller.stats().read_cursor_frames < 5_000);

    h.controller.seek(5_000).unwrap();
    let stats = h.controller.stats();
    assert_eq!(stats.position_frames, 5_000);
    assert_eq!(stats.read_cursor_frames, 5_000);
    assert_eq!(stats.look_ahead_frames, 0);

    // Backwards as well
    h.run_frames(512, 20);
    h.controller.seek(100).unwrap();
    let stats = h.controller.stats();
    assert_eq!(stats.position_frames, 100);
    assert_eq!(stats.read_cursor_frames, 100);
}
