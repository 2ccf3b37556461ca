//! Transport state machine
//!
//! Pure transition table with no I/O or audio-device knowledge. The
//! controller applies commands through `transition()` under its lock and acts
//! on the returned `Transition` (re-anchor, error flag, events).

use readahead_common::PlaybackState;

/// Internal transport state
///
/// `SeekingPlay` and `SeekingPause` are transient: buffering has been
/// re-anchored and the render supplier emits silence until the worker reports
/// that the new run is primed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransportState {
    Stopped = 0,
    Playing = 1,
    Paused = 2,
    SeekingPlay = 3,
    SeekingPause = 4,
}

impl TransportState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => TransportState::Playing,
            2 => TransportState::Paused,
            3 => TransportState::SeekingPlay,
            4 => TransportState::SeekingPause,
            _ => TransportState::Stopped,
        }
    }

    /// State reported to callers; seeking reports the state it resumes into
    pub fn public(self) -> PlaybackState {
        match self {
            TransportState::Stopped => PlaybackState::Stopped,
            TransportState::Playing | TransportState::SeekingPlay => PlaybackState::Playing,
            TransportState::Paused | TransportState::SeekingPause => PlaybackState::Paused,
        }
    }

    pub fn is_seeking(self) -> bool {
        matches!(self, TransportState::SeekingPlay | TransportState::SeekingPause)
    }
}

/// Transport command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Seek(u64),
    /// Worker: the current buffering run is primed
    Anchored,
    /// Render supplier drained the end-of-stream buffer
    Finished,
    /// Worker: a read failed
    Fail,
}

/// Result of applying a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: TransportState,

    /// Invalidate buffered data and restart buffering at this frame
    pub reanchor: Option<u64>,

    /// Raise the error flag
    pub error: bool,
}

impl Transition {
    fn to(next: TransportState) -> Self {
        Self {
            next,
            reanchor: None,
            error: false,
        }
    }

    fn reanchor(next: TransportState, anchor: u64) -> Self {
        Self {
            next,
            reanchor: Some(anchor),
            error: false,
        }
    }

    fn fail() -> Self {
        Self {
            next: TransportState::Stopped,
            reanchor: None,
            error: true,
        }
    }

    /// True when nothing changes
    pub fn is_noop(&self, from: TransportState) -> bool {
        self.next == from && self.reanchor.is_none() && !self.error
    }
}

/// Facts about the current run consulted by the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportContext {
    /// Current render position
    pub position: u64,
    /// The last run ended by draining the end of the file
    pub completed: bool,
}

/// Apply `command` in `state`
///
/// Playing from stopped resumes at the current position, or from the
/// beginning when the previous run played to the end. Seek targets must be
/// validated by the caller.
pub fn transition(state: TransportState, command: Command, ctx: TransportContext) -> Transition {
    use Command as C;
    use TransportState as S;

    match (state, command) {
        (_, C::Stop) => Transition::reanchor(S::Stopped, 0),

        (S::Stopped, C::Play) => {
            let anchor = if ctx.completed { 0 } else { ctx.position };
            Transition::reanchor(S::SeekingPlay, anchor)
        }
        (S::Stopped, C::Seek(x)) => Transition::reanchor(S::Stopped, x),
        (S::Stopped, C::Pause | C::Anchored | C::Finished | C::Fail) => Transition::to(S::Stopped),

        (S::Playing, C::Pause) => Transition::to(S::Paused),
        (S::Playing, C::Seek(x)) => Transition::reanchor(S::SeekingPlay, x),
        (S::Playing, C::Finished) => Transition::to(S::Stopped),
        (S::Playing, C::Fail) => Transition::fail(),
        (S::Playing, C::Play | C::Anchored) => Transition::to(S::Playing),

        (S::Paused, C::Play) => Transition::to(S::Playing),
        (S::Paused, C::Seek(x)) => Transition::reanchor(S::SeekingPause, x),
        (S::Paused, C::Fail) => Transition::fail(),
        (S::Paused, C::Pause | C::Anchored | C::Finished) => Transition::to(S::Paused),

        (S::SeekingPlay, C::Pause) => Transition::to(S::SeekingPause),
        (S::SeekingPlay, C::Seek(x)) => Transition::reanchor(S::SeekingPlay, x),
        (S::SeekingPlay, C::Anchored) => Transition::to(S::Playing),
        (S::SeekingPlay, C::Fail) => Transition::fail(),
        (S::SeekingPlay, C::Play | C::Finished) => Transition::to(S::SeekingPlay),

        (S::SeekingPause, C::Play) => Transition::to(S::SeekingPlay),
        (S::SeekingPause, C::Seek(x)) => Transition::reanchor(S::SeekingPause, x),
        (S::SeekingPause, C::Anchored) => Transition::to(S::Paused),
        (S::SeekingPause, C::Fail) => Transition::fail(),
        (S::SeekingPause, C::Pause | C::Finished) => Transition::to(S::SeekingPause),
    }
}
