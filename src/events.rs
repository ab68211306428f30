//! Events emitted by the playback session.
//!
//! Consumers subscribe through
//! [`SessionHandle::subscribe`](crate::handle::SessionHandle::subscribe) to
//! react to state changes, for example to refresh a now-playing display or
//! persist playback progress.

/// Events that can be emitted by the playback session.
///
/// These represent significant state changes; fine-grained progress is
/// available through the session snapshot channel instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Playback has started, either from a paused state or because a new
    /// track finished loading.
    Play,

    /// Playback has paused and can be resumed from the current position.
    Pause,

    /// The current track changed, whether through manual selection,
    /// automatic progression, or shuffle.
    TrackChanged,

    /// The session was stopped and reset to its initial state.
    Stopped,

    /// Shuffle mode was entered or left.
    ShuffleChanged,
}
