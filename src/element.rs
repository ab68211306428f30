//! The media element seam.
//!
//! The engine drives real media elements (one audio, one video per session)
//! owned by the embedding platform. This module defines the object-safe
//! trait the engine programs against and the tagged outcomes it understands.
//! Elements report progress through a broadcast channel; the session ignores
//! events that do not originate from the currently active element.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Why a load or play call failed.
///
/// This is the taxonomy the fallback policy keys on: `NotAllowed` aborts the
/// whole chain, everything else moves on to the next candidate.
#[derive(Copy, Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum PlayError {
    /// Blocked by platform autoplay or user-gesture policy. Retrying with a
    /// different candidate will not help.
    #[error("playback not allowed by platform policy")]
    NotAllowed,

    /// Codec or container rejected by the platform.
    #[error("media format not supported")]
    NotSupported,

    /// The load was aborted by the platform.
    #[error("media load aborted")]
    Aborted,

    /// Network or CORS-shaped failure while fetching the media.
    #[error("network error while loading media")]
    Network,
}

/// Progress events emitted by a media element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ElementEvent {
    /// Media metadata became available; the duration is now known.
    MetadataLoaded { duration: Duration },

    /// Periodic playback position update.
    TimeUpdate { position: Duration },

    /// Playback reached the natural end of the media.
    Ended,
}

/// A platform media element the engine can drive.
///
/// Exactly one audio and one video element exist per session; every attempt
/// reuses them after a full [`reset`](Self::reset).
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Fully tears down the current source: pause, clear source, reload.
    ///
    /// Must be called before assigning a new source so that a stale error
    /// event from the previous source cannot be misattributed to the new
    /// attempt.
    async fn reset(&self);

    /// Assigns a source URL and waits for it to become loadable.
    async fn load(&self, url: &str) -> Result<(), PlayError>;

    /// Starts playback, resolving once playback has actually begun.
    async fn play(&self) -> Result<(), PlayError>;

    /// Pauses playback, keeping the current source and position.
    async fn pause(&self);

    /// Seeks to `position`. Out-of-range positions are clamped by the
    /// platform.
    async fn seek(&self, position: Duration);

    /// Sets the playback volume in `[0.0, 1.0]`.
    fn set_volume(&self, volume: f32);

    /// Mutes or un-mutes the element.
    fn set_muted(&self, muted: bool);

    /// Current playback position.
    fn position(&self) -> Duration;

    /// Media duration, once metadata has loaded.
    fn duration(&self) -> Option<Duration>;

    /// Whether the platform can play HLS manifests natively, without a
    /// segmented-stream client library.
    fn supports_native_hls(&self) -> bool {
        false
    }

    /// Subscribes to this element's progress events.
    fn events(&self) -> broadcast::Receiver<ElementEvent>;
}
