//! HLS adapter.
//!
//! Wraps a segmented-stream client library (or native platform support)
//! behind the same attempt contract as plain audio/video. Manifest loading
//! gets its own independent upper bound: manifests can hang indefinitely on
//! a dead edge node, and that hang must not consume the whole candidate
//! budget unnoticed.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    attempt::{self, AttemptError},
    element::{MediaElement, PlayError},
};

/// A segmented-stream client library attached to a video element.
#[async_trait]
pub trait HlsBackend: Send + Sync {
    /// Attaches to the element, loads the manifest, and resolves once the
    /// first quality level is playable. Fatal stream errors resolve to an
    /// immediate failure.
    async fn attach(&self, element: &dyn MediaElement, manifest_url: &str)
        -> Result<(), PlayError>;

    /// Detaches from the element, releasing the manifest and buffers.
    async fn detach(&self, element: &dyn MediaElement);
}

/// Runs one HLS attempt under both the candidate budget and the independent
/// manifest timeout.
///
/// Preference order: client library if available, else native support on the
/// element, else an immediate `NotSupported`. The orchestrator still walks
/// the remaining candidates after `NotSupported`; a later candidate might be
/// a non-HLS fallback.
pub async fn run(
    backend: Option<&dyn HlsBackend>,
    element: &dyn MediaElement,
    url: &str,
    budget: Duration,
    manifest_timeout: Duration,
    volume: f32,
) -> Result<(), AttemptError> {
    let Some(backend) = backend else {
        if element.supports_native_hls() {
            debug!("no HLS backend, playing {url} natively");
            return attempt::run(element, url, budget, volume).await;
        }
        debug!("no HLS backend and no native support for {url}");
        return Err(AttemptError::Play(PlayError::NotSupported));
    };

    element.reset().await;
    element.set_muted(false);
    element.set_volume(volume);

    let start = async {
        match tokio::time::timeout(manifest_timeout, backend.attach(element, url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(AttemptError::Play(e)),
            Err(_) => {
                debug!("HLS manifest for {url} timed out after {manifest_timeout:?}");
                return Err(AttemptError::Timeout);
            }
        }
        element.play().await.map_err(AttemptError::Play)
    };

    match tokio::time::timeout(budget, start).await {
        Ok(result) => {
            if let Err(ref e) = result {
                debug!("HLS attempt on {url} failed: {e}");
                backend.detach(element).await;
            }
            result
        }
        Err(_) => {
            debug!("HLS attempt on {url} timed out after {budget:?}");
            backend.detach(element).await;
            Err(AttemptError::Timeout)
        }
    }
}
