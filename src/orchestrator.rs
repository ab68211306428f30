//! Fallback orchestration.
//!
//! The only entry point the session uses to realize playback of a track URL.
//! Classifies the raw URL once, resolves its candidate chain, and walks the
//! chain in order until one candidate plays or the chain is exhausted.
//! Autoplay-policy failures abort the walk immediately; burning the
//! remaining candidates on a missing user gesture helps nobody.

use std::sync::Arc;

use exponential_backoff::Backoff;
use tokio_util::sync::CancellationToken;

use crate::{
    attempt,
    classify::{classify, StreamKind},
    config::Config,
    element::MediaElement,
    error::{Error, Result},
    hls::{self, HlsBackend},
    resolver::{Candidate, Resolver},
};

/// A successfully started playback.
#[derive(Clone, Debug)]
pub struct Started {
    /// The candidate that actually plays.
    pub candidate: Candidate,

    /// Delivery kind of the original URL.
    pub kind: StreamKind,
}

/// Sequences playback attempts across the candidate chain.
pub struct Orchestrator {
    config: Config,
    resolver: Resolver,
    hls: Option<Arc<dyn HlsBackend>>,
}

impl Orchestrator {
    /// Creates an orchestrator. `hls` is the optional segmented-stream
    /// client; without it, HLS candidates fall back to native element
    /// support.
    #[must_use]
    pub fn new(config: Config, hls: Option<Arc<dyn HlsBackend>>) -> Self {
        let resolver = Resolver::new(&config);
        Self {
            config,
            resolver,
            hls,
        }
    }

    /// The candidate chain for `raw_url`, without attempting playback.
    #[must_use]
    pub fn candidates(&self, raw_url: &str) -> Vec<Candidate> {
        self.resolver.resolve(raw_url)
    }

    /// Realizes playback of `raw_url` on `element`.
    ///
    /// Walks the candidate chain in order under position-scaled budgets,
    /// with a short delay between attempts to avoid hammering a flaky
    /// origin. Cancelling `cancel` abandons the walk at the next suspension
    /// point; the caller discards the outcome of a superseded run.
    pub async fn start(
        &self,
        raw_url: &str,
        element: &dyn MediaElement,
        cancel: &CancellationToken,
    ) -> Result<Started> {
        // Classify the original URL, not each candidate: relaying does not
        // change the media type.
        let kind = classify(raw_url);
        let candidates = self.resolver.resolve(raw_url);
        let total = candidates.len();
        debug!("resolved {raw_url} into {total} candidate(s), kind {kind:?}");

        let timeouts = if kind.is_video() {
            self.config.video_timeouts
        } else {
            self.config.audio_timeouts
        };

        #[expect(clippy::cast_possible_truncation)]
        let backoff = Backoff::new(
            total as u32,
            self.config.candidate_backoff_min,
            self.config.candidate_backoff_max,
        );

        for ((position, candidate), delay) in candidates.iter().enumerate().zip(backoff.iter()) {
            let budget = timeouts.for_position(position);
            trace!("attempt {}/{total}: {candidate} ({budget:?})", position + 1);

            let attempt = async {
                if kind == StreamKind::Hls {
                    hls::run(
                        self.hls.as_deref(),
                        element,
                        &candidate.url,
                        budget,
                        self.config.hls_manifest_timeout,
                        self.config.default_volume,
                    )
                    .await
                } else {
                    attempt::run(element, &candidate.url, budget, self.config.default_volume).await
                }
            };

            let result = tokio::select! {
                () = cancel.cancelled() => {
                    return Err(Error::cancelled("superseded by a newer playback request"));
                }
                result = attempt => result,
            };

            match result {
                Ok(()) => {
                    info!("playing {candidate}");
                    return Ok(Started {
                        candidate: candidate.clone(),
                        kind,
                    });
                }
                Err(e) if e.is_terminal() => {
                    // No candidate survives a missing user gesture.
                    return Err(Error::permission_denied(e));
                }
                Err(e) => {
                    warn!("candidate {candidate} failed: {e}");
                    if let Some(delay) = delay {
                        tokio::select! {
                            () = cancel.cancelled() => {
                                return Err(Error::cancelled(
                                    "superseded by a newer playback request",
                                ));
                            }
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }

        Err(Error::exhausted(format!(
            "all {total} candidate(s) failed for {raw_url}"
        )))
    }
}
