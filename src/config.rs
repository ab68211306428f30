//! Engine configuration.
//!
//! Everything here is policy, not mechanism: relay endpoint paths, the
//! domains known to reject direct cross-origin media requests, the wrapped
//! redirect patterns, and the attempt timeout budgets. The defaults are a
//! snapshot of observed behavior and are expected to drift; treat them as
//! tunables.

use std::time::Duration;

use url::Url;

/// Relay endpoint path for audio streams, relative to the origin.
pub const AUDIO_RELAY_PATH: &str = "/relay/audio";

/// Relay endpoint path for video and HLS streams, relative to the origin.
pub const VIDEO_RELAY_PATH: &str = "/relay/video";

/// Timeout budgets for one fallback chain position.
///
/// The first candidate gets the longest budget: it is the most likely to
/// succeed and users tolerate an initial wait. Later candidates are recovery
/// attempts and get the shorter `retry` budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptTimeouts {
    /// Budget for the first candidate.
    pub first: Duration,

    /// Budget for every candidate after the first.
    pub retry: Duration,
}

impl AttemptTimeouts {
    /// Budget for the candidate at `position` in the fallback chain.
    #[must_use]
    pub fn for_position(&self, position: usize) -> Duration {
        if position == 0 {
            self.first
        } else {
            self.retry
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The application's own origin. URLs on this host are played directly;
    /// relay candidates are constructed against it.
    pub origin: Url,

    /// Hosts known to reject direct cross-origin media requests. Matching is
    /// suffix-based, so an entry covers its subdomains. For these hosts only
    /// the relay candidate is produced; a direct attempt is known to fail.
    pub cors_blocked_hosts: Vec<String>,

    /// Regex sources matching analytics wrappers that embed the destination
    /// URL in their path. The first capture group must be the destination,
    /// with or without a scheme.
    pub redirect_wrappers: Vec<String>,

    /// Attempt budgets for plain audio candidates.
    pub audio_timeouts: AttemptTimeouts,

    /// Attempt budgets for video and HLS candidates.
    pub video_timeouts: AttemptTimeouts,

    /// Independent upper bound on HLS manifest loading. Manifests can hang
    /// indefinitely on a dead edge node.
    pub hls_manifest_timeout: Duration,

    /// Delay window between candidate attempts, to avoid hammering a flaky
    /// origin.
    pub candidate_backoff_min: Duration,
    pub candidate_backoff_max: Duration,

    /// Volume applied before every attempt. Attempts always start un-muted
    /// so that failures are real failures, not silent mute artifacts.
    pub default_volume: f32,
}

impl Config {
    /// Creates a configuration for the given application origin with default
    /// policy values.
    #[must_use]
    pub fn with_origin(origin: Url) -> Self {
        Self {
            origin,
            cors_blocked_hosts: vec![
                "audio.buzzsprout.com".to_owned(),
                "traffic.libsyn.com".to_owned(),
                "media.transistor.fm".to_owned(),
            ],
            redirect_wrappers: vec![
                // Prefix trackers: scheme-less destination in the path.
                r"^https?://(?:www\.)?dts\.podtrac\.com/redirect\.[a-z0-9]+/(.+)$".to_owned(),
                r"^https?://chrt\.fm/track/[A-Za-z0-9]+/(.+)$".to_owned(),
                r"^https?://pdst\.fm/e/(.+)$".to_owned(),
            ],
            audio_timeouts: AttemptTimeouts {
                first: Duration::from_secs(12),
                retry: Duration::from_secs(6),
            },
            video_timeouts: AttemptTimeouts {
                first: Duration::from_secs(15),
                retry: Duration::from_secs(8),
            },
            hls_manifest_timeout: Duration::from_secs(8),
            candidate_backoff_min: Duration::from_millis(250),
            candidate_backoff_max: Duration::from_millis(500),
            default_volume: 1.0,
        }
    }

    /// Whether `host` is on the CORS-problematic list.
    ///
    /// Suffix matching so that `cdn.traffic.libsyn.com` is covered by a
    /// `traffic.libsyn.com` entry.
    #[must_use]
    pub fn is_cors_blocked(&self, host: &str) -> bool {
        self.cors_blocked_hosts
            .iter()
            .any(|blocked| host == blocked || host.ends_with(&format!(".{blocked}")))
    }
}

impl Default for Config {
    fn default() -> Self {
        let origin = Url::parse("http://localhost:8080").expect("default origin is valid");
        Self::with_origin(origin)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn cors_block_matches_subdomains() {
        let config = Config::default();
        assert!(config.is_cors_blocked("traffic.libsyn.com"));
        assert!(config.is_cors_blocked("cdn.traffic.libsyn.com"));
        assert!(!config.is_cors_blocked("libsyn.com"));
        assert!(!config.is_cors_blocked("nottraffic.libsyn.com.evil.example"));
    }

    #[test]
    fn first_position_gets_longest_budget() {
        let config = Config::default();
        assert!(
            config.audio_timeouts.for_position(0) > config.audio_timeouts.for_position(1),
            "retries must get shorter budgets"
        );
        assert_eq!(
            config.audio_timeouts.for_position(1),
            config.audio_timeouts.for_position(5)
        );
    }
}
