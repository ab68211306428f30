//! URL candidate resolution.
//!
//! Turns one raw media URL into the ordered fallback chain of concrete URLs
//! to attempt. The ordering is a deliberate reliability-over-latency policy
//! learned from observed CORS and anti-hotlinking failures:
//!
//! 1. HLS manifests: video relay, audio relay, then direct.
//! 2. Wrapped analytics redirects: the unwrapped destination first (faster
//!    and more reliable), then relayed variants, then the original.
//! 3. Other cross-origin URLs: relay before direct; hosts known to reject
//!    direct requests get the relay candidate only.
//! 4. Same-origin URLs: unchanged.
//!
//! Resolution never fails: unparseable input yields the raw string as its
//! only candidate.

use std::fmt;

use regex_lite::Regex;
use url::Url;

use crate::{
    classify::{classify, StreamKind},
    config::{Config, AUDIO_RELAY_PATH, VIDEO_RELAY_PATH},
};

/// How a candidate URL reaches the media.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Route {
    /// The raw URL, unchanged.
    Direct,

    /// Same-origin audio relay endpoint.
    AudioRelay,

    /// Same-origin video relay endpoint.
    VideoRelay,

    /// Destination URL unwrapped from an analytics redirect.
    Unwrapped,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::AudioRelay => write!(f, "audio-relay"),
            Self::VideoRelay => write!(f, "video-relay"),
            Self::Unwrapped => write!(f, "unwrapped"),
        }
    }
}

/// One concrete URL the engine may attempt to play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub route: Route,
}

impl Candidate {
    fn new(url: impl Into<String>, route: Route) -> Self {
        Self {
            url: url.into(),
            route,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.route)
    }
}

/// Resolves raw media URLs into ordered candidate chains.
#[derive(Debug)]
pub struct Resolver {
    origin_host: Option<String>,
    origin: Url,
    cors_blocked_hosts: Vec<String>,
    wrappers: Vec<Regex>,
}

impl Resolver {
    /// Creates a resolver from engine configuration.
    ///
    /// Invalid redirect-wrapper patterns are skipped with a warning rather
    /// than failing engine startup.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let wrappers = config
            .redirect_wrappers
            .iter()
            .filter_map(|source| match Regex::new(source) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("skipping invalid redirect wrapper pattern {source:?}: {e}");
                    None
                }
            })
            .collect();

        Self {
            origin_host: config.origin.host_str().map(str::to_owned),
            origin: config.origin.clone(),
            cors_blocked_hosts: config.cors_blocked_hosts.clone(),
            wrappers,
        }
    }

    /// Produces the ordered fallback chain for `raw`.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Vec<Candidate> {
        let kind = classify(raw);

        if kind == StreamKind::Hls {
            return vec![
                Candidate::new(self.relay_url(raw, Route::VideoRelay), Route::VideoRelay),
                Candidate::new(self.relay_url(raw, Route::AudioRelay), Route::AudioRelay),
                Candidate::new(raw, Route::Direct),
            ];
        }

        let relay_route = if kind.is_video() {
            Route::VideoRelay
        } else {
            Route::AudioRelay
        };

        if let Some(destination) = self.unwrap_redirect(raw) {
            return vec![
                Candidate::new(destination.clone(), Route::Unwrapped),
                Candidate::new(self.relay_url(&destination, relay_route), relay_route),
                Candidate::new(self.relay_url(raw, relay_route), relay_route),
                Candidate::new(raw, Route::Direct),
            ];
        }

        let Ok(url) = Url::parse(raw) else {
            // Unparseable input passes through untouched; it may still be a
            // relative same-origin path the element can load.
            return vec![Candidate::new(raw, Route::Direct)];
        };

        match url.host_str() {
            Some(host) if Some(host) != self.origin_host.as_deref() => {
                if self.is_cors_blocked(host) {
                    // Known to reject direct cross-origin requests; a direct
                    // attempt would only waste its budget.
                    vec![Candidate::new(self.relay_url(raw, relay_route), relay_route)]
                } else {
                    vec![
                        Candidate::new(self.relay_url(raw, relay_route), relay_route),
                        Candidate::new(raw, Route::Direct),
                    ]
                }
            }
            _ => vec![Candidate::new(raw, Route::Direct)],
        }
    }

    /// Constructs a same-origin relay URL of the form
    /// `<origin>/relay/audio?url=<encoded>`.
    fn relay_url(&self, target: &str, route: Route) -> String {
        let path = match route {
            Route::VideoRelay => VIDEO_RELAY_PATH,
            _ => AUDIO_RELAY_PATH,
        };

        let mut relay = self.origin.clone();
        relay.set_path(path);
        relay.set_fragment(None);
        relay.query_pairs_mut().clear().append_pair("url", target);
        relay.to_string()
    }

    /// Extracts the destination from a wrapped analytics redirect, if `raw`
    /// matches any configured pattern.
    fn unwrap_redirect(&self, raw: &str) -> Option<String> {
        for wrapper in &self.wrappers {
            if let Some(captures) = wrapper.captures(raw) {
                if let Some(destination) = captures.get(1) {
                    let destination = destination.as_str();
                    let unwrapped = if destination.starts_with("http://")
                        || destination.starts_with("https://")
                    {
                        destination.to_owned()
                    } else {
                        // Prefix trackers drop the scheme from the embedded
                        // destination.
                        format!("https://{destination}")
                    };
                    debug!("unwrapped redirect {raw} -> {unwrapped}");
                    return Some(unwrapped);
                }
            }
        }

        None
    }

    fn is_cors_blocked(&self, host: &str) -> bool {
        self.cors_blocked_hosts
            .iter()
            .any(|blocked| host == blocked || host.ends_with(&format!(".{blocked}")))
    }
}
