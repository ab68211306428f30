//! Error handling for tonearm.
//!
//! Provides a unified error type carrying a playback failure category plus
//! the underlying error details. The categories encode retry policy:
//!
//! * [`PermissionDenied`](ErrorKind::PermissionDenied): platform autoplay
//!   policy; retrying other candidates will not help
//! * [`UnsupportedFormat`](ErrorKind::UnsupportedFormat): codec/container
//!   rejected; retryable via the next candidate
//! * [`TransientNetwork`](ErrorKind::TransientNetwork): timeout, abort or
//!   CORS-shaped failure; retryable via the next candidate
//! * [`Exhausted`](ErrorKind::Exhausted): every candidate failed; terminal
//!   for the current track request
//! * [`InvalidRequest`](ErrorKind::InvalidRequest): malformed track, empty
//!   playlist or out-of-range index; rejected before any attempt runs
//!
//! Expected playback failures travel as values through `Result`; panics are
//! reserved for programming errors.

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for tonearm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Playback failure categories.
///
/// Each variant carries its retry semantics; see the module docs.
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// Playback blocked by platform autoplay policy. Not retryable within
    /// the same request.
    #[error("playback not permitted")]
    PermissionDenied,

    /// Codec or container rejected by the platform. Retryable via the next
    /// candidate.
    #[error("media format not supported")]
    UnsupportedFormat,

    /// Timeout, abort, or CORS-shaped network failure. Retryable via the
    /// next candidate.
    #[error("transient network failure")]
    TransientNetwork,

    /// Every candidate in the fallback chain failed.
    #[error("all playback candidates exhausted")]
    Exhausted,

    /// Malformed track, empty playlist, or out-of-range index.
    #[error("invalid playback request")]
    InvalidRequest,

    /// The request was superseded by a newer one and its outcome discarded.
    #[error("operation was cancelled")]
    Cancelled,

    /// Unexpected internal error. Indicates a bug, not a failed track.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    /// Creates an error for playback blocked by autoplay policy.
    pub fn permission_denied<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::PermissionDenied, error)
    }

    /// Creates an error for a rejected codec or container.
    pub fn unsupported_format<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::UnsupportedFormat, error)
    }

    /// Creates an error for a timeout, abort, or network failure.
    pub fn transient_network<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::TransientNetwork, error)
    }

    /// Creates an error for an exhausted fallback chain.
    pub fn exhausted<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Exhausted, error)
    }

    /// Creates an error for a request rejected before any attempt ran.
    pub fn invalid_request<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidRequest, error)
    }

    /// Creates an error for a superseded request.
    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Cancelled, error)
    }

    /// Creates an error for unexpected internal failures.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Self::new(ErrorKind::InvalidRequest, error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorKind::InvalidRequest, error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::new(ErrorKind::Internal, error)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn constructors_set_kind() {
        assert_eq!(
            Error::permission_denied("blocked").kind,
            ErrorKind::PermissionDenied
        );
        assert_eq!(Error::exhausted("no candidates").kind, ErrorKind::Exhausted);
        assert_eq!(
            Error::invalid_request("empty url").kind,
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn downcast_recovers_source() {
        let io = std::io::Error::other("boom");
        let error = Error::from(io);
        assert!(error.downcast::<std::io::Error>().is_some());
    }
}
