//! Single playback attempt against one candidate URL.
//!
//! One attempt is one asynchronous operation resolving to a tagged outcome:
//! the race between play success, element error, and the candidate's timeout
//! budget is made explicit here rather than spread over event listeners.

use std::time::Duration;

use thiserror::Error;

use crate::element::{MediaElement, PlayError};

/// Why an attempt failed.
#[derive(Copy, Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum AttemptError {
    /// The element reported a load or play failure.
    #[error(transparent)]
    Play(#[from] PlayError),

    /// The candidate's time budget elapsed before playback started.
    #[error("attempt timed out")]
    Timeout,
}

impl AttemptError {
    /// Whether the fallback chain should stop instead of trying the next
    /// candidate. Only autoplay-policy failures are terminal: no candidate
    /// survives a missing user gesture.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Play(PlayError::NotAllowed))
    }
}

/// Runs one attempt: reset the element, assign the candidate, and race
/// load+play against `budget`.
///
/// The element is un-muted and set to `volume` before playing. Autoplay
/// policies treat muted and un-muted starts differently; always starting
/// un-muted keeps failures real instead of silent mute artifacts.
pub async fn run(
    element: &dyn MediaElement,
    url: &str,
    budget: Duration,
    volume: f32,
) -> Result<(), AttemptError> {
    element.reset().await;
    element.set_muted(false);
    element.set_volume(volume);

    let start = async {
        element.load(url).await?;
        element.play().await
    };

    match tokio::time::timeout(budget, start).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!("attempt on {url} failed: {e}");
            Err(AttemptError::Play(e))
        }
        Err(_) => {
            debug!("attempt on {url} timed out after {budget:?}");
            Err(AttemptError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AttemptError, PlayError};

    #[test]
    fn only_not_allowed_is_terminal() {
        assert!(AttemptError::Play(PlayError::NotAllowed).is_terminal());
        assert!(!AttemptError::Play(PlayError::NotSupported).is_terminal());
        assert!(!AttemptError::Play(PlayError::Aborted).is_terminal());
        assert!(!AttemptError::Play(PlayError::Network).is_terminal());
        assert!(!AttemptError::Timeout.is_terminal());
    }
}
