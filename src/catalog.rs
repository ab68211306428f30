//! Catalog data model: albums, tracks, and shuffle playlist entries.
//!
//! These objects are produced by the external ingestion collaborator and
//! handed in by reference; the engine only ever reads them.

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

/// One playable track.
///
/// `start_time_seconds`/`end_time_seconds` define an optional playable
/// sub-segment within a longer media file, used for chapter-style tracks.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Track {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    pub track_number: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub start_time_seconds: Option<f64>,
    #[serde(default)]
    pub end_time_seconds: Option<f64>,
}

impl Track {
    /// Offset to seek to once metadata is known, before playback is
    /// reported as started.
    #[must_use]
    pub fn start_time(&self) -> Option<Duration> {
        self.start_time_seconds.map(Duration::from_secs_f64)
    }

    /// Position at which an end-of-track signal is synthesized.
    #[must_use]
    pub fn end_time(&self) -> Option<Duration> {
        self.end_time_seconds.map(Duration::from_secs_f64)
    }

    /// Whether the track carries a playable URL at all.
    #[must_use]
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. \"{}\"", self.track_number, self.title)
    }
}

/// An album as supplied by the ingestion collaborator.
///
/// Track ordering is meaningful (album track order) and preserved.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Album {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub cover_art: Option<String>,
    pub tracks: Vec<Track>,
}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{} - {}\"", self.artist, self.title)
    }
}

/// A denormalized, flattened track reference used by the shuffle playlist.
///
/// Holds the album by `Arc` so shuffling never clones or mutates album data.
#[derive(Clone, Debug)]
pub struct PlaylistEntry {
    pub album: Arc<Album>,
    pub track_index: usize,
}

impl PlaylistEntry {
    /// The referenced track.
    ///
    /// Entries are only built from valid indices, but the catalog is
    /// external input, so this stays fallible.
    #[must_use]
    pub fn track(&self) -> Option<&Track> {
        self.album.tracks.get(self.track_index)
    }
}

#[cfg(test)]
mod tests {
    use super::Track;
    use std::time::Duration;

    #[test]
    fn sub_segment_times_convert_to_durations() {
        let track = Track {
            start_time_seconds: Some(30.0),
            end_time_seconds: Some(45.5),
            ..Track::default()
        };
        assert_eq!(track.start_time(), Some(Duration::from_secs(30)));
        assert_eq!(track.end_time(), Some(Duration::from_secs_f64(45.5)));
    }

    #[test]
    fn blank_url_is_not_playable() {
        let track = Track {
            url: "   ".to_owned(),
            ..Track::default()
        };
        assert!(!track.has_url());
    }

    #[test]
    fn deserializes_with_optional_fields_missing() {
        let track: Track = serde_json::from_str(
            r#"{"title": "Intro", "url": "https://example.com/a.mp3", "track_number": 1}"#,
        )
        .expect("minimal track deserializes");
        assert!(track.start_time().is_none());
        assert!(track.has_url());
    }
}
