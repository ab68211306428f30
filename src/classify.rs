//! Stream type classification.
//!
//! Pure extension matching on the URL path. Classification is always applied
//! to the original raw URL, never to derived relay candidates: relaying does
//! not change the media type.

/// Delivery kind of a media URL.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum StreamKind {
    /// Plain audio file.
    #[default]
    Audio,

    /// Plain video container.
    Video,

    /// Segmented streaming manifest requiring an HLS client.
    Hls,
}

impl StreamKind {
    /// Whether this kind is rendered through the video element.
    #[must_use]
    pub fn is_video(self) -> bool {
        matches!(self, Self::Video | Self::Hls)
    }
}

/// File extensions rendered through the video element.
const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "m4v", "mov", "webm", "mkv", "avi", "ts"];

/// Classifies a raw media URL by its path extension.
///
/// Everything that is neither an HLS manifest nor a known video container is
/// treated as audio; audio is the common case and unknown extensions play
/// fine through the audio element.
#[must_use]
pub fn classify(url: &str) -> StreamKind {
    let lower = url.to_lowercase();

    // Strip query and fragment; extensions live in the path.
    let path = lower
        .split_once('?')
        .map_or(lower.as_str(), |(path, _)| path);
    let path = path.split_once('#').map_or(path, |(path, _)| path);

    if path.ends_with(".m3u8") || path.contains(".m3u8/") {
        return StreamKind::Hls;
    }

    if let Some(extension) = path.rsplit('.').next() {
        if VIDEO_EXTENSIONS.contains(&extension) {
            return StreamKind::Video;
        }
    }

    StreamKind::Audio
}

#[cfg(test)]
mod tests {
    use super::{classify, StreamKind};

    #[test]
    fn manifests_are_hls() {
        assert_eq!(classify("https://cdn.example.com/live/index.m3u8"), StreamKind::Hls);
        assert_eq!(
            classify("https://cdn.example.com/live/index.M3U8?token=abc"),
            StreamKind::Hls
        );
    }

    #[test]
    fn video_containers_are_video() {
        assert_eq!(classify("https://cdn.example.com/clip.mp4"), StreamKind::Video);
        assert_eq!(classify("https://cdn.example.com/clip.WebM#t=30"), StreamKind::Video);
    }

    #[test]
    fn everything_else_is_audio() {
        assert_eq!(classify("https://cdn.example.com/a.mp3"), StreamKind::Audio);
        assert_eq!(classify("https://cdn.example.com/a.flac?dl=1"), StreamKind::Audio);
        assert_eq!(classify("not a url at all"), StreamKind::Audio);
        assert_eq!(classify("https://cdn.example.com/stream"), StreamKind::Audio);
    }

    #[test]
    fn query_does_not_leak_into_extension() {
        assert_eq!(
            classify("https://cdn.example.com/a.mp3?fallback=clip.mp4"),
            StreamKind::Audio
        );
    }
}
