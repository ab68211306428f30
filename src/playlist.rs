//! Playlist sequencing.
//!
//! Owns the shuffle playlist construction and the wrap-around next/previous
//! arithmetic used for both album order and shuffle order. Sequencing always
//! loops past either end rather than stopping.

use std::sync::Arc;

use crate::catalog::{Album, PlaylistEntry};

/// Flattens every track of every album into one uniformly shuffled list.
///
/// Fisher-Yates over denormalized entries; no `Album` is cloned or mutated.
/// Empty input yields an empty list, which callers treat as a no-op.
#[must_use]
pub fn build_shuffle(albums: &[Arc<Album>]) -> Vec<PlaylistEntry> {
    let mut entries: Vec<PlaylistEntry> = albums
        .iter()
        .flat_map(|album| {
            (0..album.tracks.len()).map(move |track_index| PlaylistEntry {
                album: Arc::clone(album),
                track_index,
            })
        })
        .collect();

    for i in (1..entries.len()).rev() {
        let j = fastrand::usize(..=i);
        entries.swap(i, j);
    }

    debug!("built shuffle playlist of {} entries", entries.len());
    entries
}

/// The position after `index` in a sequence of `len`, wrapping to `0` past
/// the end. `None` for an empty sequence.
#[must_use]
pub fn advance(len: usize, index: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(if index + 1 >= len { 0 } else { index + 1 })
}

/// The position before `index`, wrapping to the last position below `0`.
/// `None` for an empty sequence.
#[must_use]
pub fn retreat(len: usize, index: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(if index == 0 || index > len {
        len - 1
    } else {
        index - 1
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::{advance, build_shuffle, retreat};
    use crate::catalog::{Album, Track};

    fn album(title: &str, track_count: usize) -> Arc<Album> {
        #[expect(clippy::cast_possible_truncation)]
        let tracks = (0..track_count)
            .map(|i| Track {
                title: format!("{title} #{i}"),
                url: format!("https://cdn.example.com/{title}/{i}.mp3"),
                track_number: i as u32 + 1,
                ..Track::default()
            })
            .collect();
        Arc::new(Album {
            title: title.to_owned(),
            artist: "artist".to_owned(),
            cover_art: None,
            tracks,
        })
    }

    #[test]
    fn empty_catalog_builds_empty_shuffle() {
        assert!(build_shuffle(&[]).is_empty());
    }

    #[test]
    fn shuffle_covers_every_track_exactly_once() {
        let albums = [album("one", 3), album("two", 2)];
        let entries = build_shuffle(&albums);

        assert_eq!(entries.len(), 5);
        let pairs: HashSet<(String, usize)> = entries
            .iter()
            .map(|e| (e.album.title.clone(), e.track_index))
            .collect();
        assert_eq!(pairs.len(), 5, "every (album, index) pair is distinct");
        for entry in &entries {
            assert!(entry.track().is_some());
        }
    }

    #[test]
    fn advance_wraps_past_the_end() {
        assert_eq!(advance(3, 0), Some(1));
        assert_eq!(advance(3, 2), Some(0));
        assert_eq!(advance(1, 0), Some(0));
    }

    #[test]
    fn retreat_wraps_below_zero() {
        assert_eq!(retreat(3, 2), Some(1));
        assert_eq!(retreat(3, 0), Some(2));
        assert_eq!(retreat(1, 0), Some(0));
    }

    #[test]
    fn empty_sequences_are_a_no_op() {
        assert_eq!(advance(0, 0), None);
        assert_eq!(retreat(0, 0), None);
    }
}
