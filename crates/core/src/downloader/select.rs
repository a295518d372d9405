//! Stream selection.

use crate::content::StreamDescriptor;

/// Picks the audio-only stream with the highest bitrate.
///
/// Among streams sharing the top bitrate the first one listed wins.
/// Returns `None` when no audio-only stream exists.
pub fn select_stream(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    // `Iterator::max_by_key` would keep the last of equal maxima.
    streams
        .iter()
        .filter(|s| s.audio_only)
        .fold(None::<&StreamDescriptor>, |best, s| match best {
            Some(b) if b.bitrate_kbps >= s.bitrate_kbps => Some(b),
            _ => Some(s),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_audio_bitrate_wins() {
        let streams = vec![
            StreamDescriptor::audio("a96", "webm", 96),
            StreamDescriptor::audio("a128", "m4a", 128),
            StreamDescriptor::audio("a64", "webm", 64),
            StreamDescriptor::audio("a160", "webm", 160),
            StreamDescriptor::video("v720", "mp4", 2500, 720),
        ];

        let selected = select_stream(&streams).unwrap();
        assert_eq!(selected.id, "a160");
        assert_eq!(selected.bitrate_kbps, 160);
    }

    #[test]
    fn test_tie_keeps_first() {
        let streams = vec![
            StreamDescriptor::audio("first", "m4a", 128),
            StreamDescriptor::audio("second", "webm", 128),
        ];
        assert_eq!(select_stream(&streams).unwrap().id, "first");
    }

    #[test]
    fn test_video_only_has_no_selection() {
        let streams = vec![StreamDescriptor::video("v1080", "mp4", 4500, 1080)];
        assert!(select_stream(&streams).is_none());
        assert!(select_stream(&[]).is_none());
    }
}
