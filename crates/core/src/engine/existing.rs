//! Detection of subtitles that already belong to a video.

use crate::normalizer::{NormalizedFile, Vocabulary};
use crate::planner::NamingPattern;

/// Whether `subtitle` is already named after `video`.
///
/// Recognized names, all in the video's directory: `{stem}.{ext}`,
/// `{stem}.{lang}.{ext}`, `{stem}-{lang}.{ext}`, and whatever the naming
/// pattern renders for the subtitle's language.
pub(crate) fn belongs_to(
    video: &NormalizedFile,
    subtitle: &NormalizedFile,
    pattern: &NamingPattern,
    vocabulary: &Vocabulary,
) -> bool {
    if video.file.directory() != subtitle.file.directory() {
        return false;
    }

    let rendered = pattern.render(
        video.file.stem(),
        subtitle.language_or_und(),
        subtitle.file.extension(),
    );
    if rendered == subtitle.file.basename() {
        return true;
    }

    let video_stem = video.file.stem();
    let subtitle_stem = subtitle.file.stem();
    if subtitle_stem == video_stem {
        return true;
    }

    let Some(rest) = subtitle_stem.strip_prefix(video_stem) else {
        return false;
    };
    let Some(tag) = rest.strip_prefix('.').or_else(|| rest.strip_prefix('-')) else {
        return false;
    };
    let tag = tag.to_lowercase();
    tag == "und"
        || tag
            .split('&')
            .all(|part| vocabulary.language(part).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{normalized, subtitle, video};

    fn check(video_path: &str, subtitle_path: &str) -> bool {
        belongs_to(
            &normalized(video(video_path)),
            &normalized(subtitle(subtitle_path)),
            &NamingPattern::default(),
            &Vocabulary::default(),
        )
    }

    #[test]
    fn test_recognized_names() {
        assert!(check("/tv/Show.S01E01.mkv", "/tv/Show.S01E01.chs.srt"));
        assert!(check("/tv/Show.S01E01.mkv", "/tv/Show.S01E01.srt"));
        assert!(check("/tv/Show.S01E01.mkv", "/tv/Show.S01E01-eng.ass"));
        assert!(check("/tv/Show.S01E01.mkv", "/tv/Show.S01E01.und.srt"));
        assert!(check("/tv/Show.S01E01.mkv", "/tv/Show.S01E01.chs&eng.srt"));
    }

    #[test]
    fn test_unrelated_names() {
        assert!(!check("/tv/Show.S01E01.mkv", "/tv/show.1x01.chs.srt"));
        assert!(!check("/tv/Show.S01E01.mkv", "/tv/Show.S01E01.720p.srt"));
        assert!(!check("/tv/Show.S01E01.mkv", "/tv/Subs/Show.S01E01.chs.srt"));
        assert!(!check("/tv/Show.S01E1.mkv", "/tv/Show.S01E10.srt"));
    }
}
