//! Comparable keys derived from file names.

use serde::{Deserialize, Serialize};

use crate::media::MediaFile;

/// The matching-relevant facts extracted from a file name.
///
/// Two keys with equal season and episode refer to the same episode no matter
/// how differently the files are named.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedKey {
    /// Lowercased title tokens with release tags removed.
    pub title_tokens: Vec<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Last episode of a multi-episode pack (`S01E01-E03`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_end: Option<u32>,
    /// Canonical language code. Subtitles only.
    pub language: Option<String>,
    pub release_group: Option<String>,
}

impl NormalizedKey {
    /// Whether the file covers more than one episode.
    pub fn is_pack(&self) -> bool {
        matches!((self.episode, self.episode_end), (Some(start), Some(end)) if end > start)
    }

    pub fn has_numbering(&self) -> bool {
        self.season.is_some() || self.episode.is_some()
    }

    /// Whether this key's episode range includes `episode`.
    pub fn covers_episode(&self, episode: u32) -> bool {
        match (self.episode, self.episode_end) {
            (Some(start), Some(end)) => (start..=end).contains(&episode),
            (Some(start), None) => start == episode,
            _ => false,
        }
    }

    /// Human-readable rendering used in logs and AI prompts.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.title_tokens.is_empty() {
            parts.push(self.title_tokens.join(" "));
        }

        let range = |start: u32| match self.episode_end {
            Some(end) if end > start => format!("E{:02}-E{:02}", start, end),
            _ => format!("E{:02}", start),
        };
        match (self.season, self.episode) {
            (Some(season), Some(episode)) => parts.push(format!("S{:02}{}", season, range(episode))),
            (None, Some(episode)) => parts.push(range(episode)),
            (Some(season), None) => parts.push(format!("S{:02}", season)),
            (None, None) => {}
        }

        if let Some(lang) = &self.language {
            parts.push(format!("[{}]", lang));
        }
        parts.join(" ")
    }
}

/// A media file together with its normalized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFile {
    pub file: MediaFile,
    pub key: NormalizedKey,
}

impl NormalizedFile {
    pub fn new(file: MediaFile, key: NormalizedKey) -> Self {
        Self { file, key }
    }

    /// Language code, or `"und"` when none was detected.
    pub fn language_or_und(&self) -> &str {
        self.key.language.as_deref().unwrap_or("und")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tokens: &[&str], season: Option<u32>, episode: Option<u32>) -> NormalizedKey {
        NormalizedKey {
            title_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            season,
            episode,
            ..Default::default()
        }
    }

    #[test]
    fn test_display_name() {
        let mut k = key(&["show", "name"], Some(1), Some(2));
        assert_eq!(k.display_name(), "show name S01E02");

        k.language = Some("chs".to_string());
        assert_eq!(k.display_name(), "show name S01E02 [chs]");

        k.episode_end = Some(4);
        assert_eq!(k.display_name(), "show name S01E02-E04 [chs]");

        assert_eq!(key(&["movie"], None, None).display_name(), "movie");
        assert_eq!(key(&[], None, Some(7)).display_name(), "E07");
    }

    #[test]
    fn test_pack_range() {
        let mut k = key(&["show"], Some(1), Some(1));
        assert!(!k.is_pack());
        assert!(k.covers_episode(1));
        assert!(!k.covers_episode(2));

        k.episode_end = Some(3);
        assert!(k.is_pack());
        assert!(k.covers_episode(2));
        assert!(k.covers_episode(3));
        assert!(!k.covers_episode(4));
    }

    #[test]
    fn test_language_or_und() {
        let file = NormalizedFile::new(MediaFile::subtitle("/x/a.srt", 1), NormalizedKey::default());
        assert_eq!(file.language_or_und(), "und");
        assert!(!file.key.has_numbering());
    }
}
