//! File name normalization.
//!
//! Turns a raw basename such as `[Group] Show.Name.S01E02.1080p.WEB-DL.chs.srt`
//! into a [`NormalizedKey`] (title tokens, season, episode, language, release
//! group). Normalization is pure and never fails; a name nothing can be
//! recognized in yields a key whose only title token is the cleaned name.

mod key;
mod vocabulary;

pub use key::{NormalizedFile, NormalizedKey};
pub use vocabulary::{IdiomError, IdiomKind, IdiomMatch, NumberingIdiom, Vocabulary};

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::media::{MediaFile, MediaKind};

static BRACKET_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[\(【]([^\[\]\(\)【】]*)[\]\)】]").unwrap());

static DEFAULT_NORMALIZER: Lazy<Normalizer> = Lazy::new(Normalizer::default);

/// Normalize a basename with the built-in vocabulary.
pub fn normalize(basename: &str) -> NormalizedKey {
    DEFAULT_NORMALIZER.normalize(basename)
}

/// Extracts comparable keys from file names using a [`Vocabulary`].
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    vocabulary: Vocabulary,
}

#[derive(Debug, Default)]
struct Numbering {
    season: Option<u32>,
    episode: Option<u32>,
    episode_end: Option<u32>,
}

impl Normalizer {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Normalize a listed file.
    ///
    /// Videos carry no subtitle language: a trailing code such as the `it` in
    /// `Stephen.King.It.mkv` stays part of the title.
    pub fn normalize_file(&self, file: &MediaFile) -> NormalizedFile {
        let key = self.normalize_key(file.basename(), file.kind() == MediaKind::Subtitle);
        NormalizedFile::new(file.clone(), key)
    }

    /// Normalize a basename.
    pub fn normalize(&self, basename: &str) -> NormalizedKey {
        self.normalize_key(basename, true)
    }

    fn normalize_key(&self, basename: &str, with_language: bool) -> NormalizedKey {
        let lowered = basename.trim().to_lowercase();
        let stem = strip_media_extension(&lowered);
        let (stem, language) = if with_language {
            self.take_trailing_language(stem)
        } else {
            (stem.to_string(), None)
        };

        let rewritten = self.vocabulary.rewrite_tags(&stem);
        let (body, leading_group) = self.strip_brackets(&rewritten);
        let (body, trailing_group) = self.take_trailing_group(&body);
        let release_group = leading_group.or(trailing_group);

        let mut working = body.replace(['.', '_'], " ");
        let mut numbering = self.extract_numbering(&mut working);
        let mut tokens = self.tokenize(&working);

        if numbering.episode.is_none() {
            let bare = tokens
                .iter()
                .enumerate()
                .skip(1)
                .rev()
                .find_map(|(i, t)| self.vocabulary.standalone_episode(t).map(|ep| (i, ep)));
            if let Some((index, episode)) = bare {
                tokens.remove(index);
                numbering.episode = Some(episode);
            }
        }

        if tokens.is_empty() && numbering.season.is_none() && numbering.episode.is_none() {
            let cleaned = collapse_whitespace(&stem.replace(['.', '_'], " "));
            if !cleaned.is_empty() {
                tokens.push(cleaned);
            }
        }

        NormalizedKey {
            title_tokens: tokens,
            season: numbering.season,
            episode: numbering.episode,
            episode_end: numbering.episode_end,
            language,
            release_group,
        }
    }

    /// Split a trailing language segment (`.chs`, `_eng`, `.chs&eng`) off the stem.
    fn take_trailing_language(&self, stem: &str) -> (String, Option<String>) {
        for sep in ['.', '_', ' ', '-'] {
            let Some(pos) = stem.rfind(sep) else {
                continue;
            };
            let head = &stem[..pos];
            if head.trim().is_empty() {
                continue;
            }
            if let Some(lang) = self.lookup_language(&stem[pos + sep.len_utf8()..]) {
                return (head.to_string(), Some(lang));
            }
        }

        // A trailing bracket such as "Show 01 [简体]"
        if let Some(open) = stem.rfind(['[', '(', '【']) {
            let tail = &stem[open..];
            if tail.ends_with([']', ')', '】']) && open > 0 {
                if let Some(lang) = self.lookup_language(tail) {
                    return (stem[..open].to_string(), Some(lang));
                }
            }
        }

        (stem.to_string(), None)
    }

    fn lookup_language(&self, segment: &str) -> Option<String> {
        let segment = segment
            .trim()
            .trim_matches(['[', ']', '(', ')', '【', '】'])
            .trim();
        if segment.is_empty() {
            return None;
        }

        if segment.contains(['&', '+']) {
            let parts: Option<Vec<&str>> = segment
                .split(['&', '+'])
                .map(|p| self.vocabulary.language(p.trim()))
                .collect();
            return parts.filter(|p| p.len() > 1).map(|p| p.join("&"));
        }

        self.vocabulary.language(segment).map(str::to_string)
    }

    /// Drop bracketed tags and hashes; a leading bracket names the release group.
    fn strip_brackets(&self, text: &str) -> (String, Option<String>) {
        let mut out = String::with_capacity(text.len());
        let mut group = None;
        let mut last = 0;

        for caps in BRACKET_GROUP.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let content = caps.get(1).map_or("", |m| m.as_str()).trim();
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            let is_leading = text[..whole.start()].trim().is_empty();
            let rest_has_text = text[whole.end()..].chars().any(char::is_alphanumeric);
            // Site tags such as "[eztv]" trail scene names after the group
            let is_site_tag =
                !is_leading && !rest_has_text && self.has_release_tag(&text[..whole.start()]);

            if content.is_empty() || is_hash(content) || is_site_tag || self.is_tag_list(content) {
                out.push(' ');
            } else if is_leading
                && group.is_none()
                && rest_has_text
                && !content.bytes().all(|b| b.is_ascii_digit())
            {
                group = Some(content.to_string());
                out.push(' ');
            } else {
                out.push(' ');
                out.push_str(content);
                out.push(' ');
            }
        }
        out.push_str(&text[last..]);

        (out, group)
    }

    fn is_tag_list(&self, content: &str) -> bool {
        let mut tokens = content
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .peekable();
        tokens.peek().is_some() && tokens.all(|t| self.vocabulary.is_release_tag(t))
    }

    fn has_release_tag(&self, text: &str) -> bool {
        text.split(|c: char| !c.is_alphanumeric())
            .any(|t| self.vocabulary.is_release_tag(t))
    }

    /// Split a scene-style `-GROUP` suffix, only when the name carries release tags.
    fn take_trailing_group(&self, body: &str) -> (String, Option<String>) {
        let Some(pos) = body.rfind('-') else {
            return (body.to_string(), None);
        };
        let head = &body[..pos];
        let suffix = body[pos + 1..].trim();

        let plausible = !suffix.is_empty()
            && suffix.len() <= 20
            && suffix.chars().all(|c| c.is_ascii_alphanumeric())
            && !suffix.bytes().all(|b| b.is_ascii_digit())
            && !self.vocabulary.is_release_tag(suffix)
            && self.vocabulary.language(suffix).is_none();
        if plausible && self.has_release_tag(head) {
            (head.to_string(), Some(suffix.to_string()))
        } else {
            (body.to_string(), None)
        }
    }

    /// Run the idioms in order; the first hit is cut out of `working`.
    fn extract_numbering(&self, working: &mut String) -> Numbering {
        for idiom in self.vocabulary.idioms() {
            if let Some(m) = idiom.find(working) {
                working.replace_range(m.start..m.end, " ");
                return Numbering {
                    season: m.season,
                    episode: Some(m.episode),
                    episode_end: m.episode_end,
                };
            }
        }
        Numbering::default()
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty() && !self.vocabulary.is_release_tag(t))
            .map(str::to_string)
            .collect()
    }
}

fn strip_media_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((head, ext)) if !head.is_empty() && MediaKind::classify(ext).is_some() => head,
        _ => name,
    }
}

fn is_hash(content: &str) -> bool {
    content.len() == 8 && content.bytes().all(|b| b.is_ascii_hexdigit())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
