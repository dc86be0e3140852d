//! Tag vocabularies and episode numbering idioms.
//!
//! Everything the normalizer recognizes lives in a [`Vocabulary`] so new
//! naming conventions can be added from configuration without touching the
//! matching code.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised when building a custom numbering idiom.
#[derive(Debug, Error)]
pub enum IdiomError {
    #[error("Invalid pattern for idiom '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Idiom '{name}' is missing the named group '{group}'")]
    MissingGroup { name: String, group: &'static str },
}

/// What a numbering idiom extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdiomKind {
    /// Captures `season` and `episode` (and optionally `episode_end`).
    SeasonEpisode,
    /// Captures `episode` (and optionally `episode_end`) only.
    EpisodeOnly,
}

/// A season/episode numbering convention expressed as a regex with named groups.
///
/// Patterns run against a lowercased name where `.` and `_` are replaced by spaces.
/// An optional `body` group marks the span cut out of the name; without it the
/// whole match is cut.
#[derive(Debug, Clone)]
pub struct NumberingIdiom {
    name: String,
    pattern: Regex,
    kind: IdiomKind,
}

/// Numbers found by an idiom and the byte range they occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdiomMatch {
    pub season: Option<u32>,
    pub episode: u32,
    pub episode_end: Option<u32>,
    pub start: usize,
    pub end: usize,
}

impl NumberingIdiom {
    /// Compile an idiom, checking that the groups its kind needs are present.
    pub fn new(name: impl Into<String>, pattern: &str, kind: IdiomKind) -> Result<Self, IdiomError> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|e| IdiomError::InvalidPattern {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        let groups: Vec<&str> = pattern.capture_names().flatten().collect();
        let required: &[&'static str] = match kind {
            IdiomKind::SeasonEpisode => &["season", "episode"],
            IdiomKind::EpisodeOnly => &["episode"],
        };
        for group in required {
            if !groups.contains(group) {
                return Err(IdiomError::MissingGroup { name, group });
            }
        }

        Ok(Self { name, pattern, kind })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IdiomKind {
        self.kind
    }

    /// Find the first occurrence of this idiom in `text`.
    pub fn find(&self, text: &str) -> Option<IdiomMatch> {
        let caps = self.pattern.captures(text)?;
        let span = caps.name("body").or_else(|| caps.get(0))?;
        let number = |group: &str| caps.name(group).and_then(|m| m.as_str().parse::<u32>().ok());

        let episode = number("episode")?;
        let season = match self.kind {
            IdiomKind::SeasonEpisode => Some(number("season")?),
            IdiomKind::EpisodeOnly => None,
        };
        // Ranges are only believable when they run forward and stay short
        let episode_end = number("episode_end").filter(|end| *end > episode && *end - episode <= 50);

        // A rejected bare "-720" after the episode stays in the name
        let mut end = span.end();
        if let (None, Some(ep), Some(rejected)) =
            (episode_end, caps.name("episode"), caps.name("episode_end"))
        {
            if !text[ep.end()..rejected.start()].contains('e') {
                end = ep.end();
            }
        }

        Some(IdiomMatch {
            season,
            episode,
            episode_end,
            start: span.start(),
            end,
        })
    }
}

const RELEASE_TAGS: &[&str] = &[
    // Resolution
    "2160p", "1080p", "1080i", "720p", "576p", "480p", "4k", "uhd",
    // Dynamic range
    "hdr", "hdr10", "dovi", "sdr",
    // Video codecs
    "x264", "x265", "h264", "h265", "hevc", "avc", "xvid", "divx", "av1", "10bit", "8bit",
    // Sources
    "bluray", "bdrip", "brrip", "bdremux", "remux", "webdl", "webrip", "hdtv", "dvdrip", "dvd",
    "hdrip", "amzn", "nf", "dsnp", "hmax", "atvp",
    // Audio
    "aac", "aac20", "ac3", "eac3", "dts", "dtshd", "truehd", "atmos", "flac", "mp3", "dd51",
    "ddp51",
    // Release flags
    "proper", "repack", "internal", "limited", "extended", "unrated",
];

/// Multi-part tags collapsed into single tokens before tokenization.
const TAG_REWRITES: &[(&str, &str)] = &[
    ("web-dl", "webdl"),
    ("web-rip", "webrip"),
    ("blu-ray", "bluray"),
    ("h.264", "h264"),
    ("h.265", "h265"),
    ("ddp5.1", "ddp51"),
    ("dd5.1", "dd51"),
    ("aac2.0", "aac20"),
    ("dts-hd", "dtshd"),
    ("5.1", " "),
    ("7.1", " "),
];

const LANGUAGE_CODES: &[&str] = &[
    "chs", "cht", "chi", "zho", "zh", "zh-cn", "zh-tw", "zh-hk", "zh-hans", "zh-hant", "sc",
    "tc", "gb", "big5", "en", "eng", "ja", "jp", "jpn", "ko", "kor", "fr", "fre", "fra", "de",
    "ger", "deu", "es", "spa", "it", "ita", "pt", "por", "pt-br", "ru", "rus", "ar", "ara", "nl",
    "dut", "nld", "pl", "pol", "sv", "swe", "tr", "tur", "vi", "vie", "th", "tha", "und",
];

/// Spelled-out language names mapped onto their codes.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("简体", "chs"),
    ("简中", "chs"),
    ("繁体", "cht"),
    ("繁體", "cht"),
    ("繁中", "cht"),
    ("中文", "chi"),
    ("英文", "eng"),
    ("日文", "jpn"),
];

fn builtin_idioms() -> Vec<NumberingIdiom> {
    let table: &[(&str, &str, IdiomKind)] = &[
        (
            "sxxeyy",
            r"(?:^|[^0-9])(?P<body>s(?P<season>\d{1,2}) ?e(?P<episode>\d{1,4})(?:(?:-e?|e)(?P<episode_end>\d{1,4}))?(?:v\d{1,2})?)(?:$|[^0-9])",
            IdiomKind::SeasonEpisode,
        ),
        (
            "chinese_season_episode",
            r"第(?P<season>\d{1,2})季 ?第(?P<episode>\d{1,4})[集话話]",
            IdiomKind::SeasonEpisode,
        ),
        (
            "nxnn",
            r"(?:^|[^a-z0-9])(?P<body>(?P<season>\d{1,2})x(?P<episode>\d{2,3}))(?:$|[^a-z0-9])",
            IdiomKind::SeasonEpisode,
        ),
        (
            "season_episode_words",
            r"season ?(?P<season>\d{1,2}) ?(?:episode|ep) ?(?P<episode>\d{1,4})",
            IdiomKind::SeasonEpisode,
        ),
        (
            "chinese_episode",
            r"第(?P<episode>\d{1,4})[集话話]",
            IdiomKind::EpisodeOnly,
        ),
        (
            "episode_marker",
            r"(?:^|[^a-z0-9])(?P<body>(?:episode ?|ep ?|e)(?P<episode>\d{1,4}))(?:$|[^a-z0-9])",
            IdiomKind::EpisodeOnly,
        ),
    ];

    table
        .iter()
        .map(|(name, pattern, kind)| {
            NumberingIdiom::new(*name, pattern, *kind).expect("built-in idiom must compile")
        })
        .collect()
}

/// The normalizer's lookup tables.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    release_tags: HashSet<String>,
    tag_rewrites: Vec<(String, String)>,
    languages: HashMap<String, String>,
    idioms: Vec<NumberingIdiom>,
    /// Digit counts accepted for a bare episode number.
    standalone_digits: (usize, usize),
    /// Four-digit numbers in this range are years, never episodes.
    year_range: (u32, u32),
}

impl Default for Vocabulary {
    fn default() -> Self {
        let mut languages: HashMap<String, String> = LANGUAGE_CODES
            .iter()
            .map(|c| (c.to_string(), c.to_string()))
            .collect();
        for (alias, code) in LANGUAGE_ALIASES {
            languages.insert(alias.to_string(), code.to_string());
        }

        Self {
            release_tags: RELEASE_TAGS.iter().map(|t| t.to_string()).collect(),
            tag_rewrites: TAG_REWRITES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            languages,
            idioms: builtin_idioms(),
            standalone_digits: (2, 4),
            year_range: (1900, 2099),
        }
    }
}

impl Vocabulary {
    /// Add release tags (matched case-insensitively as whole tokens).
    pub fn with_release_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.release_tags
            .extend(tags.into_iter().map(|t| t.as_ref().to_lowercase()));
        self
    }

    /// Add language codes that map onto themselves.
    pub fn with_language_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for code in codes {
            let code = code.as_ref().to_lowercase();
            self.languages.insert(code.clone(), code);
        }
        self
    }

    /// Add a custom idiom. Custom idioms are tried before the built-in ones.
    pub fn with_idiom(mut self, idiom: NumberingIdiom) -> Self {
        let custom = self
            .idioms
            .iter()
            .take_while(|i| !is_builtin(i.name()))
            .count();
        self.idioms.insert(custom, idiom);
        self
    }

    pub fn idioms(&self) -> &[NumberingIdiom] {
        &self.idioms
    }

    pub fn is_release_tag(&self, token: &str) -> bool {
        self.release_tags.contains(token)
    }

    /// Canonical language code for a token, if it is one.
    pub fn language(&self, token: &str) -> Option<&str> {
        self.languages.get(token).map(String::as_str)
    }

    /// Collapse multi-part tags (`web-dl`, `h.264`) into single tokens.
    pub fn rewrite_tags(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (from, to) in &self.tag_rewrites {
            out = replace_bounded(&out, from, to);
        }
        out
    }

    /// Episode number for a bare numeric token, if it qualifies as one.
    pub fn standalone_episode(&self, token: &str) -> Option<u32> {
        let (min, max) = self.standalone_digits;
        if token.len() < min || token.len() > max || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = token.parse().ok()?;
        if token.len() == 4 && (self.year_range.0..=self.year_range.1).contains(&value) {
            return None;
        }
        Some(value)
    }
}

fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "sxxeyy"
            | "chinese_season_episode"
            | "nxnn"
            | "season_episode_words"
            | "chinese_episode"
            | "episode_marker"
    )
}

/// Replace `from` with `to` only where it is not glued to other alphanumerics.
fn replace_bounded(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(from) {
        let before_ok = rest[..pos]
            .chars()
            .next_back()
            .map_or(out.chars().next_back().map_or(true, |c| !c.is_alphanumeric()), |c| {
                !c.is_alphanumeric()
            });
        let after = &rest[pos + from.len()..];
        let after_ok = after.chars().next().map_or(true, |c| !c.is_alphanumeric());

        out.push_str(&rest[..pos]);
        if before_ok && after_ok {
            out.push_str(to);
        } else {
            out.push_str(from);
        }
        rest = after;
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_idioms_compile() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.idioms().len(), 6);
        assert_eq!(vocab.idioms()[0].name(), "sxxeyy");
    }

    #[test]
    fn test_sxxeyy_with_range() {
        let vocab = Vocabulary::default();
        let m = vocab.idioms()[0].find("show s01e03-e05 720p").unwrap();
        assert_eq!(m.season, Some(1));
        assert_eq!(m.episode, 3);
        assert_eq!(m.episode_end, Some(5));

        let m = vocab.idioms()[0].find("show s01e03e04").unwrap();
        assert_eq!(m.episode_end, Some(4));
    }

    #[test]
    fn test_sxxeyy_ignores_resolution_after_dash() {
        let vocab = Vocabulary::default();
        let m = vocab.idioms()[0].find("show s02e05-720p").unwrap();
        assert_eq!(m.episode, 5);
        assert_eq!(m.episode_end, None);
    }

    #[test]
    fn test_backwards_range_rejected() {
        let vocab = Vocabulary::default();
        let m = vocab.idioms()[0].find("show s01e05-e02").unwrap();
        assert_eq!(m.episode_end, None);
    }

    #[test]
    fn test_custom_idiom_requires_groups() {
        let err = NumberingIdiom::new("bad", r"(\d+)", IdiomKind::EpisodeOnly).unwrap_err();
        assert!(matches!(err, IdiomError::MissingGroup { group: "episode", .. }));

        let err = NumberingIdiom::new("broken", r"(?P<episode>\d+", IdiomKind::EpisodeOnly)
            .unwrap_err();
        assert!(matches!(err, IdiomError::InvalidPattern { .. }));
    }

    #[test]
    fn test_custom_idiom_tried_first() {
        let idiom = NumberingIdiom::new(
            "vol_chapter",
            r"vol ?(?P<season>\d+) ?ch ?(?P<episode>\d+)",
            IdiomKind::SeasonEpisode,
        )
        .unwrap();
        let second = NumberingIdiom::new("part", r"part ?(?P<episode>\d+)", IdiomKind::EpisodeOnly)
            .unwrap();
        let vocab = Vocabulary::default().with_idiom(idiom).with_idiom(second);

        assert_eq!(vocab.idioms()[0].name(), "vol_chapter");
        assert_eq!(vocab.idioms()[1].name(), "part");
        assert_eq!(vocab.idioms()[2].name(), "sxxeyy");
    }

    #[test]
    fn test_release_tags_and_languages() {
        let vocab = Vocabulary::default()
            .with_release_tags(["CtrlHD"])
            .with_language_codes(["FIL"]);

        assert!(vocab.is_release_tag("1080p"));
        assert!(vocab.is_release_tag("ctrlhd"));
        assert!(!vocab.is_release_tag("show"));
        assert_eq!(vocab.language("chs"), Some("chs"));
        assert_eq!(vocab.language("简体"), Some("chs"));
        assert_eq!(vocab.language("fil"), Some("fil"));
        assert_eq!(vocab.language("show"), None);
    }

    #[test]
    fn test_rewrite_tags_bounded() {
        let vocab = Vocabulary::default();
        assert_eq!(
            vocab.rewrite_tags("show.s01e01.web-dl.h.264.dd5.1"),
            "show.s01e01.webdl.h264.dd51"
        );
        // Glued to a digit, so not a channel layout
        assert_eq!(vocab.rewrite_tags("vol25.1"), "vol25.1");
    }

    #[test]
    fn test_standalone_episode() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.standalone_episode("05"), Some(5));
        assert_eq!(vocab.standalone_episode("125"), Some(125));
        assert_eq!(vocab.standalone_episode("1024"), Some(1024));
        assert_eq!(vocab.standalone_episode("2010"), None);
        assert_eq!(vocab.standalone_episode("5"), None);
        assert_eq!(vocab.standalone_episode("12345"), None);
        assert_eq!(vocab.standalone_episode("0a"), None);
    }
}
