//! Naming pattern templates.

use std::path::{Component, Path};
use std::str::FromStr;
use thiserror::Error;

/// Errors in a naming pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Naming pattern is empty")]
    Empty,

    #[error("Unknown placeholder '{{{0}}}' (expected filename, lang or ext)")]
    UnknownPlaceholder(String),

    #[error("Unclosed '{{' at position {0}")]
    UnclosedBrace(usize),

    #[error("Naming pattern must contain {{ext}}")]
    MissingExtension,

    #[error("Naming pattern must stay inside the video's directory: {0}")]
    EscapesDirectory(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Filename,
    Lang,
    Ext,
}

/// A parsed target name template such as `{filename}.{lang}.{ext}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern {
    source: String,
    segments: Vec<Segment>,
}

impl NamingPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.trim().is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;
        let mut offset = 0;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or(PatternError::UnclosedBrace(offset + open))?;
            let segment = match after[..close].trim() {
                "filename" => Segment::Filename,
                "lang" => Segment::Lang,
                "ext" => Segment::Ext,
                other => return Err(PatternError::UnknownPlaceholder(other.to_string())),
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);

            let consumed = open + 1 + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.contains(&Segment::Ext) {
            return Err(PatternError::MissingExtension);
        }

        let escapes = Path::new(pattern)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(PatternError::EscapesDirectory(pattern.to_string()));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute the placeholders.
    pub fn render(&self, filename: &str, lang: &str, ext: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Filename => out.push_str(filename),
                Segment::Lang => out.push_str(lang),
                Segment::Ext => out.push_str(ext),
            }
        }
        out
    }
}

impl Default for NamingPattern {
    fn default() -> Self {
        Self {
            source: "{filename}.{lang}.{ext}".to_string(),
            segments: vec![
                Segment::Filename,
                Segment::Literal(".".to_string()),
                Segment::Lang,
                Segment::Literal(".".to_string()),
                Segment::Ext,
            ],
        }
    }
}

impl FromStr for NamingPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for NamingPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pattern() {
        let parsed: NamingPattern = "{filename}.{lang}.{ext}".parse().unwrap();
        assert_eq!(parsed, NamingPattern::default());
        assert_eq!(parsed.render("Show.S01E01", "chs", "srt"), "Show.S01E01.chs.srt");
    }

    #[test]
    fn test_custom_literals() {
        let pattern = NamingPattern::parse("{filename}-{lang}.forced.{ext}").unwrap();
        assert_eq!(pattern.render("Movie", "eng", "ass"), "Movie-eng.forced.ass");

        let pattern = NamingPattern::parse("Subs/{filename}.{ext}").unwrap();
        assert_eq!(pattern.render("Movie", "eng", "srt"), "Subs/Movie.srt");
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(NamingPattern::parse("  "), Err(PatternError::Empty));
        assert_eq!(
            NamingPattern::parse("{filename}.{language}.{ext}"),
            Err(PatternError::UnknownPlaceholder("language".to_string()))
        );
        assert_eq!(
            NamingPattern::parse("{filename}.{ext"),
            Err(PatternError::UnclosedBrace(11))
        );
        assert_eq!(
            NamingPattern::parse("{filename}.{lang}"),
            Err(PatternError::MissingExtension)
        );
        assert!(matches!(
            NamingPattern::parse("../{filename}.{ext}"),
            Err(PatternError::EscapesDirectory(_))
        ));
        assert!(matches!(
            NamingPattern::parse("/tmp/{filename}.{ext}"),
            Err(PatternError::EscapesDirectory(_))
        ));
    }
}
