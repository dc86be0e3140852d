//! Types produced and consumed by the matchers.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::matcher::llm::LlmUsage;
use crate::normalizer::NormalizedFile;

/// Highest score anything other than an exact regex match may carry.
pub const APPROXIMATE_SCORE_CAP: f64 = 0.99;

/// Which matcher proposed a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchSource {
    #[serde(rename = "regex")]
    Regex,
    #[serde(rename = "ai")]
    Ai,
    /// Proposed by both matchers.
    #[serde(rename = "regex+ai")]
    RegexAndAi,
}

impl MatchSource {
    /// Tiebreak rank at equal score; lower wins. Deterministic rules are trusted first.
    pub fn rank(&self) -> u8 {
        match self {
            MatchSource::Regex | MatchSource::RegexAndAi => 0,
            MatchSource::Ai => 1,
        }
    }

    /// Source after merging with another proposal of the same pair.
    pub fn merge(self, other: MatchSource) -> MatchSource {
        if self == other {
            self
        } else {
            MatchSource::RegexAndAi
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Regex => "regex",
            MatchSource::Ai => "ai",
            MatchSource::RegexAndAi => "regex+ai",
        }
    }
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed (video, subtitle) association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub video: NormalizedFile,
    pub subtitle: NormalizedFile,
    /// Confidence in [0, 1].
    pub score: f64,
    pub source: MatchSource,
    /// One entry per matcher that proposed the pair.
    pub rationale: Vec<String>,
}

impl CandidatePair {
    /// Create a pair, clamping the score into [0, 1].
    pub fn new(
        video: NormalizedFile,
        subtitle: NormalizedFile,
        score: f64,
        source: MatchSource,
        rationale: impl Into<String>,
    ) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            video,
            subtitle,
            score,
            source,
            rationale: vec![rationale.into()],
        }
    }

    pub fn video_path(&self) -> &Path {
        self.video.file.path()
    }

    pub fn subtitle_path(&self) -> &Path {
        self.subtitle.file.path()
    }

    /// Fold another proposal of the same pair into this one.
    pub fn absorb(&mut self, other: CandidatePair) {
        self.score = self.score.max(other.score);
        self.source = self.source.merge(other.source);
        for reason in other.rationale {
            if !self.rationale.contains(&reason) {
                self.rationale.push(reason);
            }
        }
    }
}

/// Sort candidates by (video path, descending score, subtitle path).
pub(crate) fn sort_candidates(candidates: &mut [CandidatePair]) {
    candidates.sort_by(|a, b| {
        a.video_path()
            .cmp(b.video_path())
            .then(b.score.total_cmp(&a.score))
            .then(a.subtitle_path().cmp(b.subtitle_path()))
    });
}

/// Request sent to a semantic provider for one directory batch.
///
/// Carries normalized display names only, never raw paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingRequest {
    pub videos: Vec<String>,
    pub subtitles: Vec<String>,
    pub instructions: String,
}

impl PairingRequest {
    pub fn from_files(
        videos: &[NormalizedFile],
        subtitles: &[NormalizedFile],
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            videos: videos.iter().map(describe).collect(),
            subtitles: subtitles.iter().map(describe).collect(),
            instructions: instructions.into(),
        }
    }
}

/// Name shown to the provider: the normalized key, plus the file's own name
/// when normalization recovered nothing useful.
fn describe(file: &NormalizedFile) -> String {
    let display = file.key.display_name();
    if display.is_empty() {
        file.file.stem().to_string()
    } else {
        display
    }
}

/// One pairing proposed by a semantic provider, as returned (not yet validated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedPair {
    pub video_index: i64,
    pub subtitle_index: i64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ProposedPair {
    pub fn new(video_index: i64, subtitle_index: i64, confidence: f64) -> Self {
        Self {
            video_index,
            subtitle_index,
            confidence,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// A semantic provider's answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairingResponse {
    pub pairs: Vec<ProposedPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<LlmUsage>,
}

/// Why the semantic matcher produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub provider: String,
    pub reason: String,
}

/// Result of one semantic matching batch.
#[derive(Debug, Clone, Default)]
pub struct SemanticOutcome {
    pub candidates: Vec<CandidatePair>,
    /// Set when the provider failed; `candidates` is then empty.
    pub degradation: Option<Degradation>,
    pub usage: Option<LlmUsage>,
}

impl SemanticOutcome {
    pub fn degraded(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            candidates: Vec::new(),
            degradation: Some(Degradation {
                provider: provider.into(),
                reason: reason.into(),
            }),
            usage: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}
