//! Match plan types.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::matcher::MatchSource;
use crate::media::MediaFile;
use crate::normalizer::NormalizedFile;

/// What happens to a video (for one language).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Move the chosen subtitle next to the video under its target name.
    Rename,
    /// The video already has a subtitle; nothing to do.
    SkipExisting,
    /// No candidate reached the threshold.
    SkipLowConfidence,
    /// Ambiguous; needs manual review.
    Conflict,
}

impl PlanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::Rename => "rename",
            PlanAction::SkipExisting => "skip_existing",
            PlanAction::SkipLowConfidence => "skip_low_confidence",
            PlanAction::Conflict => "conflict",
        }
    }
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub video: MediaFile,
    /// Chosen subtitle (rename), or the subtitle that won the slot (pack conflict).
    pub subtitle: Option<MediaFile>,
    /// Language slot this entry fills; `"und"` when unknown.
    pub language: String,
    pub action: PlanAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MatchSource>,
    pub rationale: String,
    /// Destination path, filled in by the rename planner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    /// Existing subtitle overridden under `force`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<PathBuf>,
    /// Subtitles withheld because of this conflict.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contested: Vec<PathBuf>,
}

impl PlanEntry {
    /// An entry with no subtitle.
    pub fn skip(
        video: &MediaFile,
        language: impl Into<String>,
        action: PlanAction,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            video: video.clone(),
            subtitle: None,
            language: language.into(),
            action,
            score: None,
            source: None,
            rationale: rationale.into(),
            target: None,
            replaces: None,
            contested: Vec::new(),
        }
    }

    pub fn video_path(&self) -> &Path {
        self.video.path()
    }

    pub fn subtitle_path(&self) -> Option<&Path> {
        self.subtitle.as_ref().map(MediaFile::path)
    }
}

/// Entry counts by action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub rename: usize,
    pub skip_existing: usize,
    pub skip_low_confidence: usize,
    pub conflict: usize,
}

/// Ordered, conflict-free set of decisions for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchPlan {
    pub entries: Vec<PlanEntry>,
}

impl MatchPlan {
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries with action [`PlanAction::Rename`].
    pub fn renames(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.action == PlanAction::Rename)
    }

    pub fn count(&self, action: PlanAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            rename: self.count(PlanAction::Rename),
            skip_existing: self.count(PlanAction::SkipExisting),
            skip_low_confidence: self.count(PlanAction::SkipLowConfidence),
            conflict: self.count(PlanAction::Conflict),
        }
    }

    /// Entries for one video.
    pub fn entries_for<'a>(&'a self, video: &'a Path) -> impl Iterator<Item = &'a PlanEntry> + 'a {
        self.entries.iter().filter(move |e| e.video_path() == video)
    }
}

/// A video as seen by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoState {
    pub video: NormalizedFile,
    /// Subtitles already sitting next to the video under its name.
    pub existing: Vec<NormalizedFile>,
}

impl VideoState {
    pub fn new(video: NormalizedFile) -> Self {
        Self {
            video,
            existing: Vec::new(),
        }
    }

    pub fn with_existing(mut self, existing: Vec<NormalizedFile>) -> Self {
        self.existing = existing;
        self
    }

    pub fn path(&self) -> &Path {
        self.video.file.path()
    }

    pub fn has_existing(&self) -> bool {
        !self.existing.is_empty()
    }

    /// Existing subtitle for a language slot.
    pub fn existing_for(&self, language: &str) -> Option<&NormalizedFile> {
        self.existing
            .iter()
            .find(|e| e.language_or_und() == language)
    }
}

/// Options the resolver depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOptions {
    /// Minimum score for assignment (inclusive).
    pub threshold: f64,
    /// Keep videos with existing subtitles eligible.
    pub force: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            force: false,
        }
    }
}
