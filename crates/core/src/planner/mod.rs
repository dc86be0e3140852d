//! Rename planner.
//!
//! Turns resolved plan entries into target paths and reversible rename
//! operations. Nothing here touches the filesystem; the executor does.

mod pattern;

pub use pattern::{NamingPattern, PatternError};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;

use crate::resolver::{MatchPlan, PlanAction, PlanEntry};

/// Target path for a rename entry.
///
/// The name is the pattern rendered with the video's stem, the entry's
/// language (`"und"` when unknown) and the subtitle's extension, placed in the
/// video's directory. Returns `None` for entries without a subtitle.
pub fn plan_rename(entry: &PlanEntry, pattern: &NamingPattern) -> Option<PathBuf> {
    let subtitle = entry.subtitle.as_ref()?;
    let language = if entry.language.trim().is_empty() {
        "und"
    } else {
        entry.language.as_str()
    };
    let name = pattern.render(entry.video.stem(), language, subtitle.extension());
    Some(entry.video.directory().join(name))
}

/// Fill in targets for every rename entry.
///
/// A second entry aiming at an already claimed destination becomes a
/// conflict; a subtitle already sitting at its target needs no work.
pub fn finalize_plan(mut plan: MatchPlan, pattern: &NamingPattern) -> MatchPlan {
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for entry in plan.entries.iter_mut() {
        if entry.action != PlanAction::Rename {
            continue;
        }
        let Some(target) = plan_rename(entry, pattern) else {
            continue;
        };

        if entry.subtitle_path() == Some(target.as_path()) {
            entry.action = PlanAction::SkipExisting;
            entry.rationale = format!("{}; already named correctly", entry.rationale);
            entry.target = Some(target);
            continue;
        }

        if !claimed.insert(target.clone()) {
            warn!(target = %target.display(), "Two plan entries resolve to the same target");
            if let Some(subtitle) = entry.subtitle.take() {
                entry.contested = vec![subtitle.path().to_path_buf()];
            }
            entry.action = PlanAction::Conflict;
            entry.rationale = format!(
                "target {} is already claimed by another entry",
                target.display()
            );
            entry.replaces = None;
            continue;
        }

        entry.target = Some(target);
    }

    plan
}

/// A single reversible file move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// File at `destination` that the move overwrites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<PathBuf>,
}

impl RenameOperation {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            replaces: None,
        }
    }

    /// The operation for a finalized rename entry.
    pub fn from_entry(entry: &PlanEntry) -> Option<Self> {
        if entry.action != PlanAction::Rename {
            return None;
        }
        Some(Self {
            source: entry.subtitle_path()?.to_path_buf(),
            destination: entry.target.clone()?,
            replaces: entry.replaces.clone(),
        })
    }

    /// The move that undoes this one. Restoring a replaced file is the
    /// executor's job, since it owns the backup.
    pub fn inverse(&self) -> Self {
        Self {
            source: self.destination.clone(),
            destination: self.source.clone(),
            replaces: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.source == self.destination
    }
}
