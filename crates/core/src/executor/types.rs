//! Execution report types.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::planner::RenameOperation;
use crate::resolver::{PlanAction, PlanEntry};

/// What happened to one plan entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The rename was carried out.
    Applied,
    /// Dry run: the rename passed its checks.
    WouldApply,
    /// Nothing to do for this entry.
    NoOp,
    /// The rename failed; nothing was changed for this entry.
    Failed(String),
    /// The rename was applied, then undone after a later failure.
    RolledBack,
    /// Not attempted because the run was aborted.
    Aborted(String),
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Applied => "applied",
            OutcomeStatus::WouldApply => "would_apply",
            OutcomeStatus::NoOp => "noop",
            OutcomeStatus::Failed(_) => "failed",
            OutcomeStatus::RolledBack => "rolled_back",
            OutcomeStatus::Aborted(_) => "aborted",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeStatus::Failed(_) | OutcomeStatus::Aborted(_))
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Failed(reason) | OutcomeStatus::Aborted(reason) => {
                write!(f, "{}: {}", self.as_str(), reason)
            }
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Outcome of one plan entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub video: PathBuf,
    pub language: String,
    pub action: PlanAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<RenameOperation>,
    pub status: OutcomeStatus,
    /// Where the replaced subtitle was moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

impl EntryOutcome {
    pub fn new(entry: &PlanEntry, operation: Option<RenameOperation>, status: OutcomeStatus) -> Self {
        Self {
            video: entry.video_path().to_path_buf(),
            language: entry.language.clone(),
            action: entry.action,
            operation,
            status,
            backup: None,
        }
    }

    pub fn video_path(&self) -> &Path {
        &self.video
    }
}

/// Result of executing a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub outcomes: Vec<EntryOutcome>,
    pub duration_ms: u64,
}

impl ExecutionReport {
    pub fn count(&self, status: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status.as_str() == status)
            .count()
    }

    pub fn applied(&self) -> usize {
        self.count("applied")
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure())
    }

    /// True when no entry failed or was aborted.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Result of a rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackResult {
    pub reverted: usize,
    pub errors: Vec<String>,
    pub success: bool,
}
