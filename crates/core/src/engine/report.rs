//! Planning report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::matcher::{Degradation, LlmUsage, MatchMode};
use crate::resolver::MatchPlan;

/// Result of planning one directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub run_id: Uuid,
    pub directory: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub mode: MatchMode,
    pub plan: MatchPlan,
    /// Set when the semantic provider was unavailable for this batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<Degradation>,
    /// Candidate pairs proposed by the matchers.
    pub candidates_considered: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_usage: Option<LlmUsage>,
    pub duration_ms: u64,
}

impl MatchReport {
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}
