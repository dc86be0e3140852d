//! Mock file operator for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::executor::{EntryOutcome, ExecutionReport, FileOperator, OutcomeStatus, RollbackResult};
use crate::planner::RenameOperation;
use crate::resolver::MatchPlan;

/// Mock implementation of the FileOperator trait.
///
/// Never touches the filesystem. Every rename entry is reported as applied
/// unless its source was registered with [`fail_source`](Self::fail_source).
#[derive(Debug, Default)]
pub struct MockFileOperator {
    /// Plans passed to `execute`.
    executed: Arc<RwLock<Vec<MatchPlan>>>,
    /// Sources whose rename fails.
    failing: Arc<RwLock<HashSet<PathBuf>>>,
    /// Number of rollback calls.
    rollbacks: Arc<RwLock<usize>>,
}

impl MockFileOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make renames of this source fail.
    pub async fn fail_source(&self, source: impl AsRef<Path>) {
        self.failing
            .write()
            .await
            .insert(source.as_ref().to_path_buf());
    }

    /// Get all executed plans.
    pub async fn executed_plans(&self) -> Vec<MatchPlan> {
        self.executed.read().await.clone()
    }

    /// Every rename operation seen so far, in order.
    pub async fn operations(&self) -> Vec<RenameOperation> {
        self.executed
            .read()
            .await
            .iter()
            .flat_map(|plan| plan.entries.iter().filter_map(RenameOperation::from_entry))
            .collect()
    }

    pub async fn rollback_count(&self) -> usize {
        *self.rollbacks.read().await
    }
}

#[async_trait]
impl FileOperator for MockFileOperator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, plan: &MatchPlan) -> ExecutionReport {
        self.executed.write().await.push(plan.clone());
        let failing = self.failing.read().await;

        let outcomes = plan
            .entries
            .iter()
            .map(|entry| match RenameOperation::from_entry(entry) {
                None => EntryOutcome::new(entry, None, OutcomeStatus::NoOp),
                Some(op) => {
                    let status = if failing.contains(&op.source) {
                        OutcomeStatus::Failed("mock failure".to_string())
                    } else {
                        OutcomeStatus::Applied
                    };
                    EntryOutcome::new(entry, Some(op), status)
                }
            })
            .collect();

        ExecutionReport {
            dry_run: false,
            outcomes,
            duration_ms: 0,
        }
    }

    async fn rollback(&self, report: &ExecutionReport) -> RollbackResult {
        *self.rollbacks.write().await += 1;
        RollbackResult {
            reverted: report.applied(),
            errors: Vec::new(),
            success: true,
        }
    }
}
