//! File operator trait definition.

use async_trait::async_trait;

use super::types::{ExecutionReport, RollbackResult};
use crate::resolver::MatchPlan;

/// Applies a finalized match plan to storage.
///
/// Each rename is all-or-nothing: on failure the source stays where it was
/// and no partial destination is left behind. Failures are recorded per entry
/// in the report rather than aborting the call.
#[async_trait]
pub trait FileOperator: Send + Sync {
    /// Returns the name of this operator.
    fn name(&self) -> &str;

    /// Execute every rename entry of the plan.
    ///
    /// Skip and conflict entries are reported as no-ops.
    async fn execute(&self, plan: &MatchPlan) -> ExecutionReport;

    /// Undo the applied renames of a report, newest first.
    async fn rollback(&self, report: &ExecutionReport) -> RollbackResult;
}
