//! Rename executor.
//!
//! Carries out the rename entries of a finalized [`MatchPlan`](crate::resolver::MatchPlan).
//! Dry-run is the default; nothing is moved until `dry_run` is switched off.

mod config;
mod error;
mod fs_operator;
mod traits;
mod types;

pub use config::ExecutorConfig;
pub use error::ExecutorError;
pub use fs_operator::FsOperator;
pub use traits::FileOperator;
pub use types::{EntryOutcome, ExecutionReport, OutcomeStatus, RollbackResult};
