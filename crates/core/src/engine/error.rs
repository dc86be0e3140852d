//! Error types for the engine module.

use thiserror::Error;

use crate::normalizer::IdiomError;
use crate::planner::PatternError;

/// Errors that stop a planning run.
///
/// Provider failures are not here: they degrade the run instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The cancellation signal fired before the plan was ready.
    #[error("Planning cancelled")]
    Cancelled,

    #[error("Invalid threshold {0}: must be between 0 and 1")]
    InvalidThreshold(f64),

    #[error("Invalid naming pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("Invalid vocabulary: {0}")]
    Vocabulary(#[from] IdiomError),
}
