//! Prometheus metrics for the matching pipeline.
//!
//! This module provides metrics for:
//! - Matchers (candidates proposed, semantic provider calls, LLM tokens)
//! - Planning (plan entries by action, planning duration)
//! - Execution (file operations)
//!
//! Metrics are created lazily; register them with [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Matchers
// =============================================================================

/// Candidate pairs proposed, by source.
pub static CANDIDATES_PROPOSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "captionmate_candidates_proposed_total",
            "Total candidate pairs proposed by the matchers",
        ),
        &["source"], // "regex", "ai"
    )
    .unwrap()
});

/// Semantic provider requests, by provider and outcome.
pub static SEMANTIC_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "captionmate_semantic_requests_total",
            "Total semantic provider requests",
        ),
        &["provider", "outcome"], // outcome: "success", "degraded", "cancelled"
    )
    .unwrap()
});

/// Semantic provider request duration in seconds.
pub static SEMANTIC_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "captionmate_semantic_duration_seconds",
            "Duration of semantic provider requests",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["provider"],
    )
    .unwrap()
});

/// Semantic pairs discarded during validation, by reason.
pub static SEMANTIC_PAIRS_DISCARDED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "captionmate_semantic_pairs_discarded_total",
            "Pairs returned by the semantic provider that failed validation",
        ),
        &["reason"], // "video_index", "subtitle_index"
    )
    .unwrap()
});

/// LLM token usage.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("captionmate_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Planning
// =============================================================================

/// Plan entries produced, by action.
pub static PLAN_ENTRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("captionmate_plan_entries_total", "Total match plan entries"),
        &["action"], // "rename", "skip_existing", "skip_low_confidence", "conflict"
    )
    .unwrap()
});

/// Time to plan one directory, in seconds.
pub static PLAN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "captionmate_plan_duration_seconds",
            "Duration of planning one directory",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]),
    )
    .unwrap()
});

// =============================================================================
// Execution
// =============================================================================

/// File operations, by result.
pub static FILE_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("captionmate_file_operations_total", "Total file operations"),
        &["result"], // "applied", "would_apply", "noop", "failed", "rolled_back"
    )
    .unwrap()
});

/// Get all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Matchers
        Box::new(CANDIDATES_PROPOSED.clone()),
        Box::new(SEMANTIC_REQUESTS.clone()),
        Box::new(SEMANTIC_DURATION.clone()),
        Box::new(SEMANTIC_PAIRS_DISCARDED.clone()),
        Box::new(LLM_TOKENS.clone()),
        // Planning
        Box::new(PLAN_ENTRIES.clone()),
        Box::new(PLAN_DURATION.clone()),
        // Execution
        Box::new(FILE_OPERATIONS.clone()),
    ]
}
