//! Human-readable and JSON rendering of plans and execution results.

use std::fmt::Write;

use serde::Serialize;

use captionmate_core::{ExecutionReport, MatchReport, PlanEntry};

/// One directory's plan and, when applied, its execution.
#[derive(Debug, Serialize)]
pub struct DirectoryOutput<'a> {
    #[serde(flatten)]
    pub report: &'a MatchReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<&'a ExecutionReport>,
}

pub fn render_json(outputs: &[DirectoryOutput<'_>]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(outputs)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn render_entry(out: &mut String, entry: &PlanEntry) {
    let _ = write!(
        out,
        "  {:<20} {:<8} {}",
        entry.action.as_str(),
        entry.language,
        entry.video.basename()
    );
    if let Some(subtitle) = &entry.subtitle {
        let _ = write!(out, " <- {}", subtitle.basename());
    }
    match (entry.score, entry.source) {
        (Some(score), Some(source)) => {
            let _ = write!(out, " [{:.2} {}]", score, source.as_str());
        }
        (Some(score), None) => {
            let _ = write!(out, " [{:.2}]", score);
        }
        _ => {}
    }
    if let Some(target) = &entry.target {
        let _ = write!(out, " => {}", file_name(target));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "      {}", entry.rationale);
}

/// Render a plan as an indented table, one block per directory.
pub fn render_report(report: &MatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} mode, {} ms)",
        report.directory.display(),
        report.mode,
        report.duration_ms
    );
    if let Some(degradation) = &report.degradation {
        let _ = writeln!(
            out,
            "  degraded: {} ({}), using rule-based matches",
            degradation.provider, degradation.reason
        );
    }
    for entry in &report.plan.entries {
        render_entry(&mut out, entry);
    }
    let summary = report.plan.summary();
    let _ = writeln!(
        out,
        "  {} rename, {} skip_existing, {} skip_low_confidence, {} conflict",
        summary.rename, summary.skip_existing, summary.skip_low_confidence, summary.conflict
    );
    out
}

/// Render the outcome of every entry that was not a no-op.
pub fn render_execution(execution: &ExecutionReport) -> String {
    let mut out = String::new();
    for outcome in execution.outcomes.iter().filter(|o| o.status.as_str() != "noop") {
        let _ = write!(out, "  {:<12} {}", outcome.status.as_str(), file_name(&outcome.video));
        if let Some(op) = &outcome.operation {
            let _ = write!(out, " ({} => {})", file_name(&op.source), file_name(&op.destination));
        }
        if let Some(backup) = &outcome.backup {
            let _ = write!(out, " backup {}", backup.display());
        }
        let _ = writeln!(out);
        if outcome.status.is_failure() {
            let _ = writeln!(out, "      {}", outcome.status);
        }
    }
    let _ = writeln!(
        out,
        "  {} applied, {} failed in {} ms",
        execution.applied(),
        execution.failures().count(),
        execution.duration_ms
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use captionmate_core::executor::EntryOutcome;
    use captionmate_core::testing::fixtures;
    use captionmate_core::{
        Degradation, MatchMode, MatchPlan, MatchSource, OutcomeStatus, PlanAction, RenameOperation,
    };

    fn report(plan: MatchPlan, degradation: Option<Degradation>) -> MatchReport {
        let json = serde_json::json!({
            "run_id": "00000000-0000-0000-0000-000000000000",
            "directory": "/tv/Show",
            "generated_at": "2026-01-01T00:00:00Z",
            "mode": MatchMode::Both,
            "plan": plan,
            "degradation": degradation,
            "candidates_considered": 3,
            "duration_ms": 12,
        });
        serde_json::from_value(json).unwrap()
    }

    fn rename_entry() -> PlanEntry {
        PlanEntry {
            video: fixtures::video("/tv/Show/Show.S01E01.mkv"),
            subtitle: Some(fixtures::subtitle("/tv/Show/show.1x01.chs.srt")),
            language: "chs".to_string(),
            action: PlanAction::Rename,
            score: Some(1.0),
            source: Some(MatchSource::Regex),
            rationale: "same episode S01E01".to_string(),
            target: Some("/tv/Show/Show.S01E01.chs.srt".into()),
            replaces: None,
            contested: Vec::new(),
        }
    }

    #[test]
    fn test_render_report() {
        let plan = MatchPlan::new(vec![rename_entry()]);
        let text = render_report(&report(plan, None));

        assert!(text.starts_with("/tv/Show (both mode, 12 ms)"));
        assert!(text.contains(
            "Show.S01E01.mkv <- show.1x01.chs.srt [1.00 regex] => Show.S01E01.chs.srt"
        ));
        assert!(text.contains("      same episode S01E01"));
        assert!(text.contains("1 rename, 0 skip_existing, 0 skip_low_confidence, 0 conflict"));
        assert!(!text.contains("degraded"));
    }

    #[test]
    fn test_render_degraded_report() {
        let degradation = Degradation {
            provider: "anthropic".to_string(),
            reason: "timed out".to_string(),
        };
        let text = render_report(&report(MatchPlan::default(), Some(degradation)));
        assert!(text.contains("degraded: anthropic (timed out)"));
    }

    #[test]
    fn test_render_execution_skips_noops() {
        let entry = rename_entry();
        let op = RenameOperation::new("/tv/Show/show.1x01.chs.srt", "/tv/Show/Show.S01E01.chs.srt");
        let mut conflict = entry.clone();
        conflict.action = PlanAction::Conflict;
        let execution = ExecutionReport {
            dry_run: false,
            outcomes: vec![
                EntryOutcome::new(&entry, Some(op), OutcomeStatus::Applied),
                EntryOutcome::new(&conflict, None, OutcomeStatus::NoOp),
            ],
            duration_ms: 4,
        };

        let text = render_execution(&execution);
        assert!(text.contains("applied      Show.S01E01.mkv (show.1x01.chs.srt => Show.S01E01.chs.srt)"));
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("1 applied, 0 failed in 4 ms"));
    }

    #[test]
    fn test_render_json_flattens_report() {
        let plan = MatchPlan::new(vec![rename_entry()]);
        let report = report(plan, None);
        let json = render_json(&[DirectoryOutput {
            report: &report,
            execution: None,
        }])
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["directory"], "/tv/Show");
        assert_eq!(value[0]["plan"]["entries"][0]["action"], "rename");
        assert!(value[0].get("execution").is_none());
    }
}
