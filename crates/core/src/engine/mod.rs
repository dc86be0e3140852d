//! Matching engine.
//!
//! Coordinates one planning run per directory:
//!
//! listing → normalizer → {regex matcher, semantic matcher} → resolver →
//! rename planner → [`MatchReport`]
//!
//! The engine never touches the filesystem; executing the plan is the
//! [`FileOperator`](crate::executor::FileOperator)'s job.

mod error;
mod existing;
mod report;

pub use error::EngineError;
pub use report::MatchReport;

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::matcher::{
    CandidatePair, MatchMode, MatchingConfig, RegexMatcher, SemanticMatcher, SemanticOutcome,
    SemanticProvider,
};
use crate::media::DirectoryListing;
use crate::metrics;
use crate::normalizer::{NormalizedFile, Normalizer};
use crate::planner::{finalize_plan, NamingPattern};
use crate::resolver::{resolve_videos, PlanAction, ResolveOptions, VideoState};

/// Plans subtitle renames for directory listings.
#[derive(Clone)]
pub struct MatchEngine {
    config: MatchingConfig,
    normalizer: Arc<Normalizer>,
    pattern: NamingPattern,
    regex: RegexMatcher,
    semantic: Option<SemanticMatcher>,
}

impl MatchEngine {
    /// Create an engine without a semantic provider.
    pub fn new(config: MatchingConfig, normalizer: Normalizer) -> Result<Self, EngineError> {
        let threshold = config.threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::InvalidThreshold(threshold));
        }
        let pattern = NamingPattern::parse(&config.naming_pattern)?;

        Ok(Self {
            config,
            normalizer: Arc::new(normalizer),
            pattern,
            regex: RegexMatcher::default(),
            semantic: None,
        })
    }

    /// Create an engine from the `[matching]` and `[vocabulary]` sections.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        Self::new(config.matching.clone(), config.normalizer()?)
    }

    pub fn with_semantic_provider(mut self, provider: Arc<dyn SemanticProvider>) -> Self {
        self.semantic = Some(SemanticMatcher::new(provider));
        self
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn naming_pattern(&self) -> &NamingPattern {
        &self.pattern
    }

    /// Plan one directory.
    pub async fn plan_directory(
        &self,
        listing: &DirectoryListing,
    ) -> Result<MatchReport, EngineError> {
        self.plan(listing, None).await
    }

    /// Plan one directory, giving up when `cancel` turns `true`.
    ///
    /// An in-flight semantic request is abandoned and its result discarded.
    pub async fn plan_directory_with_cancel(
        &self,
        listing: &DirectoryListing,
        cancel: watch::Receiver<bool>,
    ) -> Result<MatchReport, EngineError> {
        self.plan(listing, Some(cancel)).await
    }

    /// Plan several directories concurrently, one batch each.
    ///
    /// Results are in listing order.
    pub async fn plan_directories(
        &self,
        listings: &[DirectoryListing],
        cancel: Option<watch::Receiver<bool>>,
    ) -> Vec<Result<MatchReport, EngineError>> {
        let batches: Vec<_> = listings
            .iter()
            .map(|listing| self.plan(listing, cancel.clone()))
            .collect();
        futures::future::join_all(batches).await
    }

    async fn plan(
        &self,
        listing: &DirectoryListing,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<MatchReport, EngineError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(EngineError::Cancelled);
        }

        let (states, pool) = self.prepare(listing);
        let eligible: Vec<NormalizedFile> = states
            .iter()
            .filter(|s| self.config.force || !s.has_existing())
            .map(|s| s.video.clone())
            .collect();

        debug!(
            directory = %listing.directory.display(),
            videos = states.len(),
            eligible = eligible.len(),
            subtitles = pool.len(),
            mode = %self.config.mode,
            "Planning directory"
        );

        let mut candidates: Vec<CandidatePair> = Vec::new();
        let mut semantic = SemanticOutcome::default();

        if self.config.mode.can_use_ai() {
            semantic = match &self.semantic {
                Some(matcher) => {
                    self.run_semantic(matcher, &eligible, &pool, cancel).await?
                }
                None if self.config.mode == MatchMode::Ai => {
                    SemanticOutcome::degraded("none", "no semantic provider configured")
                }
                None => SemanticOutcome::default(),
            };
            if let Some(degradation) = &semantic.degradation {
                warn!(
                    directory = %listing.directory.display(),
                    provider = %degradation.provider,
                    reason = %degradation.reason,
                    "Semantic matching degraded"
                );
            }
            metrics::CANDIDATES_PROPOSED
                .with_label_values(&["ai"])
                .inc_by(semantic.candidates.len() as u64);
            candidates.append(&mut semantic.candidates);
        }

        let regex_fallback = self.config.mode == MatchMode::Ai && semantic.is_degraded();
        if self.config.mode.uses_regex() || regex_fallback {
            if regex_fallback {
                info!(directory = %listing.directory.display(), "Falling back to regex matching");
            }
            let regex_candidates = self.regex.match_pairs(&eligible, &pool);
            metrics::CANDIDATES_PROPOSED
                .with_label_values(&["regex"])
                .inc_by(regex_candidates.len() as u64);
            candidates.extend(regex_candidates);
        }

        let options = ResolveOptions {
            threshold: self.config.threshold,
            force: self.config.force,
        };
        let plan = finalize_plan(resolve_videos(&states, &candidates, &options), &self.pattern);

        for entry in &plan.entries {
            metrics::PLAN_ENTRIES
                .with_label_values(&[entry.action.as_str()])
                .inc();
        }
        metrics::PLAN_DURATION.observe(started.elapsed().as_secs_f64());

        let summary = plan.summary();
        info!(
            directory = %listing.directory.display(),
            renames = summary.rename,
            skip_existing = summary.skip_existing,
            skip_low_confidence = summary.skip_low_confidence,
            conflicts = summary.conflict,
            degraded = semantic.is_degraded(),
            "Planned directory"
        );
        if plan.count(PlanAction::Conflict) > 0 {
            warn!(
                directory = %listing.directory.display(),
                conflicts = summary.conflict,
                "Plan has conflicts that need manual review"
            );
        }

        Ok(MatchReport {
            run_id,
            directory: listing.directory.clone(),
            generated_at: Utc::now(),
            mode: self.config.mode,
            candidates_considered: candidates.len(),
            plan,
            degradation: semantic.degradation,
            llm_usage: semantic.usage,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Normalize the listing into video states and the free subtitle pool.
    ///
    /// Subtitles already named after a video are attached to it and kept out
    /// of the pool; subtitles in unwanted languages are dropped.
    fn prepare(&self, listing: &DirectoryListing) -> (Vec<VideoState>, Vec<NormalizedFile>) {
        let videos: Vec<NormalizedFile> = listing
            .videos
            .iter()
            .map(|v| self.normalizer.normalize_file(v))
            .collect();

        let mut states: Vec<VideoState> = videos.iter().cloned().map(VideoState::new).collect();
        let mut pool = Vec::new();

        for file in &listing.subtitles {
            let subtitle = self.normalizer.normalize_file(file);
            if !self.config.wants_language(subtitle.key.language.as_deref()) {
                debug!(subtitle = %file.basename(), "Skipping subtitle in unwanted language");
                continue;
            }

            let owner = states.iter_mut().find(|state| {
                existing::belongs_to(
                    &state.video,
                    &subtitle,
                    &self.pattern,
                    self.normalizer.vocabulary(),
                )
            });
            match owner {
                Some(state) => state.existing.push(subtitle),
                None => pool.push(subtitle),
            }
        }

        (states, pool)
    }

    async fn run_semantic(
        &self,
        matcher: &SemanticMatcher,
        videos: &[NormalizedFile],
        subtitles: &[NormalizedFile],
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<SemanticOutcome, EngineError> {
        let instructions = self.config.instructions.as_deref().unwrap_or_default();
        let request = matcher.match_semantic(videos, subtitles, instructions);

        let Some(cancel) = cancel else {
            return Ok(request.await);
        };

        tokio::select! {
            outcome = request => Ok(outcome),
            _ = cancelled(cancel) => {
                info!(provider = %matcher.provider_name(), "Semantic request cancelled");
                metrics::SEMANTIC_REQUESTS
                    .with_label_values(&[matcher.provider_name(), "cancelled"])
                    .inc();
                Err(EngineError::Cancelled)
            }
        }
    }
}

/// Resolves once the flag turns `true`. Never resolves if the sender is gone.
async fn cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        let fired = *rx.borrow_and_update();
        if fired {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatchSource, ProposedPair, ProviderError};
    use crate::testing::fixtures::listing;
    use crate::testing::MockSemanticProvider;
    use std::path::Path;
    use std::time::Duration;

    fn engine(mode: MatchMode) -> MatchEngine {
        let config = MatchingConfig {
            mode,
            ..Default::default()
        };
        MatchEngine::new(config, Normalizer::default()).unwrap()
    }

    fn show_listing() -> DirectoryListing {
        listing(
            "/tv/Show",
            &[
                "Show.S01E01.mkv",
                "Show.S01E02.mkv",
                "show.1x01.chs.srt",
                "show.1x02.chs.srt",
            ],
        )
    }

    #[tokio::test]
    async fn test_regex_mode_plans_renames() {
        let report = engine(MatchMode::Regex)
            .plan_directory(&show_listing())
            .await
            .unwrap();

        assert_eq!(report.plan.len(), 2);
        assert!(!report.is_degraded());
        let targets: Vec<&Path> = report
            .plan
            .entries
            .iter()
            .map(|e| e.target.as_deref().unwrap())
            .collect();
        assert_eq!(
            targets,
            vec![
                Path::new("/tv/Show/Show.S01E01.chs.srt"),
                Path::new("/tv/Show/Show.S01E02.chs.srt"),
            ]
        );
        assert!(report.plan.entries.iter().all(|e| e.score == Some(1.0)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let config = MatchingConfig {
            threshold: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            MatchEngine::new(config, Normalizer::default()),
            Err(EngineError::InvalidThreshold(_))
        ));

        let config = MatchingConfig {
            naming_pattern: "{filename}.{lang}".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            MatchEngine::new(config, Normalizer::default()),
            Err(EngineError::Pattern(_))
        ));
    }

    #[tokio::test]
    async fn test_ai_mode_uses_provider() {
        let provider = Arc::new(MockSemanticProvider::new().with_pairs(vec![
            ProposedPair::new(0, 0, 0.95),
            ProposedPair::new(1, 1, 0.95),
        ]));
        let report = engine(MatchMode::Ai)
            .with_semantic_provider(provider.clone())
            .plan_directory(&show_listing())
            .await
            .unwrap();

        assert_eq!(report.plan.count(PlanAction::Rename), 2);
        assert!(report
            .plan
            .entries
            .iter()
            .all(|e| e.source == Some(MatchSource::Ai)));
        assert_eq!(provider.request_count().await, 1);
    }

    #[tokio::test]
    async fn test_ai_mode_falls_back_to_regex() {
        let provider = Arc::new(
            MockSemanticProvider::new().with_failure(ProviderError::Transport("timeout".to_string())),
        );
        let report = engine(MatchMode::Ai)
            .with_semantic_provider(provider)
            .plan_directory(&show_listing())
            .await
            .unwrap();

        assert!(report.is_degraded());
        assert_eq!(report.plan.count(PlanAction::Rename), 2);
        assert!(report
            .plan
            .entries
            .iter()
            .all(|e| e.source == Some(MatchSource::Regex)));
    }

    #[tokio::test]
    async fn test_ai_mode_without_provider_degrades() {
        let report = engine(MatchMode::Ai)
            .plan_directory(&show_listing())
            .await
            .unwrap();
        assert_eq!(report.degradation.unwrap().provider, "none");
        assert_eq!(report.plan.count(PlanAction::Rename), 2);
    }

    #[tokio::test]
    async fn test_both_mode_merges_sources() {
        let provider = Arc::new(
            MockSemanticProvider::new()
                .with_pairs(vec![ProposedPair::new(0, 0, 0.9)])
                .with_usage(120, 30),
        );
        let report = engine(MatchMode::Both)
            .with_semantic_provider(provider)
            .plan_directory(&show_listing())
            .await
            .unwrap();

        let first = &report.plan.entries[0];
        assert_eq!(first.source, Some(MatchSource::RegexAndAi));
        assert_eq!(first.score, Some(1.0));
        assert_eq!(report.plan.entries[1].source, Some(MatchSource::Regex));
        assert_eq!(report.llm_usage.unwrap().input_tokens, 120);
    }

    #[tokio::test]
    async fn test_regex_mode_never_calls_provider() {
        let provider = Arc::new(MockSemanticProvider::new());
        engine(MatchMode::Regex)
            .with_semantic_provider(provider.clone())
            .plan_directory(&show_listing())
            .await
            .unwrap();
        assert_eq!(provider.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_existing_subtitles_skip() {
        let listing = listing(
            "/tv/Show",
            &[
                "Show.S01E01.mkv",
                "Show.S01E01.chs.srt",
                "show.1x01.eng.srt",
            ],
        );
        let report = engine(MatchMode::Regex).plan_directory(&listing).await.unwrap();

        assert_eq!(report.plan.len(), 1);
        let entry = &report.plan.entries[0];
        assert_eq!(entry.action, PlanAction::SkipExisting);
        assert_eq!(entry.rationale, "already has subtitle Show.S01E01.chs.srt");
    }

    #[tokio::test]
    async fn test_force_replaces_same_language() {
        let listing = listing(
            "/tv/Show",
            &["Show.S01E01.mkv", "Show.S01E01.chs.srt", "show.1x01.chs.ass"],
        );
        let config = MatchingConfig {
            mode: MatchMode::Regex,
            force: true,
            ..Default::default()
        };
        let engine = MatchEngine::new(config, Normalizer::default()).unwrap();
        let report = engine.plan_directory(&listing).await.unwrap();

        let entry = &report.plan.entries[0];
        assert_eq!(entry.action, PlanAction::Rename);
        assert_eq!(entry.target.as_deref(), Some(Path::new("/tv/Show/Show.S01E01.chs.ass")));
        assert_eq!(entry.replaces.as_deref(), Some(Path::new("/tv/Show/Show.S01E01.chs.srt")));
    }

    #[tokio::test]
    async fn test_language_filter() {
        let listing = listing(
            "/tv/Show",
            &["Show.S01E01.mkv", "show.1x01.chs.srt", "show.1x01.eng.srt"],
        );
        let config = MatchingConfig {
            mode: MatchMode::Regex,
            languages: vec!["eng".to_string()],
            ..Default::default()
        };
        let report = MatchEngine::new(config, Normalizer::default())
            .unwrap()
            .plan_directory(&listing)
            .await
            .unwrap();

        assert_eq!(report.plan.len(), 1);
        assert_eq!(report.plan.entries[0].language, "eng");
    }

    #[tokio::test]
    async fn test_cancellation_abandons_semantic_call() {
        let provider = Arc::new(
            MockSemanticProvider::new()
                .with_pairs(vec![ProposedPair::new(0, 0, 0.9)])
                .with_delay(Duration::from_secs(30)),
        );
        let engine = engine(MatchMode::Both).with_semantic_provider(provider);
        let (tx, rx) = watch::channel(false);

        let listing = show_listing();
        let planning = engine.plan_directory_with_cancel(&listing, rx);
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(true).unwrap();
        };
        let (result, ()) = tokio::join!(planning, cancel);

        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let (_tx, rx) = watch::channel(true);
        let result = engine(MatchMode::Regex)
            .plan_directory_with_cancel(&show_listing(), rx)
            .await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_plan_directories_keeps_order() {
        let listings = vec![
            show_listing(),
            listing("/tv/Empty", &["Movie.mkv"]),
        ];
        let results = engine(MatchMode::Regex).plan_directories(&listings, None).await;

        assert_eq!(results.len(), 2);
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.directory, Path::new("/tv/Empty"));
        assert_eq!(second.plan.entries[0].action, PlanAction::SkipLowConfidence);
        assert_eq!(second.plan.entries[0].rationale, "no candidate subtitles");
    }
}
