//! Semantic matcher: validates a provider's proposals into candidate pairs.
//!
//! The provider sees display names only. Everything it returns is checked
//! against the request before it becomes a [`CandidatePair`]; a failed call
//! becomes a [`Degradation`] and an empty candidate list.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::matcher::traits::SemanticProvider;
use crate::matcher::types::{
    sort_candidates, CandidatePair, Degradation, MatchSource, PairingRequest, ProposedPair,
    SemanticOutcome, APPROXIMATE_SCORE_CAP,
};
use crate::metrics;
use crate::normalizer::NormalizedFile;

/// Default task description sent with every request.
pub const DEFAULT_INSTRUCTIONS: &str = "Pair each video with the subtitle files that belong to it. \
Names may be in different languages or use different numbering styles. \
A subtitle belongs to at most one video. Leave a video unpaired when unsure.";

/// Runs one semantic pairing request per directory batch.
#[derive(Clone)]
pub struct SemanticMatcher {
    provider: Arc<dyn SemanticProvider>,
}

impl SemanticMatcher {
    pub fn new(provider: Arc<dyn SemanticProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the provider for pairings and validate them.
    ///
    /// Non-empty `instructions` are appended to [`DEFAULT_INSTRUCTIONS`].
    /// Never fails: provider errors come back as a degraded outcome.
    pub async fn match_semantic(
        &self,
        videos: &[NormalizedFile],
        subtitles: &[NormalizedFile],
        instructions: &str,
    ) -> SemanticOutcome {
        if videos.is_empty() || subtitles.is_empty() {
            return SemanticOutcome::default();
        }

        let provider = self.provider.name().to_string();
        let instructions = match instructions.trim() {
            "" => DEFAULT_INSTRUCTIONS.to_string(),
            extra => format!("{}\n\n{}", DEFAULT_INSTRUCTIONS, extra),
        };
        let request = PairingRequest::from_files(videos, subtitles, instructions);

        debug!(
            provider = %provider,
            videos = videos.len(),
            subtitles = subtitles.len(),
            "Sending semantic pairing request"
        );

        let started = Instant::now();
        let result = self.provider.propose_pairs(&request).await;
        metrics::SEMANTIC_DURATION
            .with_label_values(&[&provider])
            .observe(started.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = %provider, error = %e, "Semantic provider failed, continuing without AI candidates");
                metrics::SEMANTIC_REQUESTS
                    .with_label_values(&[&provider, "degraded"])
                    .inc();
                return SemanticOutcome {
                    candidates: Vec::new(),
                    degradation: Some(Degradation {
                        provider,
                        reason: e.to_string(),
                    }),
                    usage: None,
                };
            }
        };

        metrics::SEMANTIC_REQUESTS
            .with_label_values(&[&provider, "success"])
            .inc();
        if let Some(usage) = &response.usage {
            metrics::LLM_TOKENS
                .with_label_values(&[&provider, "input"])
                .inc_by(usage.input_tokens as u64);
            metrics::LLM_TOKENS
                .with_label_values(&[&provider, "output"])
                .inc_by(usage.output_tokens as u64);
        }

        let proposed = response.pairs.len();
        let candidates = validate_pairs(videos, subtitles, response.pairs);
        info!(
            provider = %provider,
            proposed,
            accepted = candidates.len(),
            "Semantic pairing complete"
        );

        SemanticOutcome {
            candidates,
            degradation: None,
            usage: response.usage,
        }
    }
}

/// Map index-based proposals back onto files.
///
/// Out-of-range indices are dropped, confidences are clamped into [0, 1] and
/// capped, duplicates keep their highest confidence.
fn validate_pairs(
    videos: &[NormalizedFile],
    subtitles: &[NormalizedFile],
    pairs: Vec<ProposedPair>,
) -> Vec<CandidatePair> {
    let mut accepted: BTreeMap<(usize, usize), CandidatePair> = BTreeMap::new();

    for pair in pairs {
        let Some(video) = index(pair.video_index, videos.len()) else {
            debug!(index = pair.video_index, "Discarding pair with unknown video");
            metrics::SEMANTIC_PAIRS_DISCARDED
                .with_label_values(&["video_index"])
                .inc();
            continue;
        };
        let Some(subtitle) = index(pair.subtitle_index, subtitles.len()) else {
            debug!(index = pair.subtitle_index, "Discarding pair with unknown subtitle");
            metrics::SEMANTIC_PAIRS_DISCARDED
                .with_label_values(&["subtitle_index"])
                .inc();
            continue;
        };

        let confidence = if pair.confidence.is_finite() {
            pair.confidence.clamp(0.0, 1.0).min(APPROXIMATE_SCORE_CAP)
        } else {
            0.0
        };
        let rationale = pair
            .rationale
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "proposed by semantic provider".to_string());

        let candidate = CandidatePair::new(
            videos[video].clone(),
            subtitles[subtitle].clone(),
            confidence,
            MatchSource::Ai,
            rationale,
        );
        match accepted.get_mut(&(video, subtitle)) {
            Some(existing) => existing.absorb(candidate),
            None => {
                accepted.insert((video, subtitle), candidate);
            }
        }
    }

    let mut candidates: Vec<CandidatePair> = accepted.into_values().collect();
    sort_candidates(&mut candidates);
    candidates
}

fn index(raw: i64, len: usize) -> Option<usize> {
    usize::try_from(raw).ok().filter(|i| *i < len)
}
