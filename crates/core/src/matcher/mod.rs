//! Matchers that propose (video, subtitle) candidate pairs.
//!
//! Two independent matchers feed the resolver:
//!
//! - [`RegexMatcher`]: deterministic rules over normalized keys. Pure, offline.
//! - [`SemanticMatcher`]: asks a [`SemanticProvider`] (usually an LLM) for
//!   pairings and validates the answer against the request.
//!
//! # Modes
//!
//! - **Regex**: rules only.
//! - **Ai**: semantic provider only, with the regex matcher as fallback when
//!   the provider degrades.
//! - **Both** (default): both matchers, merged by the resolver.

mod config;
mod llm;
mod llm_provider;
mod regex_matcher;
mod semantic_matcher;
mod traits;
mod types;

// Configuration types
pub use config::{LlmConfig, LlmProvider, MatchMode, MatchingConfig};

// LLM client types
pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage,
    OllamaClient, OpenAiClient,
};
pub use llm_provider::{create_semantic_provider, LlmSemanticProvider};

// Core trait
pub use traits::{ProviderError, SemanticProvider};

// Matchers
pub use regex_matcher::{match_regex, RegexMatcher, RegexMatcherConfig};
pub use semantic_matcher::{SemanticMatcher, DEFAULT_INSTRUCTIONS};

// Result types
pub use types::{
    CandidatePair, Degradation, MatchSource, PairingRequest, PairingResponse, ProposedPair,
    SemanticOutcome, APPROXIMATE_SCORE_CAP,
};
