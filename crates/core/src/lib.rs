pub mod config;
pub mod engine;
pub mod executor;
pub mod matcher;
pub mod media;
pub mod metrics;
pub mod normalizer;
pub mod planner;
pub mod resolver;
pub mod scanner;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
    SanitizedConfig, ScanConfig, VocabularyConfig,
};
pub use engine::{EngineError, MatchEngine, MatchReport};
pub use executor::{
    ExecutionReport, ExecutorConfig, ExecutorError, FileOperator, FsOperator, OutcomeStatus,
};
pub use matcher::{
    create_semantic_provider, match_regex, CandidatePair, Degradation, LlmConfig, LlmProvider,
    MatchMode, MatchSource, MatchingConfig, PairingRequest, PairingResponse, ProposedPair,
    ProviderError, RegexMatcher, SemanticMatcher, SemanticOutcome, SemanticProvider,
};
pub use media::{DirectoryListing, MediaFile, MediaKind};
pub use normalizer::{normalize, NormalizedFile, NormalizedKey, Normalizer, Vocabulary};
pub use planner::{finalize_plan, plan_rename, NamingPattern, PatternError, RenameOperation};
pub use resolver::{
    resolve, resolve_videos, MatchPlan, PlanAction, PlanEntry, ResolveOptions, VideoState,
};
pub use scanner::{LocalScanner, ScanError, Scanner};
