use serde::{Deserialize, Serialize};

use crate::executor::ExecutorConfig;
use crate::matcher::{LlmConfig, MatchingConfig};
use crate::normalizer::{IdiomError, IdiomKind, Normalizer, NumberingIdiom, Vocabulary};
use crate::planner::{NamingPattern, PatternError};
use crate::scanner::ScanConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Semantic provider. Required for `mode = "ai"`, optional for `both`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

impl Config {
    pub fn naming_pattern(&self) -> Result<NamingPattern, PatternError> {
        NamingPattern::parse(&self.matching.naming_pattern)
    }

    /// A normalizer with the configured vocabulary extensions.
    pub fn normalizer(&self) -> Result<Normalizer, IdiomError> {
        Ok(Normalizer::new(self.vocabulary.build()?))
    }
}

/// Extensions to the built-in vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Extra release tags stripped from names.
    #[serde(default)]
    pub release_tags: Vec<String>,
    /// Extra language codes recognized as trailing tags.
    #[serde(default)]
    pub language_codes: Vec<String>,
    /// Extra numbering idioms, tried before the built-in ones.
    #[serde(default)]
    pub idioms: Vec<IdiomConfig>,
}

/// A numbering idiom as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdiomConfig {
    pub name: String,
    /// Regex with named groups `season` and/or `episode` (optionally `episode_end`).
    pub pattern: String,
    pub kind: IdiomKind,
}

impl VocabularyConfig {
    pub fn build(&self) -> Result<Vocabulary, IdiomError> {
        let mut vocabulary = Vocabulary::default()
            .with_release_tags(&self.release_tags)
            .with_language_codes(&self.language_codes);
        for idiom in &self.idioms {
            vocabulary =
                vocabulary.with_idiom(NumberingIdiom::new(&idiom.name, &idiom.pattern, idiom.kind)?);
        }
        Ok(vocabulary)
    }
}

/// Config for display (API key redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub matching: MatchingConfig,
    pub vocabulary: VocabularyConfig,
    pub scan: ScanConfig,
    pub executor: ExecutorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

/// LLM config with the API key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub max_tokens: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            matching: config.matching.clone(),
            vocabulary: config.vocabulary.clone(),
            scan: config.scan.clone(),
            executor: config.executor.clone(),
            llm: config.llm.as_ref().map(|llm| SanitizedLlmConfig {
                provider: llm.provider.as_str().to_string(),
                model: llm.model.clone(),
                api_base: llm.api_base.clone(),
                api_key_configured: llm.resolve_api_key().is_some(),
                timeout_secs: llm.timeout_secs,
                max_tokens: llm.max_tokens,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{LlmProvider, MatchMode};

    #[test]
    fn test_deserialize_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.matching.mode, MatchMode::Both);
        assert_eq!(config.matching.threshold, 0.8);
        assert!(config.executor.dry_run);
        assert!(config.scan.recursive);
        assert!(config.llm.is_none());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[matching]
mode = "ai"
threshold = 0.7
force = true
naming_pattern = "{filename}.{lang}.{ext}"
languages = ["chs", "eng"]
instructions = "Prefer the SUBS group."

[vocabulary]
release_tags = ["nf"]
language_codes = ["tha"]

[[vocabulary.idioms]]
name = "ep_hash"
pattern = '#(?P<episode>\d{1,3})'
kind = "episode_only"

[scan]
recursive = false

[executor]
dry_run = false
backup_dir = "/tmp/backups"

[llm]
provider = "anthropic"
model = "claude-test"
api_key = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.matching.mode, MatchMode::Ai);
        assert!(config.matching.force);
        assert_eq!(config.matching.languages, vec!["chs", "eng"]);
        assert_eq!(config.vocabulary.idioms[0].kind, IdiomKind::EpisodeOnly);
        assert!(!config.scan.recursive);
        assert!(!config.executor.dry_run);
        let llm = config.llm.as_ref().unwrap();
        assert_eq!(llm.provider, LlmProvider::Anthropic);
        assert_eq!(llm.timeout_secs, 30);

        let vocabulary = config.vocabulary.build().unwrap();
        assert_eq!(vocabulary.idioms()[0].name(), "ep_hash");
        assert!(vocabulary.is_release_tag("nf"));
        assert_eq!(vocabulary.language("tha"), Some("tha"));
    }

    #[test]
    fn test_invalid_idiom_fails_build() {
        let config = VocabularyConfig {
            idioms: vec![IdiomConfig {
                name: "broken".to_string(),
                pattern: r"ep(\d+)".to_string(),
                kind: IdiomKind::EpisodeOnly,
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.build(),
            Err(IdiomError::MissingGroup { .. })
        ));
    }

    #[test]
    fn test_sanitized_config_hides_key() {
        let config = Config {
            llm: Some(LlmConfig {
                provider: LlmProvider::OpenAi,
                model: "gpt-test".to_string(),
                api_key: Some("sk-secret".to_string()),
                api_base: None,
                timeout_secs: 30,
                max_tokens: 2048,
            }),
            ..Default::default()
        };
        let sanitized = SanitizedConfig::from(&config);
        let llm = sanitized.llm.as_ref().unwrap();
        assert!(llm.api_key_configured);
        assert_eq!(llm.provider, "open_ai");

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
