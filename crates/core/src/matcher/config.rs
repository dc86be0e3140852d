//! Matching configuration types.

use serde::{Deserialize, Serialize};

/// Which matchers contribute candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Semantic provider only. Falls back to the regex matcher when degraded.
    Ai,
    /// Deterministic rules only. Works offline.
    Regex,
    /// Both matchers, merged by the resolver.
    #[default]
    Both,
}

impl MatchMode {
    /// Returns true if this mode requires an LLM to be configured.
    pub fn requires_llm(&self) -> bool {
        matches!(self, MatchMode::Ai)
    }

    /// Returns true if this mode calls the semantic provider when one is available.
    pub fn can_use_ai(&self) -> bool {
        !matches!(self, MatchMode::Regex)
    }

    /// Returns true if this mode runs the regex matcher up front.
    pub fn uses_regex(&self) -> bool {
        !matches!(self, MatchMode::Ai)
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchMode::Ai => "ai",
            MatchMode::Regex => "regex",
            MatchMode::Both => "both",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Ok(MatchMode::Ai),
            "regex" => Ok(MatchMode::Regex),
            "both" => Ok(MatchMode::Both),
            other => Err(format!("unknown match mode '{}' (expected ai, regex or both)", other)),
        }
    }
}

/// Options every matching run depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub mode: MatchMode,
    /// Minimum score for a pair to be assigned (inclusive).
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Keep videos that already have a subtitle eligible and replace it.
    #[serde(default)]
    pub force: bool,
    /// Target name template with `{filename}`, `{lang}` and `{ext}` placeholders.
    #[serde(default = "default_naming_pattern")]
    pub naming_pattern: String,
    /// Subtitle languages to keep. Empty keeps all; untagged subtitles are always kept.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Extra free-text instructions appended to the semantic provider request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn default_threshold() -> f64 {
    0.8
}

fn default_naming_pattern() -> String {
    "{filename}.{lang}.{ext}".to_string()
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::default(),
            threshold: default_threshold(),
            force: false,
            naming_pattern: default_naming_pattern(),
            languages: Vec::new(),
            instructions: None,
        }
    }
}

impl MatchingConfig {
    /// Whether a subtitle with this language passes the language filter.
    ///
    /// Combined tags such as `chs&eng` pass if any part is wanted.
    pub fn wants_language(&self, language: Option<&str>) -> bool {
        let Some(language) = language else {
            return true;
        };
        if self.languages.is_empty() || language == "und" {
            return true;
        }
        language
            .split('&')
            .any(|part| self.languages.iter().any(|l| l.eq_ignore_ascii_case(part)))
    }
}

/// LLM provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI chat completions API.
    #[serde(alias = "openai")]
    OpenAi,
    /// Local Ollama instance.
    Ollama,
    /// Any OpenAI-compatible endpoint (requires `api_base`).
    Custom,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAi => "open_ai",
            LlmProvider::Ollama => "ollama",
            LlmProvider::Custom => "custom",
        }
    }
}

/// LLM client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Model name/identifier.
    pub model: String,
    /// API key. May reference an environment variable as `${VAR_NAME}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Maximum tokens for completions.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout() -> u32 {
    30
}

fn default_max_tokens() -> u32 {
    2048
}

impl LlmConfig {
    /// The API key with a `${VAR}` reference expanded from the environment.
    ///
    /// Returns `None` when no key is set, or the referenced variable is unset or empty.
    pub fn resolve_api_key(&self) -> Option<String> {
        let raw = self.api_key.as_deref()?.trim();
        let value = match raw.strip_prefix("${").and_then(|r| r.strip_suffix('}')) {
            Some(var) => std::env::var(var).ok()?,
            None => raw.to_string(),
        };
        (!value.is_empty()).then_some(value)
    }
}
