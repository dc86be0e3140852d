//! Semantic provider backed by an LLM.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::matcher::config::{LlmConfig, LlmProvider};
use crate::matcher::llm::{AnthropicClient, CompletionRequest, LlmClient, OllamaClient, OpenAiClient};
use crate::matcher::traits::{ProviderError, SemanticProvider};
use crate::matcher::types::{PairingRequest, PairingResponse, ProposedPair};

/// Prompts a language model for video/subtitle pairings.
///
/// Generic over the LLM client so any backend can be used.
pub struct LlmSemanticProvider<C: LlmClient> {
    client: Arc<C>,
    max_tokens: u32,
}

impl<C: LlmClient> LlmSemanticProvider<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            max_tokens: 2048,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_system_prompt(&self) -> String {
        r#"You match video files with subtitle files. File names may be in different languages, use different numbering styles (S01E02, 1x02, 第2集, bare episode numbers) and carry release tags.

Rules:
- Only pair a video and a subtitle that contain the same content (same title, season and episode).
- A subtitle belongs to at most one video. A video may have several subtitles in different languages.
- Use the indices from the lists exactly as given.
- Confidence is between 0.0 and 1.0. Omit pairs you are not reasonably sure about.

Respond with JSON only:
{
  "pairs": [
    {"video": 0, "subtitle": 1, "confidence": 0.95, "rationale": "Brief explanation"}
  ]
}"#
        .to_string()
    }

    fn build_user_prompt(&self, request: &PairingRequest) -> String {
        let mut prompt = String::new();
        prompt.push_str("TASK:\n");
        prompt.push_str(&request.instructions);
        prompt.push_str("\n\nVIDEOS:\n");
        for (i, name) in request.videos.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i, name));
        }
        prompt.push_str("\nSUBTITLES:\n");
        for (i, name) in request.subtitles.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i, name));
        }
        prompt
    }
}

#[async_trait]
impl<C: LlmClient + 'static> SemanticProvider for LlmSemanticProvider<C> {
    fn name(&self) -> &str {
        self.client.provider()
    }

    async fn propose_pairs(&self, request: &PairingRequest) -> Result<PairingResponse, ProviderError> {
        let completion = CompletionRequest::new(self.build_user_prompt(request))
            .with_system(self.build_system_prompt())
            .with_max_tokens(self.max_tokens);

        let response = self.client.complete(completion).await?;
        let pairs = parse_pairs(&response.text)?;

        Ok(PairingResponse {
            pairs,
            usage: Some(response.usage),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LlmReply {
    Object {
        #[serde(alias = "matches")]
        pairs: Vec<LlmPair>,
    },
    List(Vec<LlmPair>),
}

#[derive(Debug, Deserialize)]
struct LlmPair {
    #[serde(alias = "video_index")]
    video: i64,
    #[serde(alias = "subtitle_index")]
    subtitle: i64,
    #[serde(default, alias = "score")]
    confidence: f64,
    #[serde(default, alias = "reasoning")]
    rationale: Option<String>,
}

/// Parse the model's answer: the whole text, then a fenced code block, then
/// the outermost `{...}` span.
fn parse_pairs(text: &str) -> Result<Vec<ProposedPair>, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::Malformed("empty response".to_string()));
    }

    let attempts = [Some(trimmed), fenced_block(trimmed), brace_span(trimmed)];
    let mut last_error = None;
    for attempt in attempts.into_iter().flatten() {
        match serde_json::from_str::<LlmReply>(attempt) {
            Ok(reply) => {
                let pairs = match reply {
                    LlmReply::Object { pairs } | LlmReply::List(pairs) => pairs,
                };
                return Ok(pairs
                    .into_iter()
                    .map(|p| ProposedPair {
                        video_index: p.video,
                        subtitle_index: p.subtitle,
                        confidence: p.confidence,
                        rationale: p.rationale,
                    })
                    .collect());
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    let preview: String = trimmed.chars().take(200).collect();
    Err(ProviderError::Malformed(format!(
        "{} - response: {}",
        last_error.unwrap_or_default(),
        preview
    )))
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let body = &text[start..];
    // Skip a language tag such as ```json
    let body = match body.find('\n') {
        Some(newline) if body[..newline].trim().chars().all(char::is_alphanumeric) => {
            &body[newline + 1..]
        }
        _ => body,
    };
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Build the configured semantic provider.
pub fn create_semantic_provider(
    config: &LlmConfig,
) -> Result<Arc<dyn SemanticProvider>, ProviderError> {
    let timeout = Duration::from_secs(u64::from(config.timeout_secs));
    let api_key = config.resolve_api_key();

    let provider: Arc<dyn SemanticProvider> = match config.provider {
        LlmProvider::Anthropic => {
            let key = api_key.ok_or_else(|| {
                ProviderError::NotConfigured("anthropic requires an api_key".to_string())
            })?;
            let mut client = AnthropicClient::new(key, &config.model).with_timeout(timeout);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            wrap(client, config.max_tokens)
        }
        LlmProvider::OpenAi | LlmProvider::Custom => {
            if config.provider == LlmProvider::Custom && config.api_base.is_none() {
                return Err(ProviderError::NotConfigured(
                    "custom provider requires api_base".to_string(),
                ));
            }
            let mut client = OpenAiClient::new(&config.model).with_timeout(timeout);
            if let Some(key) = api_key {
                client = client.with_api_key(key);
            }
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            wrap(client, config.max_tokens)
        }
        LlmProvider::Ollama => {
            let mut client = OllamaClient::new(&config.model).with_timeout(timeout);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            wrap(client, config.max_tokens)
        }
    };

    Ok(provider)
}

fn wrap<C: LlmClient + 'static>(client: C, max_tokens: u32) -> Arc<dyn SemanticProvider> {
    Arc::new(LlmSemanticProvider::new(Arc::new(client)).with_max_tokens(max_tokens))
}
