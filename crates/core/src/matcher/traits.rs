//! Semantic provider capability.

use async_trait::async_trait;
use thiserror::Error;

use crate::matcher::llm::LlmError;
use crate::matcher::types::{PairingRequest, PairingResponse};

/// Errors a semantic provider can report.
///
/// The semantic matcher turns every variant into a degradation; none of them
/// fail a matching run.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl From<LlmError> for ProviderError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(_) | LlmError::Timeout(_) => ProviderError::Transport(err.to_string()),
            LlmError::Json(msg) => ProviderError::Malformed(msg),
            LlmError::Api { .. } => ProviderError::Provider(err.to_string()),
            LlmError::NotConfigured => ProviderError::NotConfigured(err.to_string()),
        }
    }
}

/// External text-understanding service that proposes video/subtitle pairings.
///
/// One call covers one directory batch. Implementations own transport, auth
/// and retries; indices in the response refer to the request's lists.
#[async_trait]
pub trait SemanticProvider: Send + Sync {
    /// Name of this provider for logging/metrics.
    fn name(&self) -> &str;

    async fn propose_pairs(&self, request: &PairingRequest) -> Result<PairingResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_llm_error_mapping() {
        let err: ProviderError = LlmError::Timeout(Duration::from_secs(30)).into();
        assert!(matches!(err, ProviderError::Transport(_)));

        let err: ProviderError = LlmError::Api {
            status: 429,
            message: "rate limited".to_string(),
        }
        .into();
        assert!(matches!(err, ProviderError::Provider(_)));
        assert!(err.to_string().contains("429"));

        let err: ProviderError = LlmError::Json("eof".to_string()).into();
        assert_eq!(err.to_string(), "Malformed response: eof");
    }
}
