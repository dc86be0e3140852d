//! Mock semantic provider for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::matcher::{
    LlmUsage, PairingRequest, PairingResponse, ProposedPair, ProviderError, SemanticProvider,
};

/// Mock implementation of the SemanticProvider trait.
///
/// Provides controllable behavior for testing:
/// - Scripted pairs returned for every request
/// - Failure injection
/// - Request recording for assertions
/// - Simulated latency (for cancellation tests)
///
/// # Example
///
/// ```rust,ignore
/// use captionmate_core::testing::MockSemanticProvider;
///
/// let provider = MockSemanticProvider::new()
///     .with_pairs(vec![ProposedPair::new(0, 0, 0.95)]);
///
/// // Use with SemanticMatcher or MatchEngine...
///
/// let requests = provider.recorded_requests().await;
/// assert_eq!(requests.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockSemanticProvider {
    name: String,
    /// Pairs returned for every request.
    pairs: Arc<RwLock<Vec<ProposedPair>>>,
    /// Usage reported with every response.
    usage: Option<LlmUsage>,
    /// If set, every request fails with this error.
    failure: Arc<RwLock<Option<ProviderError>>>,
    /// Simulated response latency.
    delay: Option<Duration>,
    /// Recorded requests.
    requests: Arc<RwLock<Vec<PairingRequest>>>,
}

impl Default for MockSemanticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSemanticProvider {
    /// Create a provider that proposes nothing.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            pairs: Arc::new(RwLock::new(Vec::new())),
            usage: None,
            failure: Arc::new(RwLock::new(None)),
            delay: None,
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_pairs(self, pairs: Vec<ProposedPair>) -> Self {
        Self {
            pairs: Arc::new(RwLock::new(pairs)),
            ..self
        }
    }

    pub fn with_usage(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.usage = Some(LlmUsage {
            input_tokens,
            output_tokens,
        });
        self
    }

    pub fn with_failure(self, error: ProviderError) -> Self {
        Self {
            failure: Arc::new(RwLock::new(Some(error))),
            ..self
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the scripted pairs.
    pub async fn set_pairs(&self, pairs: Vec<ProposedPair>) {
        *self.pairs.write().await = pairs;
    }

    /// Make subsequent requests fail.
    pub async fn set_failure(&self, error: ProviderError) {
        *self.failure.write().await = Some(error);
    }

    /// Make subsequent requests succeed again.
    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<PairingRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of requests received.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl SemanticProvider for MockSemanticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn propose_pairs(
        &self,
        request: &PairingRequest,
    ) -> Result<PairingResponse, ProviderError> {
        self.requests.write().await.push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        Ok(PairingResponse {
            pairs: self.pairs.read().await.clone(),
            usage: self.usage.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PairingRequest {
        PairingRequest {
            videos: vec!["show S01E01".to_string()],
            subtitles: vec!["show S01E01 [eng]".to_string()],
            instructions: "pair".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_pairs_and_recording() {
        let provider = MockSemanticProvider::new()
            .with_pairs(vec![ProposedPair::new(0, 0, 0.9)])
            .with_usage(100, 20);

        let response = provider.propose_pairs(&request()).await.unwrap();
        assert_eq!(response.pairs.len(), 1);
        assert_eq!(response.usage.unwrap().input_tokens, 100);
        assert_eq!(provider.request_count().await, 1);
        assert_eq!(provider.recorded_requests().await[0], request());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let provider = MockSemanticProvider::new();
        provider
            .set_failure(ProviderError::Provider("rate limited".to_string()))
            .await;
        assert!(provider.propose_pairs(&request()).await.is_err());

        provider.clear_failure().await;
        assert!(provider.propose_pairs(&request()).await.is_ok());
        assert_eq!(provider.request_count().await, 2);
    }
}
