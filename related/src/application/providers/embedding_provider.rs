use crate::domain::value_objects::Embedding;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Received unexpected status: {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// A remote service that turns plain text into an embedding vector.
///
/// Calls must be cancel-safe: the pipeline aborts an in-flight call by
/// dropping its future.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError>;
}
