/// HTTP client for the remote embedding API
use crate::application::providers::{EmbeddingProvider, ProviderError};
use crate::domain::value_objects::Embedding;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5555";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const EMBEDDING_PATH: &str = "embedding";

#[derive(Debug, Clone)]
pub struct HttpEmbeddingConfig {
    /// Base URL of the embedding API
    pub endpoint: String,
    /// Optional bearer token
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpEmbeddingConfig {
    fn default() -> Self {
        HttpEmbeddingConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
}

/// Calls `POST {endpoint}/embedding` with `{"text": ...}` and expects a bare
/// JSON array of numbers back.
pub struct HttpEmbeddingClient {
    client: Client,
    url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpEmbeddingClient {
    pub fn new(config: HttpEmbeddingConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpEmbeddingClient {
            client,
            url: join_url(&config.endpoint, EMBEDDING_PATH),
            token: config.token.filter(|t| !t.is_empty()),
            timeout: config.timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        let mut request = self.client.post(&self.url).json(&EmbeddingRequest { text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let values: Vec<f64> = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        debug!("Received embedding with {} dimensions", values.len());

        Embedding::new(values).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

/// Join a base URL and a path with exactly one `/` between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
