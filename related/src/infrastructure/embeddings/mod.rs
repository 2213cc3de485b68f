/// Embedding acquisition: markdown stripping and the remote embedding API
mod http_embedding_client;
mod markdown_stripper;

pub use http_embedding_client::{
    join_url, HttpEmbeddingClient, HttpEmbeddingConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT,
};
pub use markdown_stripper::MarkdownStripper;
