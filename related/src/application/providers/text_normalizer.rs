use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("No text left to embed after stripping markup")]
    Empty,
}

/// Converts a document body into plain text suitable for embedding.
///
/// Implementations must be deterministic and free of side effects.
pub trait TextNormalizer: Send + Sync {
    fn strip(&self, body: &str) -> Result<String, NormalizationError>;
}
