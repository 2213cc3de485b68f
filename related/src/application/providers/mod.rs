pub mod embedding_provider;
pub mod text_normalizer;

pub use embedding_provider::{EmbeddingProvider, ProviderError};
pub use text_normalizer::{NormalizationError, TextNormalizer};
