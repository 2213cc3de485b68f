pub mod providers;
pub mod repositories;
pub mod services;
pub mod use_cases;

// Re-export key types to avoid naming conflicts
pub use providers::{EmbeddingProvider, NormalizationError, ProviderError, TextNormalizer};
pub use repositories::{DocumentRepository, RepositoryError, RepositoryResult};
pub use services::{
    EmbeddingPipeline, EmbeddingPipelineConfig, PipelineError, PipelineProgressCallback,
    PipelineProgressEvent, PipelineResult, UpdateError, UpdateRelatedConfig,
    UpdateRelatedService, UpdateResult, UpdateSummary,
};
pub use use_cases::{RankRelatedDocuments, RankingError, RankingResult, RankingSummary};
