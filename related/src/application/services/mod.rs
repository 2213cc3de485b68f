pub mod embedding_pipeline;
pub mod update_related_service;

pub use embedding_pipeline::{
    EmbeddingPipeline, EmbeddingPipelineConfig, PipelineError, PipelineProgressCallback,
    PipelineProgressEvent, PipelineResult,
};
pub use update_related_service::{
    UpdateError, UpdateRelatedConfig, UpdateRelatedService, UpdateResult, UpdateSummary,
};
