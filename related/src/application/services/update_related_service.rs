/// Service that refreshes the related posts of every document in a store
use crate::application::repositories::{DocumentRepository, RepositoryError};
use crate::application::services::embedding_pipeline::{
    EmbeddingPipeline, EmbeddingPipelineConfig, PipelineError,
};
use crate::application::providers::{EmbeddingProvider, TextNormalizer};
use crate::application::use_cases::related_documents::{
    RankRelatedDocuments, RankingError, DEFAULT_RELATED_LIMIT,
};
use crate::domain::base::Entity;
use crate::domain::value_objects::{DocumentId, LinkRewriter};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Error loading embeddings: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Error finding similar posts: {0}")]
    Ranking(#[from] RankingError),
}

pub type UpdateResult<T> = Result<T, UpdateError>;

/// Configuration for a related-posts run
#[derive(Debug, Clone)]
pub struct UpdateRelatedConfig {
    pub pipeline: EmbeddingPipelineConfig,
    /// Maximum related posts per document
    pub related_limit: usize,
    /// Rewrites document paths into related links
    pub link_rewriter: LinkRewriter,
    /// Compute everything but write nothing
    pub dry_run: bool,
}

impl Default for UpdateRelatedConfig {
    fn default() -> Self {
        UpdateRelatedConfig {
            pipeline: EmbeddingPipelineConfig::default(),
            related_limit: DEFAULT_RELATED_LIMIT,
            link_rewriter: LinkRewriter::default(),
            dry_run: false,
        }
    }
}

/// Load, embed, rank, save
pub struct UpdateRelatedService<R, P: ?Sized, N: ?Sized> {
    repository: R,
    pipeline: EmbeddingPipeline<P, N>,
    config: UpdateRelatedConfig,
}

impl<R, P, N> UpdateRelatedService<R, P, N>
where
    R: DocumentRepository,
    P: EmbeddingProvider + ?Sized + 'static,
    N: TextNormalizer + ?Sized + 'static,
{
    pub fn new(
        repository: R,
        provider: Arc<P>,
        normalizer: Arc<N>,
        config: UpdateRelatedConfig,
    ) -> Self {
        let pipeline =
            EmbeddingPipeline::new(provider, normalizer).with_config(config.pipeline.clone());

        UpdateRelatedService {
            repository,
            pipeline,
            config,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Run once over every document in the repository.
    ///
    /// Nothing is written unless embeddings were acquired for every document
    /// and the ranking pass succeeded.
    pub async fn run(&self, cancel: &CancellationToken) -> UpdateResult<UpdateSummary> {
        let start_time = Instant::now();

        let mut documents = self.repository.load_all().await?;
        let documents_loaded = documents.len();
        info!("Loaded {} documents", documents_loaded);

        self.pipeline
            .acquire_with_cancellation(&mut documents, cancel)
            .await?;

        let ranking = RankRelatedDocuments::new(self.config.link_rewriter.clone())
            .with_limit(self.config.related_limit)
            .execute(&mut documents)?;

        let changed: HashSet<&DocumentId> = ranking.changed.iter().collect();

        let mut documents_saved = 0;
        for document in &documents {
            if !changed.contains(document.id()) {
                debug!("Unchanged: {}", document.id());
                continue;
            }

            if self.config.dry_run {
                info!("[dry run] {} -> {:?}", document.id(), document.related());
                continue;
            }

            self.repository.save(document).await?;
            documents_saved += 1;
        }

        let summary = UpdateSummary {
            documents_loaded,
            documents_embedded: documents.iter().filter(|d| d.has_embedding()).count(),
            documents_ranked: ranking.documents_ranked,
            documents_changed: ranking.documents_changed(),
            documents_saved,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Updated related posts: {} loaded, {} changed, {} saved in {} ms",
            summary.documents_loaded,
            summary.documents_changed,
            summary.documents_saved,
            summary.duration_ms
        );

        Ok(summary)
    }
}

/// Summary of a related-posts run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub documents_loaded: usize,
    pub documents_embedded: usize,
    pub documents_ranked: usize,
    pub documents_changed: usize,
    pub documents_saved: usize,
    pub duration_ms: u64,
}

impl UpdateSummary {
    pub fn has_changes(&self) -> bool {
        self.documents_changed > 0
    }
}
