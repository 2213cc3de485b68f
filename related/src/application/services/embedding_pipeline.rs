/// Bounded-concurrency embedding acquisition for a batch of documents
use crate::application::providers::{
    EmbeddingProvider, NormalizationError, ProviderError, TextNormalizer,
};
use crate::domain::aggregates::Document;
use crate::domain::base::{DomainError, Entity};
use crate::domain::value_objects::{DocumentId, Embedding};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to strip {id}: {source}")]
    Normalization {
        id: DocumentId,
        #[source]
        source: NormalizationError,
    },

    #[error("failed to get embedding for {id}: {source}")]
    Provider {
        id: DocumentId,
        #[source]
        source: ProviderError,
    },

    #[error("Embedding worker for {id} panicked")]
    WorkerPanicked { id: DocumentId },

    #[error("Embedding acquisition was cancelled")]
    Cancelled,

    #[error("Embedding acquisition incomplete: {received} of {expected} documents embedded")]
    Incomplete { expected: usize, received: usize },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Configuration for the embedding pipeline
#[derive(Debug, Clone)]
pub struct EmbeddingPipelineConfig {
    /// Maximum number of documents processed at once
    pub max_concurrent: usize,
    /// Upper bound for a single provider call
    pub call_timeout: Duration,
}

impl Default for EmbeddingPipelineConfig {
    fn default() -> Self {
        EmbeddingPipelineConfig {
            max_concurrent: 5,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Callback type for pipeline progress events
pub type PipelineProgressCallback = Arc<dyn Fn(PipelineProgressEvent) + Send + Sync>;

/// Progress event emitted while a batch is acquired
#[derive(Debug, Clone)]
pub enum PipelineProgressEvent {
    Started { total_documents: usize },
    DocumentEmbedded { id: DocumentId, completed: usize, total_documents: usize },
    Completed { documents_embedded: usize, duration_ms: u64 },
    Failed { error: String },
}

/// Fetches one embedding per document under a concurrency cap.
///
/// The batch is all-or-nothing. The first failing unit of work records its
/// error and cancels the batch: in-flight provider calls are dropped and
/// units still waiting for a slot return without doing anything. Documents
/// are only mutated once every unit has succeeded.
pub struct EmbeddingPipeline<P: ?Sized, N: ?Sized> {
    provider: Arc<P>,
    normalizer: Arc<N>,
    config: EmbeddingPipelineConfig,
    progress_callback: Option<PipelineProgressCallback>,
}

impl<P, N> EmbeddingPipeline<P, N>
where
    P: EmbeddingProvider + ?Sized + 'static,
    N: TextNormalizer + ?Sized + 'static,
{
    pub fn new(provider: Arc<P>, normalizer: Arc<N>) -> Self {
        EmbeddingPipeline {
            provider,
            normalizer,
            config: EmbeddingPipelineConfig::default(),
            progress_callback: None,
        }
    }

    pub fn with_config(mut self, config: EmbeddingPipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.config.max_concurrent = max_concurrent;
        self
    }

    pub fn with_progress(mut self, callback: PipelineProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &EmbeddingPipelineConfig {
        &self.config
    }

    /// Populate the embedding of every document, or fail the whole batch
    pub async fn acquire(&self, documents: &mut [Document]) -> PipelineResult<()> {
        self.acquire_with_cancellation(documents, &CancellationToken::new())
            .await
    }

    /// Like [`acquire`](Self::acquire), additionally stopping when `parent`
    /// is cancelled
    pub async fn acquire_with_cancellation(
        &self,
        documents: &mut [Document],
        parent: &CancellationToken,
    ) -> PipelineResult<()> {
        let total_documents = documents.len();
        if total_documents == 0 {
            return Ok(());
        }

        if let Some(document) = documents.iter().find(|d| d.has_embedding()) {
            return Err(DomainError::InvalidOperation(format!(
                "Embedding for {} is already set",
                document.id()
            ))
            .into());
        }

        let start_time = Instant::now();
        let max_concurrent = self.config.max_concurrent.max(1);
        info!(
            "Acquiring embeddings for {} documents ({} at a time)",
            total_documents, max_concurrent
        );
        self.emit(PipelineProgressEvent::Started { total_documents });

        let cancel = parent.child_token();
        let slots = Arc::new(Semaphore::new(max_concurrent));
        let first_error = Arc::new(FirstError::new(cancel.clone()));
        let (tx, mut rx) = mpsc::channel(total_documents);

        for (index, document) in documents.iter().enumerate() {
            let worker = Worker {
                provider: Arc::clone(&self.provider),
                normalizer: Arc::clone(&self.normalizer),
                slots: Arc::clone(&slots),
                cancel: cancel.clone(),
                first_error: Arc::clone(&first_error),
                call_timeout: self.config.call_timeout,
                results: tx.clone(),
            };
            let unit = UnitOfWork {
                index,
                id: document.id().clone(),
                body: document.body().to_string(),
            };

            tokio::spawn(worker.run(unit));
        }

        // The channel closes once every worker has finished or bailed out
        drop(tx);

        let mut embeddings: Vec<Option<Embedding>> = vec![None; total_documents];
        let mut received = 0;
        while let Some((index, embedding)) = rx.recv().await {
            received += 1;
            if let Some(ref callback) = self.progress_callback {
                callback(PipelineProgressEvent::DocumentEmbedded {
                    id: documents[index].id().clone(),
                    completed: received,
                    total_documents,
                });
            }
            embeddings[index] = Some(embedding);
        }

        if let Some(error) = first_error.take().await {
            self.emit(PipelineProgressEvent::Failed {
                error: error.to_string(),
            });
            return Err(error);
        }

        if parent.is_cancelled() {
            self.emit(PipelineProgressEvent::Failed {
                error: PipelineError::Cancelled.to_string(),
            });
            return Err(PipelineError::Cancelled);
        }

        if received != total_documents {
            let error = PipelineError::Incomplete {
                expected: total_documents,
                received,
            };
            self.emit(PipelineProgressEvent::Failed {
                error: error.to_string(),
            });
            return Err(error);
        }

        for (document, embedding) in documents.iter_mut().zip(embeddings) {
            if let Some(embedding) = embedding {
                document.set_embedding(embedding)?;
            }
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Acquired {} embeddings in {} ms",
            total_documents, duration_ms
        );
        self.emit(PipelineProgressEvent::Completed {
            documents_embedded: total_documents,
            duration_ms,
        });

        Ok(())
    }

    fn emit(&self, event: PipelineProgressEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }
}

/// The first failure of a batch. Written at most once; the write also
/// cancels the batch.
struct FirstError {
    slot: Mutex<Option<PipelineError>>,
    cancel: CancellationToken,
}

impl FirstError {
    fn new(cancel: CancellationToken) -> Self {
        FirstError {
            slot: Mutex::new(None),
            cancel,
        }
    }

    async fn record(&self, error: PipelineError) {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            warn!("Cancelling embedding batch: {}", error);
            *slot = Some(error);
            self.cancel.cancel();
        } else {
            debug!("Discarding later failure: {}", error);
        }
    }

    /// Non-async variant for use in `Drop`. Cancels the batch even when the
    /// slot is busy.
    fn record_now(&self, error: PipelineError) {
        match self.slot.try_lock() {
            Ok(mut slot) if slot.is_none() => {
                warn!("Cancelling embedding batch: {}", error);
                *slot = Some(error);
            }
            _ => debug!("Discarding later failure: {}", error),
        }
        self.cancel.cancel();
    }

    async fn take(&self) -> Option<PipelineError> {
        self.slot.lock().await.take()
    }
}

/// Armed while a unit of work runs. Dropped armed only when the worker's
/// future is torn down mid-unit, i.e. after a panic.
///
/// Holds a result sender so the barrier cannot observe a closed channel
/// before the failure is recorded.
struct UnfinishedUnit {
    first_error: Arc<FirstError>,
    id: Option<DocumentId>,
    _results: mpsc::Sender<(usize, Embedding)>,
}

impl UnfinishedUnit {
    fn new(
        first_error: Arc<FirstError>,
        id: DocumentId,
        results: mpsc::Sender<(usize, Embedding)>,
    ) -> Self {
        UnfinishedUnit {
            first_error,
            id: Some(id),
            _results: results,
        }
    }

    fn finish(mut self) {
        self.id = None;
    }
}

impl Drop for UnfinishedUnit {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.first_error
                .record_now(PipelineError::WorkerPanicked { id });
        }
    }
}

/// What a worker needs to know about its document
struct UnitOfWork {
    index: usize,
    id: DocumentId,
    body: String,
}

struct Worker<P: ?Sized, N: ?Sized> {
    provider: Arc<P>,
    normalizer: Arc<N>,
    slots: Arc<Semaphore>,
    cancel: CancellationToken,
    first_error: Arc<FirstError>,
    call_timeout: Duration,
    results: mpsc::Sender<(usize, Embedding)>,
}

impl<P, N> Worker<P, N>
where
    P: EmbeddingProvider + ?Sized,
    N: TextNormalizer + ?Sized,
{
    async fn run(self, unit: UnitOfWork) {
        let unfinished = UnfinishedUnit::new(
            Arc::clone(&self.first_error),
            unit.id.clone(),
            self.results.clone(),
        );
        self.process(unit).await;
        unfinished.finish();
    }

    async fn process(&self, unit: UnitOfWork) {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Skipping {}: batch cancelled", unit.id);
                return;
            }
            permit = self.slots.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };

        if self.cancel.is_cancelled() {
            debug!("Skipping {}: batch cancelled", unit.id);
            return;
        }

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Aborted embedding request for {}", unit.id);
                return;
            }
            outcome = self.embed(&unit) => outcome,
        };

        match outcome {
            Ok(embedding) => {
                // The receiver lives until every worker is done
                self.results.send((unit.index, embedding)).await.ok();
            }
            Err(error) => self.first_error.record(error).await,
        }
    }

    async fn embed(&self, unit: &UnitOfWork) -> PipelineResult<Embedding> {
        let text = self
            .normalizer
            .strip(&unit.body)
            .map_err(|source| PipelineError::Normalization {
                id: unit.id.clone(),
                source,
            })?;

        debug!("Requesting embedding for {} ({} chars)", unit.id, text.len());

        match tokio::time::timeout(self.call_timeout, self.provider.embed(&text)).await {
            Ok(Ok(embedding)) => Ok(embedding),
            Ok(Err(source)) => Err(PipelineError::Provider {
                id: unit.id.clone(),
                source,
            }),
            Err(_) => Err(PipelineError::Provider {
                id: unit.id.clone(),
                source: ProviderError::Timeout(self.call_timeout),
            }),
        }
    }
}
