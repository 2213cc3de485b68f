use crate::domain::{aggregates::Document, DocumentId, DomainError};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Document {0} was not loaded from this repository")]
    UnknownDocument(DocumentId),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository trait for loading and persisting Document aggregates.
///
/// This trait defines the contract between the related-posts run and the
/// place the posts live. Implementations decide how documents are located
/// and serialized; callers only rely on front matter and body surviving a
/// load/save round trip.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Loads every document from the repository's source location.
    async fn load_all(&self) -> RepositoryResult<Vec<Document>>;

    /// Persists a document, overwriting the stored version.
    async fn save(&self, document: &Document) -> RepositoryResult<()>;
}
