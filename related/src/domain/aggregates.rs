/// Domain aggregates
use super::base::{DomainError, DomainResult, Entity};
use super::front_matter::FrontMatter;
use super::value_objects::{DocumentId, Embedding, PublishDate, RelatedLink};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// A Document is the aggregate root for one post: its front matter, its
/// body and, once acquired, its embedding
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    raw: String,
    front_matter: FrontMatter,
    body: String,
    embedding: Option<Embedding>,
}

impl Document {
    /// Create a document from already separated front matter and body
    pub fn new(id: DocumentId, front_matter: FrontMatter, body: impl Into<String>) -> Self {
        Document {
            id,
            raw: String::new(),
            front_matter,
            body: body.into(),
            embedding: None,
        }
    }

    /// Attach the file content the document was parsed from
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Content after the front matter block, byte for byte
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Full file content as loaded
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn front_matter(&self) -> &FrontMatter {
        &self.front_matter
    }

    pub fn title(&self) -> Option<&str> {
        self.front_matter.title()
    }

    /// A document is published when it is not a draft
    pub fn is_published(&self) -> bool {
        !self.front_matter.is_draft()
    }

    pub fn publish_date(&self) -> Option<&PublishDate> {
        self.front_matter.date()
    }

    /// Whether the publish date lies strictly after `now`
    pub fn is_scheduled_after(&self, now: DateTime<Utc>) -> bool {
        self.publish_date().is_some_and(|date| date.is_after(now))
    }

    /// Whether this document may appear in `subject`'s related list
    pub fn is_eligible_candidate_for(&self, subject: &Document, now: DateTime<Utc>) -> bool {
        self.id != subject.id && self.is_published() && !self.is_scheduled_after(now)
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Set the embedding; it can only be set once
    pub fn set_embedding(&mut self, embedding: Embedding) -> DomainResult<()> {
        if self.embedding.is_some() {
            return Err(DomainError::InvalidOperation(format!(
                "Embedding for {} is already set",
                self.id
            )));
        }
        self.embedding = Some(embedding);
        Ok(())
    }

    pub fn related(&self) -> &[String] {
        self.front_matter.similar_posts()
    }

    /// Replace the related links, returning whether the list changed
    pub fn set_related(&mut self, links: &[RelatedLink]) -> bool {
        self.front_matter.set_similar_posts(links)
    }

    /// Lowercase hex SHA-256 of the loaded file content
    pub fn content_hash(&self) -> String {
        format!("{:x}", Sha256::digest(self.raw.as_bytes()))
    }
}

impl Entity for Document {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
