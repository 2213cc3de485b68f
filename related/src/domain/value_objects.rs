/// Value objects for the domain layer
use super::base::{DomainError, DomainResult, ValueObject};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable identifier of a document within a run (its path, `/`-separated)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidValue(
                "DocumentId cannot be empty".to_string(),
            ));
        }
        Ok(DocumentId(id))
    }

    /// Build an identifier from a file path, normalising the platform
    /// separator to `/`. On Unix a `\` is part of a file name and is kept.
    pub fn from_path(path: &Path) -> DomainResult<Self> {
        let id = path.to_string_lossy();
        if std::path::MAIN_SEPARATOR == '\\' {
            Self::new(id.replace('\\', "/"))
        } else {
            Self::new(id.into_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for DocumentId {}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A semantic embedding vector produced by the embedding service
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    values: Vec<f64>,
}

impl Embedding {
    /// Create an embedding; rejects empty vectors and non-finite components
    pub fn new(values: Vec<f64>) -> DomainResult<Self> {
        if values.is_empty() {
            return Err(DomainError::InvalidValue(
                "Embedding cannot be empty".to_string(),
            ));
        }

        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(DomainError::InvalidValue(format!(
                "Embedding component {} is not a finite number",
                position
            )));
        }

        Ok(Embedding { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dimension_count(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity: `dot(a, b) / (|a| * |b|)`, in `[-1, 1]`
    pub fn cosine_similarity(&self, other: &Embedding) -> DomainResult<f64> {
        if self.values.len() != other.values.len() {
            return Err(DomainError::DimensionMismatch {
                left: self.values.len(),
                right: other.values.len(),
            });
        }

        let mut dot_product = 0.0;
        let mut magnitude_a = 0.0;
        let mut magnitude_b = 0.0;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot_product += a * b;
            magnitude_a += a * a;
            magnitude_b += b * b;
        }

        if magnitude_a == 0.0 || magnitude_b == 0.0 {
            return Err(DomainError::ZeroMagnitude);
        }

        Ok(dot_product / (magnitude_a.sqrt() * magnitude_b.sqrt()))
    }
}

impl ValueObject for Embedding {}

/// Publication timestamp from front matter.
///
/// Keeps the text as written so that saving a document writes the date back
/// exactly as the author wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishDate {
    raw: String,
    instant: DateTime<Utc>,
}

impl PublishDate {
    /// Parse RFC 3339 (`2024-05-01T10:00:00+02:00`), a naive timestamp
    /// (`2024-05-01T10:00:00`, `2024-05-01 10:00:00`, taken as UTC) or a bare
    /// date (`2024-05-01`, midnight UTC)
    pub fn parse(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        let text = raw.trim();

        let instant = if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            dt.with_timezone(&Utc)
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
            naive.and_utc()
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            naive.and_utc()
        } else if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            date.and_hms_opt(0, 0, 0)
                .ok_or_else(|| DomainError::InvalidValue(format!("Invalid date: {}", raw)))?
                .and_utc()
        } else {
            return Err(DomainError::InvalidValue(format!(
                "Unrecognised publish date: {}",
                raw
            )));
        };

        Ok(PublishDate { raw, instant })
    }

    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        PublishDate {
            raw: instant.to_rfc3339(),
            instant,
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this date lies strictly after `now`
    pub fn is_after(&self, now: DateTime<Utc>) -> bool {
        self.instant > now
    }
}

impl ValueObject for PublishDate {}

impl fmt::Display for PublishDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for PublishDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PublishDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PublishDate::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// Externally visible link to a related document (e.g. `/posts/my-post`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelatedLink(String);

impl RelatedLink {
    pub fn new(link: impl Into<String>) -> Self {
        RelatedLink(link.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for RelatedLink {}

impl fmt::Display for RelatedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const INDEX_SUFFIX: &str = "/index.md";

/// Rewrites document identifiers into site-relative related links.
///
/// `content/posts/foo/index.md` becomes `/posts/foo` with the default
/// content root of `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRewriter {
    content_root: String,
}

impl LinkRewriter {
    pub fn new(content_root: impl Into<String>) -> Self {
        LinkRewriter {
            content_root: content_root.into().trim_matches('/').to_string(),
        }
    }

    pub fn content_root(&self) -> &str {
        &self.content_root
    }

    pub fn rewrite(&self, id: &DocumentId) -> RelatedLink {
        let mut path = id.as_str().replace('\\', "/");
        while let Some(stripped) = path.strip_prefix("./") {
            path = stripped.to_string();
        }

        if !self.content_root.is_empty() {
            let root = self.content_root.as_str();
            if path == root {
                path.clear();
            } else if path.starts_with(&format!("{}/", root)) {
                path = path[root.len()..].to_string();
            } else if let Some(pos) = path.find(&format!("/{}/", root)) {
                path = path[pos + 1 + root.len()..].to_string();
            }
        }

        // ASCII lowercasing keeps byte offsets intact
        if path.to_ascii_lowercase().ends_with(INDEX_SUFFIX) {
            path.truncate(path.len() - INDEX_SUFFIX.len());
        } else if path.eq_ignore_ascii_case("index.md") {
            path.clear();
        }

        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        RelatedLink(path)
    }
}

impl Default for LinkRewriter {
    fn default() -> Self {
        LinkRewriter::new("content")
    }
}

impl ValueObject for LinkRewriter {}

/// A validated directory that holds the posts to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDirectoryPath {
    path: PathBuf,
}

impl PostDirectoryPath {
    pub fn new(path: impl Into<PathBuf>) -> DomainResult<Self> {
        let path = path.into();

        if !path.exists() {
            return Err(DomainError::InvalidValue(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(DomainError::InvalidValue(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(PostDirectoryPath { path })
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }
}

impl ValueObject for PostDirectoryPath {}

impl fmt::Display for PostDirectoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
