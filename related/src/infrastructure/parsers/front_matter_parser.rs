/// Front matter parser - splits a post into its YAML header and markdown body
use crate::domain::aggregates::Document;
use crate::domain::base::Entity;
use crate::domain::front_matter::FrontMatter;
use crate::domain::value_objects::DocumentId;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid frontmatter in file: {0}")]
    MissingFrontMatter(String),

    #[error("error parsing YAML in file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::base::DomainError),
}

pub type ParseResult<T> = Result<T, ParseError>;

const DELIMITER: &str = "---";

/// Parser for posts with a `---` delimited YAML front matter block
pub struct FrontMatterParser;

impl FrontMatterParser {
    /// Parse a post file; its path becomes the document identifier
    pub async fn parse_file(path: &Path) -> ParseResult<Document> {
        let raw = tokio::fs::read_to_string(path).await?;
        let id = DocumentId::from_path(path)?;

        Self::parse_content(&raw, id)
    }

    /// Parse raw file content into a Document
    pub fn parse_content(raw: &str, id: DocumentId) -> ParseResult<Document> {
        let (header, body) = Self::split(raw)
            .ok_or_else(|| ParseError::MissingFrontMatter(id.as_str().to_string()))?;

        let front_matter: FrontMatter = if header.trim().is_empty() {
            FrontMatter::default()
        } else {
            serde_yaml::from_str(header).map_err(|source| ParseError::Yaml {
                path: id.as_str().to_string(),
                source,
            })?
        };

        Ok(Document::new(id, front_matter, body).with_raw(raw))
    }

    /// Render a document back into file content: the front matter block
    /// followed by the untouched body
    pub fn render(document: &Document) -> ParseResult<String> {
        let yaml = serde_yaml::to_string(document.front_matter()).map_err(|source| {
            ParseError::Yaml {
                path: document.id().as_str().to_string(),
                source,
            }
        })?;

        let mut output = String::with_capacity(yaml.len() + document.body().len() + 8);
        output.push_str(DELIMITER);
        output.push('\n');
        output.push_str(&yaml);
        output.push_str(DELIMITER);
        output.push_str(document.body());

        Ok(output)
    }

    /// Split into (header, body). The body starts right after the closing
    /// delimiter, so it keeps its leading newline.
    fn split(raw: &str) -> Option<(&str, &str)> {
        let content = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let rest = content.strip_prefix(DELIMITER)?;
        let rest = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))?;

        if let Some(body) = rest.strip_prefix(DELIMITER) {
            return Some(("", body));
        }

        let closing = rest.find(&format!("\n{}", DELIMITER))?;
        let header = &rest[..closing + 1];
        let body = &rest[closing + 1 + DELIMITER.len()..];

        Some((header, body))
    }
}
