use crate::application::repositories::{DocumentRepository, RepositoryError, RepositoryResult};
use crate::domain::aggregates::Document;
use crate::domain::base::Entity;
use crate::domain::value_objects::{DocumentId, PostDirectoryPath};
use crate::infrastructure::file_system::discover_post_files;
use crate::infrastructure::parsers::{FrontMatterParser, ParseError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Document repository backed by a directory of markdown post bundles.
///
/// Every `index.md` below the post directory is one document. `save` writes
/// to the exact path the document was discovered at, so only documents
/// returned by `load_all` can be saved.
pub struct MarkdownDocumentRepository {
    post_dir: PostDirectoryPath,
    paths: Mutex<HashMap<DocumentId, PathBuf>>,
}

impl MarkdownDocumentRepository {
    pub fn new(post_dir: PostDirectoryPath) -> Self {
        MarkdownDocumentRepository {
            post_dir,
            paths: Mutex::new(HashMap::new()),
        }
    }

    pub fn post_dir(&self) -> &PostDirectoryPath {
        &self.post_dir
    }
}

#[async_trait]
impl DocumentRepository for MarkdownDocumentRepository {
    async fn load_all(&self) -> RepositoryResult<Vec<Document>> {
        let files = discover_post_files(self.post_dir.as_path()).await?;
        debug!("Found {} post files in {}", files.len(), self.post_dir);

        let mut documents = Vec::with_capacity(files.len());
        let mut paths = HashMap::with_capacity(files.len());
        for path in files {
            match FrontMatterParser::parse_file(&path).await {
                Ok(document) => {
                    debug!("Loaded {} (sha256 {})", document.id(), document.content_hash());
                    paths.insert(document.id().clone(), path);
                    documents.push(document);
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        *self.paths.lock().await = paths;
        Ok(documents)
    }

    async fn save(&self, document: &Document) -> RepositoryResult<()> {
        let content = FrontMatterParser::render(document).map_err(|e| match e {
            ParseError::Io(io) => RepositoryError::FileSystem(io),
            ParseError::Domain(domain) => RepositoryError::Domain(domain),
            other => RepositoryError::Serialization(other.to_string()),
        })?;

        let path = self
            .paths
            .lock()
            .await
            .get(document.id())
            .cloned()
            .ok_or_else(|| RepositoryError::UnknownDocument(document.id().clone()))?;
        tokio::fs::write(&path, content).await?;
        debug!("Saved {}", path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::RelatedLink;
    use std::fs;
    use tempfile::TempDir;

    fn write_post(root: &std::path::Path, name: &str, content: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("index.md");
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_all_skips_unparseable_posts() {
        let temp_dir = TempDir::new().unwrap();
        write_post(temp_dir.path(), "good", "---\ntitle: Good\n---\nBody\n");
        write_post(temp_dir.path(), "no-header", "Just text\n");
        write_post(temp_dir.path(), "bad-yaml", "---\ntitle: [oops\n---\nBody\n");

        let repo = MarkdownDocumentRepository::new(PostDirectoryPath::new(temp_dir.path()).unwrap());
        let documents = repo.load_all().await.unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].title(), Some("Good"));
    }

    #[tokio::test]
    async fn test_save_rewrites_front_matter_and_keeps_body() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_post(
            temp_dir.path(),
            "post",
            "---\ntitle: Post\ncustom_field: kept\n---\n\n# Heading\n\nParagraph.\n",
        );

        let repo = MarkdownDocumentRepository::new(PostDirectoryPath::new(temp_dir.path()).unwrap());
        let mut documents = repo.load_all().await.unwrap();
        documents[0].set_related(&[RelatedLink::new("/posts/other")]);
        repo.save(&documents[0]).await.unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("---\n"));
        assert!(written.contains("custom_field: kept"));
        assert!(written.contains("similar_posts:\n- /posts/other\n"));
        assert!(written.ends_with("---\n\n# Heading\n\nParagraph.\n"));

        let reloaded = repo.load_all().await.unwrap();
        assert_eq!(reloaded[0].related(), &["/posts/other".to_string()]);
        assert_eq!(reloaded[0].body(), documents[0].body());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_save_writes_back_to_the_discovered_path() {
        let temp_dir = TempDir::new().unwrap();
        let escaped = write_post(temp_dir.path(), "a\\b", "---\ntitle: Escaped\n---\nBody\n");
        let nested = write_post(temp_dir.path(), "a/b", "---\ntitle: Nested\n---\nBody\n");

        let repo = MarkdownDocumentRepository::new(PostDirectoryPath::new(temp_dir.path()).unwrap());
        let mut documents = repo.load_all().await.unwrap();
        assert_eq!(documents.len(), 2);

        let index = documents
            .iter()
            .position(|d| d.title() == Some("Escaped"))
            .unwrap();
        documents[index].set_related(&[RelatedLink::new("/posts/other")]);
        repo.save(&documents[index]).await.unwrap();

        assert!(fs::read_to_string(&escaped)
            .unwrap()
            .contains("similar_posts:\n- /posts/other\n"));
        assert_eq!(
            fs::read_to_string(&nested).unwrap(),
            "---\ntitle: Nested\n---\nBody\n"
        );
    }

    #[tokio::test]
    async fn test_save_rejects_documents_it_did_not_load() {
        let temp_dir = TempDir::new().unwrap();
        let repo = MarkdownDocumentRepository::new(PostDirectoryPath::new(temp_dir.path()).unwrap());
        let stray = Document::new(
            DocumentId::new(temp_dir.path().join("stray/index.md").to_string_lossy()).unwrap(),
            Default::default(),
            "Body",
        );

        let result = repo.save(&stray).await;

        assert!(matches!(result, Err(RepositoryError::UnknownDocument(_))));
        assert!(!temp_dir.path().join("stray").exists());
    }
}
