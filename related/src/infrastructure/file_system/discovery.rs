/// File discovery utilities for finding post files
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the file that holds a post inside its bundle directory
pub const POST_FILE_NAME: &str = "index.md";

fn is_post_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(POST_FILE_NAME))
}

/// Discover all post files (`index.md`, any case) below a directory,
/// recursively, sorted by path
pub async fn discover_post_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = collect_post_files(dir.to_path_buf()).await?;
    files.sort();
    Ok(files)
}

async fn collect_post_files(dir: PathBuf) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(&dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;

        if file_type.is_file() {
            if is_post_file(&path) {
                files.push(path);
            }
        } else if file_type.is_dir() {
            // Skip hidden directories
            if let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) {
                if !dir_name.starts_with('.') {
                    let mut sub_files = Box::pin(collect_post_files(path)).await?;
                    files.append(&mut sub_files);
                }
            }
        }
    }

    Ok(files)
}
