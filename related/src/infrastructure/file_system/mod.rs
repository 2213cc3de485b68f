pub mod discovery;

pub use discovery::{discover_post_files, POST_FILE_NAME};
