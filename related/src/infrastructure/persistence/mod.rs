mod markdown_repository;

pub use markdown_repository::MarkdownDocumentRepository;
