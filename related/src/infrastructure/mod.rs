pub mod embeddings;
pub mod file_system;
pub mod parsers;
pub mod persistence;
