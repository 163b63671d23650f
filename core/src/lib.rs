pub mod client;
pub mod config;
pub mod error;
pub mod security;
pub mod types;
pub mod utils;

// Only files with this extension are synchronized documents
pub const DOCUMENT_EXTENSION: &str = ".md";
