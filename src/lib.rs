// Re-export main components
pub mod api;
pub mod catalog;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod query;
pub mod ranking;
pub mod tokenizer;

// Re-export commonly used types
pub use catalog::load_catalog;
pub use config::EngineConfig;
pub use document::{DocId, Product};
pub use engine::{EngineStats, QueryResult, SearchEngine};
pub use error::SearchError;
pub use index::InvertedIndex;
pub use query::{ExtractedQuery, QueryExtractor, QueryFilters};
pub use ranking::ScoredDocument;
pub use tokenizer::Tokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
