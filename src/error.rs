use thiserror::Error;

/// Errors raised while loading a catalog or building the index.
///
/// Query-time faults never surface as this type: the search pipeline turns
/// them into an empty result.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("catalog is empty, nothing to index")]
    EmptyCatalog,

    #[error("document {got} indexed out of order (expected id {expected})")]
    OutOfOrderDocument { expected: usize, got: usize },

    #[error("document {0} is in the index but not in the catalog")]
    MissingDocument(usize),

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse CSV catalog: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
