use std::fmt;

use thiserror::Error;

/// Extraction only fails when the page is not a note page at all.
/// Missing sub-fields degrade to defaults and never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Not a supported note page: {url}")]
    NotASupportedPage { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Create => f.write_str("create"),
            WriteOp::Update => f.write_str("update"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Write error ({operation}): {message}")]
    Write { operation: WriteOp, message: String },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("Another sync is already in flight")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),
}
