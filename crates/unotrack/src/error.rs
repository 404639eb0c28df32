use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory not found")]
    NoHomeDirectory,

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("Corrupt snapshot {id}: {reason}")]
    CorruptSnapshot { id: String, reason: String },

    #[error("Snapshot {id} uses schema version {found}, newest supported is {supported}")]
    UnsupportedSchema {
        id: String,
        found: u64,
        supported: u32,
    },

    #[error("Failed to persist snapshot to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    pub(crate) fn corrupt(id: &str, reason: impl Into<String>) -> Self {
        LedgerError::CorruptSnapshot {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
