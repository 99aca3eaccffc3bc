use std::path::PathBuf;

use thiserror::Error;

/// Per-file ingestion failures. Neither variant aborts a batch: the file
/// contributes nothing and the remaining files are still merged.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed sheet: {reason}")]
    MalformedSheet { reason: String },

    #[error("unreadable file {}: {reason}", path.display())]
    UnreadableFile { path: PathBuf, reason: String },
}

impl IngestError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        IngestError::MalformedSheet {
            reason: reason.into(),
        }
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        IngestError::UnreadableFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
