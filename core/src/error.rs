use std::path::PathBuf;
use thiserror::Error;

use crate::index::DocId;

/// Structural errors from the inverted index itself.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A document ID was submitted twice. The index is left unchanged;
    /// re-indexing changed content means removal plus reinsertion.
    #[error("document {0} is already indexed")]
    DuplicateDocument(DocId),

    /// `DocId::MAX` is reserved so the next-ID counter can always sit one
    /// past the highest indexed document. Raised for caller-supplied IDs
    /// at the reserved value and when assignment runs out of IDs.
    #[error("document id {0} is past the end of the id space")]
    DocumentIdOutOfRange(DocId),
}

/// Errors surfaced by the concurrency-safe index service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The snapshot write failed after the in-memory mutation succeeded.
    /// The index keeps the new state; callers retry `persist`, not the
    /// whole update, so document IDs are never assigned twice.
    #[error("failed to persist snapshot to {path}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read snapshot at {path}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot at {path} is corrupt")]
    SnapshotDecode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}
