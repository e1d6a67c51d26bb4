//! Error types for the proof-of-space crate.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PostError>;

/// Errors raised by configuration checks and engine operations.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    /// The configuration violates one of its invariants.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data on disk no longer matches the commitment made at initialization.
    #[error("commitment mismatch in {}: data was modified after initialization", dir.display())]
    CommitmentMismatch { dir: PathBuf },

    /// No initialized data exists for the requested identity.
    #[error("no initialized data for identity {identity} in {}", dir.display())]
    NotInitialized { identity: String, dir: PathBuf },

    /// A proof failed validation.
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// Persisted metadata could not be encoded or decoded.
    #[error("metadata serialization failed for {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A worker thread panicked.
    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),
}

impl PostError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
