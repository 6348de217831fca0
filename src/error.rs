//! Error taxonomy (spec.md §7).
//!
//! Configuration and boundary-spec errors are fatal at construction time.
//! Peer-communication errors are fatal to the whole job. I/O errors are
//! logged by the writing rank and do not abort the time loop — callers
//! that want that behavior should match on `SolverError::Io` explicitly
//! rather than propagate it with `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("boundary specification error: {0}")]
    BoundarySpec(String),

    #[error("peer communication failure with rank {rank}: {source}")]
    PeerCommunication {
        rank: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while persisting '{artifact}': {source}")]
    Io {
        artifact: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SolverError>;
