use std::io;

use thiserror::Error;

/// Failures surfaced by a transport. Callers on the simulation path log and drop these.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode message: {0}")]
    Codec(#[from] bincode::Error),

    #[error("transport channel closed")]
    Closed,
}

/// Why a single snapshot entity was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("{entity} entry is missing `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity} entry has a non-finite `{field}`")]
    NonFinite {
        entity: &'static str,
        field: &'static str,
    },

    #[error("bullet {0} has a zero-length direction")]
    ZeroDirection(u64),
}
