//! Replication errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Failure to derive a replica set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    /// The ring could not resolve the token (no live node, bad key).
    #[error("resolution failed: {0}")]
    Ring(#[from] corelib::Error),
}
