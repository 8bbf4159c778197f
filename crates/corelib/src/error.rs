//! Error types for the core library.

use crate::node::NodeId;
use crate::token::Token;
use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Partition keys must be non-empty.
    #[error("Invalid key: partition key must not be empty")]
    InvalidKey,
    /// A token is already bound to another node.
    #[error("Duplicate token {token}: already owned by {owner}, requested by {requested}")]
    DuplicateToken {
        token: Token,
        owner: NodeId,
        requested: NodeId,
    },
    /// No UP node is left to own a token.
    #[error("Empty ring: no live node owns any token")]
    EmptyRing,
    /// The node was never (or is no longer) part of the ring.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    /// Invalid node configuration
    #[error("Invalid node: {0}")]
    InvalidNode(String),
    /// Invalid topology configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
