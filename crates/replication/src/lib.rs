//! Replication strategies for consistent hashing.
//!
//! This crate determines:
//! - Where to place replicas (which nodes, in which order)
//! - Whether the live replicas can satisfy a consistency level

pub mod consistency;
pub mod error;
pub mod placement;
pub mod resolver;
pub mod strategy;

pub use consistency::{ConsistencyCheck, ConsistencyLevel};
pub use error::ReplicationError;
pub use placement::ReplicaSet;
pub use resolver::ReplicaResolver;
pub use strategy::{ReplicationStrategy, SimpleStrategy};
