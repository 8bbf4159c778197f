//! Core library for the token ring.
//!
//! This crate provides the fundamental abstractions for consistent hashing:
//! - Token type and ring arithmetic
//! - Partitioner algorithms (key → token)
//! - Node identity and status
//! - Ring topology, lookup and snapshots
//! - Topology configuration

pub mod config;
pub mod error;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod token;

pub use config::{NodeConfig, TopologyConfig};
pub use error::{Error, Result};
pub use node::{HostId, Node, NodeId, NodeStatus};
pub use partitioner::{Partitioner, PartitionerKind, SipPartitioner, Xxh3Partitioner};
pub use ring::{RingEntry, RingSnapshot, RingTopology};
pub use token::Token;
