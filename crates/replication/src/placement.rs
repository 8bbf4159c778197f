//! Replica placement results.

use corelib::node::NodeId;
use corelib::token::Token;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered replicas for one token: primary owner first, then clockwise
/// successors. Never longer than the replication factor and never padded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSet {
    pub token: Token,
    pub replication_factor: usize,
    pub replicas: Vec<NodeId>,
}

impl ReplicaSet {
    pub fn primary(&self) -> Option<&NodeId> {
        self.replicas.first()
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.replicas.contains(node)
    }

    pub fn get(&self, index: usize) -> Option<&NodeId> {
        self.replicas.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.replicas.iter()
    }

    /// Fewer live replicas than the replication factor asks for.
    pub fn is_under_replicated(&self) -> bool {
        self.replicas.len() < self.replication_factor
    }
}

impl fmt::Display for ReplicaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token {} -> [", self.token)?;
        for (i, node) in self.replicas.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{node}")?;
        }
        write!(f, "] ({}/{})", self.replicas.len(), self.replication_factor)
    }
}
