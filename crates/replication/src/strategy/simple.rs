//! Simple replication strategy.
//!
//! Places N replicas sequentially around the ring (clockwise from the primary).
//!
//! # Algorithm
//!
//! 1. Start at the first token `>= key token` (wrapping around)
//! 2. Walk clockwise, skipping DOWN nodes and nodes already collected
//! 3. Stop at N nodes or after one full lap, whichever comes first
//!
//! A ring with fewer live nodes than N yields a shorter set; the caller sees
//! the under-replication instead of a padded list.
//!
//! # Performance
//!
//! - **Time**: O(log n + t) where t = tokens visited before N distinct nodes
//! - **Space**: O(r) - returns Vec of node IDs
//!
//! # Limitations
//!
//! - Doesn't consider data center/rack placement

use crate::error::Result;
use crate::placement::ReplicaSet;
use crate::strategy::ReplicationStrategy;
use corelib::error::Error;
use corelib::node::NodeId;
use corelib::ring::RingSnapshot;
use corelib::token::Token;
use std::collections::HashSet;

/// Simple replication strategy: N replicas placed sequentially around the ring.
///
/// # Example
///
/// ```rust
/// use corelib::{Node, NodeId, RingTopology, Token};
/// use replication::{ReplicationStrategy, SimpleStrategy};
///
/// let ring = RingTopology::new();
/// ring.add_node(Node::new(NodeId::new("a", 9042)), [Token(0)]).unwrap();
/// ring.add_node(Node::new(NodeId::new("b", 9042)), [Token(100)]).unwrap();
///
/// let replicas = SimpleStrategy::new(2)
///     .replicas_for_token(&ring.snapshot(), Token(50))
///     .unwrap();
/// assert_eq!(replicas.primary(), Some(&NodeId::new("b", 9042)));
/// assert_eq!(replicas.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SimpleStrategy {
    /// Number of replicas to create (including primary).
    replication_factor: usize,
}

impl SimpleStrategy {
    /// Create a new simple strategy with the given replication factor.
    ///
    /// * `replication_factor` - Number of replicas (typically 1-5)
    ///   - 1: No replication (single copy)
    ///   - 3: Standard (primary + 2 replicas)
    pub fn new(replication_factor: usize) -> Self {
        Self { replication_factor }
    }
}

impl Default for SimpleStrategy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ReplicationStrategy for SimpleStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn replicas_for_token(&self, ring: &RingSnapshot, token: Token) -> Result<ReplicaSet> {
        let mut replicas: Vec<NodeId> = Vec::with_capacity(self.replication_factor);
        if self.replication_factor > 0 {
            let mut seen: HashSet<&NodeId> = HashSet::new();
            for entry in ring.clockwise_from(token).filter(|e| e.status.is_up()) {
                if !seen.insert(&entry.node) {
                    continue;
                }
                replicas.push(entry.node.clone());
                if replicas.len() == self.replication_factor {
                    break;
                }
            }
            if replicas.is_empty() {
                return Err(Error::EmptyRing.into());
            }
        }

        Ok(ReplicaSet {
            token,
            replication_factor: self.replication_factor,
            replicas,
        })
    }

    fn name(&self) -> &'static str {
        "SimpleStrategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplicationError;
    use corelib::node::{Node, NodeStatus};
    use corelib::ring::RingTopology;

    fn id(name: &str) -> NodeId {
        NodeId::new(name, 9042)
    }

    fn ring() -> RingTopology {
        let ring = RingTopology::new();
        ring.add_node(Node::new(id("a")), [Token(-100), Token(200)]).unwrap();
        ring.add_node(Node::new(id("b")), [Token(0)]).unwrap();
        ring.add_node(Node::new(id("c")), [Token(100)]).unwrap();
        ring
    }

    #[test]
    fn test_simple_strategy_replication_factor() {
        let strategy = SimpleStrategy::new(3);
        assert_eq!(strategy.replication_factor(), 3);
        assert_eq!(SimpleStrategy::default().replication_factor(), 3);
    }

    #[test]
    fn test_walks_clockwise_and_dedups_vnodes() {
        let replicas = SimpleStrategy::new(3)
            .replicas_for_token(&ring().snapshot(), Token(150))
            .unwrap();
        // 200 (a), wrap -100 (a again, skipped), 0 (b), 100 (c)
        assert_eq!(replicas.replicas, vec![id("a"), id("b"), id("c")]);
    }

    #[test]
    fn test_skips_down_nodes() {
        let ring = ring();
        ring.set_status(&id("b"), NodeStatus::Down).unwrap();
        let replicas = SimpleStrategy::new(2)
            .replicas_for_token(&ring.snapshot(), Token(-50))
            .unwrap();
        assert_eq!(replicas.replicas, vec![id("c"), id("a")]);
    }

    #[test]
    fn test_partial_set_when_not_enough_live_nodes() {
        let ring = ring();
        ring.set_status(&id("a"), NodeStatus::Down).unwrap();
        ring.set_status(&id("b"), NodeStatus::Down).unwrap();
        let replicas = SimpleStrategy::new(3)
            .replicas_for_token(&ring.snapshot(), Token(0))
            .unwrap();
        assert_eq!(replicas.replicas, vec![id("c")]);
        assert!(replicas.is_under_replicated());
    }

    #[test]
    fn test_zero_factor_is_empty() {
        let replicas = SimpleStrategy::new(0)
            .replicas_for_token(&ring().snapshot(), Token(0))
            .unwrap();
        assert!(replicas.is_empty());
    }

    #[test]
    fn test_no_live_nodes_fails() {
        let ring = RingTopology::new();
        let err = SimpleStrategy::new(1)
            .replicas_for_token(&ring.snapshot(), Token(0))
            .unwrap_err();
        assert_eq!(err, ReplicationError::Ring(Error::EmptyRing));
    }
}
