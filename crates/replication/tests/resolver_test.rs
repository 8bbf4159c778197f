//! Replica resolution against a live ring across failures and recoveries.

use corelib::node::{Node, NodeId, NodeStatus};
use corelib::partitioner::{Partitioner, SipPartitioner};
use corelib::{Error, RingTopology, Token, TopologyConfig};
use proptest::prelude::*;
use replication::{ReplicaResolver, ReplicationError};
use std::collections::HashSet;
use std::sync::Arc;

fn demo_resolver() -> ReplicaResolver {
    ReplicaResolver::new(Arc::new(TopologyConfig::demo().build_ring().unwrap()))
}

/// Node ids of the demo ring in token order.
fn demo_order(resolver: &ReplicaResolver) -> Vec<NodeId> {
    resolver
        .ring()
        .snapshot()
        .iter()
        .map(|e| e.node.clone())
        .collect()
}

#[test]
fn test_bird_01_shifts_by_one_after_primary_fails() {
    let resolver = demo_resolver();
    let order = demo_order(&resolver);
    let token = SipPartitioner.token("bird_01").unwrap();

    // Index of the owner: first token >= T, wrapping to 0.
    let tokens: Vec<Token> = resolver.ring().snapshot().iter().map(|e| e.token).collect();
    let owner = tokens.iter().position(|t| *t >= token).unwrap_or(0);
    let next = (owner + 1) % 4;
    let next_next = (owner + 2) % 4;

    let before = resolver.resolve(token, 2).unwrap();
    assert_eq!(before.replicas, vec![order[owner].clone(), order[next].clone()]);

    resolver
        .ring()
        .set_status(&order[owner], NodeStatus::Down)
        .unwrap();
    let after = resolver.resolve(token, 2).unwrap();
    assert!(!after.contains(&order[owner]));
    assert_eq!(
        after.replicas,
        vec![order[next].clone(), order[next_next].clone()]
    );
}

#[test]
fn test_single_live_node_returns_partial_set() {
    let resolver = demo_resolver();
    let order = demo_order(&resolver);
    for id in &order[1..] {
        resolver.ring().set_status(id, NodeStatus::Down).unwrap();
    }

    let replicas = resolver.resolve(Token(12345), 3).unwrap();
    assert_eq!(replicas.replicas, vec![order[0].clone()]);
    assert_eq!(replicas.replication_factor, 3);
}

#[test]
fn test_all_down_is_resolution_error() {
    let resolver = demo_resolver();
    for id in demo_order(&resolver) {
        resolver.ring().set_status(&id, NodeStatus::Down).unwrap();
    }
    assert_eq!(
        resolver.resolve(Token(0), 2),
        Err(ReplicationError::Ring(Error::EmptyRing))
    );
}

#[test]
fn test_resolve_key_rejects_empty_key() {
    let resolver = demo_resolver();
    assert_eq!(
        resolver.resolve_key(&SipPartitioner, "", 2),
        Err(ReplicationError::Ring(Error::InvalidKey))
    );
}

#[test]
fn test_decommission_then_add_fresh_tokens() {
    let resolver = demo_resolver();
    let order = demo_order(&resolver);
    let ring = resolver.ring();

    ring.remove_node(&order[0]).unwrap();
    let fresh = NodeId::new("cassandra-5", 9042);
    ring.add_node(Node::new(fresh.clone()), [Token(-(1 << 61))]).unwrap();

    // The old MIN binding is gone; MIN falls to the next surviving token.
    let snapshot = ring.snapshot();
    assert!(snapshot.iter().all(|e| e.token != Token::MIN));
    assert_eq!(ring.successor_node(Token::MIN).unwrap(), order[1]);
    assert_eq!(
        ring.successor_node(Token(-(1 << 61) - 1)).unwrap(),
        fresh
    );
}

proptest! {
    /// Property: at most rf distinct UP nodes, the first being the live successor.
    #[test]
    fn prop_resolve_returns_distinct_live_nodes(
        layout in prop::collection::btree_map(any::<i64>(), 0u8..6, 1..40),
        down in prop::collection::hash_set(0u8..6, 0..6),
        probe in any::<i64>(),
        rf in 1usize..5,
    ) {
        let ring = Arc::new(RingTopology::new());
        for (token, n) in &layout {
            ring.add_node(Node::new(NodeId::new(format!("n{n}"), 9042)), [Token(*token)]).unwrap();
        }
        for n in &down {
            let _ = ring.set_status(&NodeId::new(format!("n{n}"), 9042), NodeStatus::Down);
        }
        let resolver = ReplicaResolver::new(Arc::clone(&ring));

        match resolver.resolve(Token(probe), rf) {
            Ok(set) => {
                prop_assert!(set.len() <= rf);
                prop_assert!(!set.is_empty());
                let unique: HashSet<_> = set.iter().collect();
                prop_assert_eq!(unique.len(), set.len());
                for id in set.iter() {
                    prop_assert_eq!(ring.status(id), Some(NodeStatus::Up));
                }
                let live_owner = ring.successor_node(Token(probe)).unwrap();
                prop_assert_eq!(set.primary().unwrap(), &live_owner);
                prop_assert_eq!(set.len(), rf.min(ring.live_node_count()));
            }
            Err(err) => {
                prop_assert_eq!(err, ReplicationError::Ring(Error::EmptyRing));
                prop_assert_eq!(ring.live_node_count(), 0);
            }
        }
    }

    /// Property: a DOWN/UP round trip restores the original replica set.
    #[test]
    fn prop_down_up_round_trip(
        layout in prop::collection::btree_map(any::<i64>(), 0u8..5, 2..30),
        victim in 0u8..5,
        probe in any::<i64>(),
        rf in 1usize..4,
    ) {
        let ring = Arc::new(RingTopology::new());
        for (token, n) in &layout {
            ring.add_node(Node::new(NodeId::new(format!("n{n}"), 9042)), [Token(*token)]).unwrap();
        }
        let resolver = ReplicaResolver::new(Arc::clone(&ring));
        let victim = NodeId::new(format!("n{victim}"), 9042);
        prop_assume!(ring.contains(&victim));

        let before = resolver.resolve(Token(probe), rf).unwrap();
        ring.set_status(&victim, NodeStatus::Down).unwrap();
        if let Ok(during) = resolver.resolve(Token(probe), rf) {
            prop_assert!(!during.contains(&victim));
        }
        ring.set_status(&victim, NodeStatus::Up).unwrap();
        prop_assert_eq!(resolver.resolve(Token(probe), rf).unwrap(), before);
    }
}
