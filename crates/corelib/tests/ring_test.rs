//! Integration tests for the ring topology.
//!
//! # Test Strategy
//!
//! 1. **Basic functionality**: Empty ring, add/lookup, remove
//! 2. **Status**: DOWN nodes are skipped, UP restores them
//! 3. **Edge cases**: Wraparound, single node, decommission then re-add
//! 4. **Properties**: successor semantics over random rings
//! 5. **Thread safety**: Concurrent readers with status flips and join/leave

use corelib::node::{Node, NodeId, NodeStatus};
use corelib::partitioner::{Partitioner, SipPartitioner};
use corelib::ring::RingTopology;
use corelib::{Error, Token};
use proptest::prelude::*;
use std::sync::Arc;

fn id(n: u32) -> NodeId {
    NodeId::new(format!("10.0.0.{n}"), 9042)
}

fn node(n: u32) -> Node {
    Node::new(id(n))
}

// ============================================================================
// Basic Functionality Tests
// ============================================================================

#[test]
fn test_empty_ring_lookup() {
    let ring = RingTopology::new();
    assert_eq!(ring.successor_node(Token(0)), Err(Error::EmptyRing));
    assert_eq!(ring.primary_owner(Token(0)), None);
    assert_eq!(ring.node_count(), 0);
    assert_eq!(ring.token_count(), 0);
    assert!(ring.snapshot().is_empty());
}

#[test]
fn test_add_node_and_lookup() {
    let ring = RingTopology::new();
    ring.add_node(node(1), [Token(-10), Token(10), Token(20), Token(30)])
        .unwrap();

    assert_eq!(ring.node_count(), 1);
    assert_eq!(ring.token_count(), 4);

    let token = SipPartitioner.token("test-key").unwrap();
    assert_eq!(ring.successor_node(token).unwrap(), id(1));
    assert_eq!(ring.node(&id(1)).unwrap().id, id(1));
    assert_eq!(ring.status(&id(1)), Some(NodeStatus::Up));
}

#[test]
fn test_remove_node() {
    let ring = RingTopology::new();
    ring.add_node(node(1), [Token(-100), Token(100)]).unwrap();
    ring.add_node(node(2), [Token(-50), Token(50)]).unwrap();
    assert_eq!(ring.token_count(), 4);

    let removed = ring.remove_node(&id(1)).unwrap();
    assert_eq!(removed.id, id(1));
    assert_eq!(ring.node_count(), 1);
    assert_eq!(ring.token_count(), 2);

    // Range previously owned by node 1 falls through to node 2.
    assert_eq!(ring.successor_node(Token(-100)).unwrap(), id(2));
    assert_eq!(ring.successor_node(Token(60)).unwrap(), id(2));

    assert_eq!(
        ring.remove_node(&id(999)).unwrap_err(),
        Error::UnknownNode(id(999))
    );
}

// ============================================================================
// Status Tests
// ============================================================================

#[test]
fn test_down_node_keeps_tokens_but_is_skipped() {
    let ring = RingTopology::new();
    ring.add_node(node(1), [Token(0)]).unwrap();
    ring.add_node(node(2), [Token(100)]).unwrap();

    ring.set_status(&id(1), NodeStatus::Down).unwrap();
    assert_eq!(ring.token_count(), 2);
    assert_eq!(ring.successor_node(Token(-5)).unwrap(), id(2));

    let snapshot = ring.snapshot();
    assert_eq!(snapshot.status_of(&id(1)), Some(NodeStatus::Down));

    ring.set_status(&id(1), NodeStatus::Up).unwrap();
    assert_eq!(ring.successor_node(Token(-5)).unwrap(), id(1));
}

#[test]
fn test_status_of_unknown_node() {
    let ring = RingTopology::new();
    assert_eq!(
        ring.set_status(&id(7), NodeStatus::Down),
        Err(Error::UnknownNode(id(7)))
    );
}

// ============================================================================
// Edge Cases
// ============================================================================

#[test]
fn test_single_node() {
    let ring = RingTopology::new();
    ring.add_node(node(1), [Token(42)]).unwrap();
    for key in ["key1", "key2", "key3", "very-long-key-name"] {
        let token = SipPartitioner.token(key).unwrap();
        assert_eq!(ring.successor_node(token).unwrap(), id(1));
    }
}

#[test]
fn test_decommission_then_add_does_not_resurrect_tokens() {
    let ring = RingTopology::new();
    ring.add_node(node(1), [Token(10), Token(20)]).unwrap();
    ring.remove_node(&id(1)).unwrap();
    assert_eq!(ring.successor_node(Token(0)), Err(Error::EmptyRing));

    ring.add_node(node(1), [Token(500)]).unwrap();
    assert_eq!(ring.tokens_of(&id(1)).unwrap(), vec![Token(500)]);
    assert_eq!(ring.token_count(), 1);
}

#[test]
fn test_snapshot_sorted_by_token() {
    let ring = RingTopology::new();
    ring.add_node(node(3), [Token(300), Token(-300)]).unwrap();
    ring.add_node(node(1), [Token(100)]).unwrap();
    ring.add_node(node(2), [Token(i64::MIN)]).unwrap();

    let tokens: Vec<i64> = ring.snapshot().iter().map(|e| e.token.value()).collect();
    assert_eq!(tokens, vec![i64::MIN, -300, 100, 300]);
}

// ============================================================================
// Thread Safety
// ============================================================================

#[test]
fn test_concurrent_readers_with_mutator() {
    let ring = Arc::new(RingTopology::new());
    for n in 0..4 {
        ring.add_node(node(n), [Token(i64::from(n) * 1_000)]).unwrap();
    }

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                for i in 0..500 {
                    // Node 0 is never failed, so lookups always succeed.
                    assert!(ring.successor_node(Token(i)).is_ok());
                    let snapshot = ring.snapshot();
                    assert!(snapshot.len() >= 4);
                }
            })
        })
        .collect();

    for i in 0..200 {
        let status = if i % 2 == 0 { NodeStatus::Down } else { NodeStatus::Up };
        ring.set_status(&id(2), status).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_join_and_leave_are_never_half_visible() {
    const JOINER_TOKENS: [i64; 5] = [-2_500, -500, 500, 1_500, 2_500];
    let ring = Arc::new(RingTopology::new());
    for n in 0..4 {
        ring.add_node(node(n), [Token(i64::from(n) * 1_000)]).unwrap();
    }
    let joiner = id(9);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ring = Arc::clone(&ring);
            let joiner = joiner.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = ring.snapshot();
                    let held = snapshot.iter().filter(|e| e.node == joiner).count();
                    assert!(
                        held == 0 || held == JOINER_TOKENS.len(),
                        "snapshot v{} holds {held} of the joiner's tokens",
                        snapshot.version
                    );
                    assert_eq!(snapshot.len(), 4 + held);
                }
            })
        })
        .collect();

    for _ in 0..200 {
        let tokens = JOINER_TOKENS.map(Token);
        ring.add_node(Node::new(joiner.clone()), tokens).unwrap();
        ring.remove_node(&joiner).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Property: the successor is the owner of the smallest token >= t, or of
    /// the smallest token overall when t is past the last one.
    #[test]
    fn prop_successor_is_smallest_token_at_or_after(
        tokens in prop::collection::btree_set(any::<i64>(), 1..32),
        probe in any::<i64>(),
    ) {
        let ring = RingTopology::new();
        let tokens: Vec<i64> = tokens.into_iter().collect();
        for (i, token) in tokens.iter().enumerate() {
            ring.add_node(node(i as u32), [Token(*token)]).unwrap();
        }

        let expected_idx = tokens
            .iter()
            .position(|t| *t >= probe)
            .unwrap_or(0);
        prop_assert_eq!(ring.successor_node(Token(probe)).unwrap(), id(expected_idx as u32));
    }

    /// Property: the partitioner is deterministic.
    #[test]
    fn prop_token_deterministic(key in "[a-z0-9_]{1,24}") {
        prop_assert_eq!(SipPartitioner.token(&key).unwrap(), SipPartitioner.token(&key).unwrap());
    }
}
