//! Membership changes on the live ring.
//!
//! The controller is the only writer of the shared [`RingTopology`]. Every
//! effective change is published as a [`RingChangeEvent`] carrying the ring
//! before and after the change. Process lifecycle is not touched here; that
//! belongs to [`crate::control::NodeControl`].
//!
//! The controller also owns the ring's [`KeyLocks`], so every orchestrator
//! built on the same controller shares one single-flight registry.

use corelib::node::{Node, NodeId, NodeStatus};
use corelib::ring::{RingSnapshot, RingTopology};
use corelib::token::Token;
use crate::locks::KeyLocks;
use corelib::Result;
use parking_lot::Mutex;
use replication::ReplicaResolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RingChangeKind {
    Added,
    Failed,
    Recovered,
    Decommissioned,
}

impl fmt::Display for RingChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RingChangeKind::Added => "added",
            RingChangeKind::Failed => "failed",
            RingChangeKind::Recovered => "recovered",
            RingChangeKind::Decommissioned => "decommissioned",
        };
        f.write_str(s)
    }
}

/// One effective membership change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingChangeEvent {
    pub kind: RingChangeKind,
    pub node: NodeId,
    pub before: RingSnapshot,
    pub after: RingSnapshot,
}

/// Owns membership changes of a shared ring.
#[derive(Debug)]
pub struct ClusterController {
    ring: Arc<RingTopology>,
    events: broadcast::Sender<RingChangeEvent>,
    locks: KeyLocks,
    // Serializes mutations so `before`/`after` bracket exactly one change.
    mutation: Mutex<()>,
}

impl ClusterController {
    pub fn new(ring: Arc<RingTopology>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ring,
            events,
            locks: KeyLocks::new(),
            mutation: Mutex::new(()),
        }
    }

    pub fn ring(&self) -> &Arc<RingTopology> {
        &self.ring
    }

    /// Keys with a simulation in flight on this ring.
    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    /// A resolver bound to the same ring.
    pub fn resolver(&self) -> ReplicaResolver {
        ReplicaResolver::new(Arc::clone(&self.ring))
    }

    pub fn snapshot(&self) -> RingSnapshot {
        self.ring.snapshot()
    }

    /// Receives every change made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RingChangeEvent> {
        self.events.subscribe()
    }

    /// Marks `node` DOWN. Its tokens stay on the ring.
    ///
    /// Returns `None` when the node was already DOWN.
    pub fn fail_node(&self, node: &NodeId) -> Result<Option<RingChangeEvent>> {
        self.change_status(node, NodeStatus::Down, RingChangeKind::Failed)
    }

    /// Marks `node` UP again. Returns `None` when it was already UP.
    pub fn recover_node(&self, node: &NodeId) -> Result<Option<RingChangeEvent>> {
        self.change_status(node, NodeStatus::Up, RingChangeKind::Recovered)
    }

    /// Removes `node` and all of its tokens permanently.
    pub fn decommission_node(&self, node: &NodeId) -> Result<RingChangeEvent> {
        let _guard = self.mutation.lock();
        let before = self.ring.snapshot();
        self.ring.remove_node(node)?;
        Ok(self.publish(RingChangeKind::Decommissioned, node.clone(), before))
    }

    /// Joins `node` with `tokens`.
    ///
    /// Returns `None` when the node already owned every token.
    pub fn add_node(
        &self,
        node: Node,
        tokens: impl IntoIterator<Item = Token>,
    ) -> Result<Option<RingChangeEvent>> {
        let _guard = self.mutation.lock();
        let before = self.ring.snapshot();
        let id = node.id.clone();
        if self.ring.add_node(node, tokens)? == 0 {
            debug!(node = %id, "membership unchanged");
            return Ok(None);
        }
        Ok(Some(self.publish(RingChangeKind::Added, id, before)))
    }

    fn change_status(
        &self,
        node: &NodeId,
        status: NodeStatus,
        kind: RingChangeKind,
    ) -> Result<Option<RingChangeEvent>> {
        let _guard = self.mutation.lock();
        let before = self.ring.snapshot();
        let previous = self.ring.set_status(node, status)?;
        if previous == status {
            debug!(node = %node, %status, "status unchanged");
            return Ok(None);
        }
        Ok(Some(self.publish(kind, node.clone(), before)))
    }

    fn publish(&self, kind: RingChangeKind, node: NodeId, before: RingSnapshot) -> RingChangeEvent {
        let after = self.ring.snapshot();
        info!(
            node = %node,
            %kind,
            version = after.version,
            live = after.live_node_count(),
            "ring changed"
        );
        let event = RingChangeEvent {
            kind,
            node,
            before,
            after,
        };
        // No subscribers is not an error.
        let _ = self.events.send(event.clone());
        event
    }
}
