//! Live token ring.
//!
//! # Concurrency Model
//!
//! All state sits behind one `parking_lot::RwLock`. Lookups and snapshots
//! take the read lock and run in parallel; membership and status changes
//! take the write lock, so a reader never observes a half-applied change.
//!
//! # Lookup
//!
//! Tokens live in a `BTreeMap<Token, NodeId>`. The successor of a token is
//! found with a range scan from the token to the end of the map, chained with
//! a scan from the start (wraparound), skipping tokens of DOWN nodes.

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeStatus};
use crate::ring::snapshot::{RingEntry, RingSnapshot};
use crate::token::Token;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone)]
struct Member {
    node: Node,
    status: NodeStatus,
    tokens: BTreeSet<Token>,
}

#[derive(Debug, Default)]
struct RingState {
    tokens: BTreeMap<Token, NodeId>,
    members: HashMap<NodeId, Member>,
    version: u64,
}

impl RingState {
    fn is_up(&self, id: &NodeId) -> bool {
        self.members.get(id).map_or(false, |m| m.status.is_up())
    }

    /// Clockwise walk over all bindings, starting at the first token `>= token`.
    fn clockwise_from(&self, token: Token) -> impl Iterator<Item = (&Token, &NodeId)> {
        self.tokens.range(token..).chain(self.tokens.range(..token))
    }

    /// Ownership percentage per node: each token owns `(predecessor, token]`.
    fn ownership(&self) -> HashMap<&NodeId, f64> {
        let mut owns: HashMap<&NodeId, f64> = HashMap::new();
        let Some((&last, _)) = self.tokens.iter().next_back() else {
            return owns;
        };
        let mut prev = last;
        for (&token, id) in &self.tokens {
            *owns.entry(id).or_insert(0.0) += prev.range_fraction(token) * 100.0;
            prev = token;
        }
        owns
    }
}

/// Ordered set of token bindings plus per-node status.
#[derive(Debug, Default)]
pub struct RingTopology {
    state: RwLock<RingState>,
}

impl RingTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `tokens` to `node`.
    ///
    /// The call is all-or-nothing: if any token is owned by a different node
    /// nothing is inserted. Adding a node that is already a member extends its
    /// token set and keeps its current status and metadata; tokens it already
    /// owns are ignored.
    ///
    /// Returns the number of tokens newly bound. The version only moves when
    /// that is non-zero.
    pub fn add_node(&self, node: Node, tokens: impl IntoIterator<Item = Token>) -> Result<usize> {
        let tokens: BTreeSet<Token> = tokens.into_iter().collect();
        if tokens.is_empty() {
            return Err(Error::InvalidNode(format!("{} has no tokens", node.id)));
        }

        let mut state = self.state.write();
        for token in &tokens {
            if let Some(owner) = state.tokens.get(token) {
                if owner != &node.id {
                    return Err(Error::DuplicateToken {
                        token: *token,
                        owner: owner.clone(),
                        requested: node.id.clone(),
                    });
                }
            }
        }

        let id = node.id.clone();
        let fresh: BTreeSet<Token> = tokens
            .into_iter()
            .filter(|t| !state.tokens.contains_key(t))
            .collect();
        if fresh.is_empty() && state.members.contains_key(&id) {
            debug!(node = %id, "node already owns every requested token");
            return Ok(0);
        }

        for token in &fresh {
            state.tokens.insert(*token, id.clone());
        }
        let added = fresh.len();
        match state.members.entry(id.clone()) {
            Entry::Occupied(mut occupied) => occupied.get_mut().tokens.extend(fresh),
            Entry::Vacant(vacant) => {
                vacant.insert(Member {
                    node,
                    status: NodeStatus::Up,
                    tokens: fresh,
                });
            }
        }
        state.version += 1;
        debug!(node = %id, tokens = added, version = state.version, "node added to ring");
        Ok(added)
    }

    /// Removes every binding owned by `id`. Its ranges fall through to the
    /// next clockwise owner.
    pub fn remove_node(&self, id: &NodeId) -> Result<Node> {
        let mut state = self.state.write();
        let member = state
            .members
            .remove(id)
            .ok_or_else(|| Error::UnknownNode(id.clone()))?;
        for token in &member.tokens {
            state.tokens.remove(token);
        }
        state.version += 1;
        debug!(
            node = %id,
            tokens = member.tokens.len(),
            version = state.version,
            "node removed from ring"
        );
        Ok(member.node)
    }

    /// Sets the status of `id` and returns the previous one.
    pub fn set_status(&self, id: &NodeId, status: NodeStatus) -> Result<NodeStatus> {
        let mut state = self.state.write();
        let member = state
            .members
            .get_mut(id)
            .ok_or_else(|| Error::UnknownNode(id.clone()))?;
        let previous = std::mem::replace(&mut member.status, status);
        if previous != status {
            state.version += 1;
            debug!(node = %id, %previous, %status, version = state.version, "node status changed");
        }
        Ok(previous)
    }

    pub fn status(&self, id: &NodeId) -> Option<NodeStatus> {
        self.state.read().members.get(id).map(|m| m.status)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.state.read().members.contains_key(id)
    }

    /// Live owner of `token`: the node of the smallest token `>= token` whose
    /// node is UP, wrapping around to the smallest token.
    pub fn successor_node(&self, token: Token) -> Result<NodeId> {
        let state = self.state.read();
        let live = state
            .clockwise_from(token)
            .find(|(_, id)| state.is_up(id))
            .map(|(_, id)| id.clone());
        live.ok_or(Error::EmptyRing)
    }

    /// Metadata owner of `token`, ignoring status.
    pub fn primary_owner(&self, token: Token) -> Option<NodeId> {
        let state = self.state.read();
        let owner = state.clockwise_from(token).next().map(|(_, id)| id.clone());
        owner
    }

    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.state.read().members.get(id).map(|m| m.node.clone())
    }

    /// All member nodes, sorted by id.
    pub fn nodes(&self) -> Vec<Node> {
        let state = self.state.read();
        let mut nodes: Vec<Node> = state.members.values().map(|m| m.node.clone()).collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    pub fn tokens_of(&self, id: &NodeId) -> Option<Vec<Token>> {
        self.state
            .read()
            .members
            .get(id)
            .map(|m| m.tokens.iter().copied().collect())
    }

    pub fn node_count(&self) -> usize {
        self.state.read().members.len()
    }

    pub fn live_node_count(&self) -> usize {
        self.state
            .read()
            .members
            .values()
            .filter(|m| m.status.is_up())
            .count()
    }

    pub fn token_count(&self) -> usize {
        self.state.read().tokens.len()
    }

    /// Incremented on every effective mutation.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Dumps the ring sorted by token.
    pub fn snapshot(&self) -> RingSnapshot {
        let state = self.state.read();
        let owns = state.ownership();
        let entries = state
            .tokens
            .iter()
            .filter_map(|(token, id)| {
                let member = state.members.get(id)?;
                Some(RingEntry {
                    token: *token,
                    node: id.clone(),
                    status: member.status,
                    rack: member.node.rack.clone(),
                    datacenter: member.node.datacenter.clone(),
                    host_id: member.node.host_id,
                    ownership: owns.get(id).copied().unwrap_or(0.0),
                })
            })
            .collect();
        RingSnapshot {
            version: state.version,
            entries,
        }
    }
}
