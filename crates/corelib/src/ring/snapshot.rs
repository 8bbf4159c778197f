//! Read-only ring dumps.

use crate::error::{Error, Result};
use crate::node::{HostId, NodeId, NodeStatus};
use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One token binding as seen at snapshot time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingEntry {
    pub token: Token,
    pub node: NodeId,
    pub status: NodeStatus,
    pub rack: String,
    pub datacenter: Option<String>,
    pub host_id: HostId,
    /// Share of the ring owned by `node` across all of its tokens, in percent.
    pub ownership: f64,
}

/// Consistent view of the ring, sorted by token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RingSnapshot {
    pub version: u64,
    pub entries: Vec<RingEntry>,
}

impl RingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RingEntry> {
        self.entries.iter()
    }

    /// Index of the first entry with a token `>= token`, wrapping to 0.
    fn start_index(&self, token: Token) -> usize {
        let idx = self.entries.partition_point(|e| e.token < token);
        if idx == self.entries.len() {
            0
        } else {
            idx
        }
    }

    /// Walks one full lap clockwise, starting at the first token `>= token`.
    pub fn clockwise_from(&self, token: Token) -> impl Iterator<Item = &RingEntry> {
        let len = self.entries.len();
        let start = if len == 0 { 0 } else { self.start_index(token) };
        (0..len).map(move |i| &self.entries[(start + i) % len])
    }

    /// Live owner of `token`: the first UP entry clockwise from it.
    pub fn successor_node(&self, token: Token) -> Result<&NodeId> {
        self.clockwise_from(token)
            .find(|e| e.status.is_up())
            .map(|e| &e.node)
            .ok_or(Error::EmptyRing)
    }

    /// Metadata owner of `token`, regardless of status.
    pub fn primary_owner(&self, token: Token) -> Option<&NodeId> {
        self.clockwise_from(token).next().map(|e| &e.node)
    }

    pub fn status_of(&self, node: &NodeId) -> Option<NodeStatus> {
        self.entries.iter().find(|e| &e.node == node).map(|e| e.status)
    }

    /// Distinct nodes in token order of their first appearance.
    pub fn nodes(&self) -> Vec<&NodeId> {
        let mut seen: Vec<&NodeId> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&&entry.node) {
                seen.push(&entry.node);
            }
        }
        seen
    }

    pub fn live_node_count(&self) -> usize {
        let mut live: Vec<&NodeId> = self
            .entries
            .iter()
            .filter(|e| e.status.is_up())
            .map(|e| &e.node)
            .collect();
        live.sort();
        live.dedup();
        live.len()
    }
}

impl fmt::Display for RingSnapshot {
    /// Renders the snapshot as a `nodetool ring`-style table.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<24} {:<10} {:<7} {:>9}  {:<20}  {}",
            "Address", "Rack", "Status", "Owns", "Token", "Host ID"
        )?;
        if let Some(last) = self.entries.last() {
            writeln!(f, "{:<24} {:<10} {:<7} {:>9}  {}", "", "", "", "", last.token)?;
        }
        for e in &self.entries {
            writeln!(
                f,
                "{:<24} {:<10} {:<7} {:>8.2}%  {:<20}  {}",
                e.node.to_string(),
                e.rack,
                e.status.to_string(),
                e.ownership,
                e.token.to_string(),
                e.host_id
            )?;
        }
        Ok(())
    }
}
