//! Topology configuration.
//!
//! A cluster layout is described in JSON:
//!
//! ```json
//! {
//!   "partitioner": "sip",
//!   "replication_factor": 2,
//!   "nodes": [
//!     { "address": "cassandra-1", "port": 9042, "rack": "rack1", "tokens": [-9223372036854775808] }
//!   ]
//! }
//! ```

use crate::error::{Error, Result};
use crate::node::{HostId, Node, NodeId};
use crate::partitioner::PartitionerKind;
use crate::ring::RingTopology;
use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_RACK: &str = "rack1";
pub const DEFAULT_DATACENTER: &str = "datacenter1";
pub const DEFAULT_REPLICATION_FACTOR: usize = 2;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_rack() -> String {
    DEFAULT_RACK.to_string()
}

fn default_replication_factor() -> usize {
    DEFAULT_REPLICATION_FACTOR
}

/// One node of the layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_rack")]
    pub rack: String,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default)]
    pub host_id: Option<u128>,
    pub tokens: Vec<Token>,
}

impl NodeConfig {
    pub fn id(&self) -> NodeId {
        NodeId::new(self.address.clone(), self.port)
    }

    pub fn to_node(&self) -> Node {
        let node = Node::with_topology(self.id(), self.datacenter.clone(), self.rack.clone());
        match self.host_id {
            Some(raw) => node.with_host_id(HostId(raw)),
            None => node,
        }
    }
}

/// Cluster layout plus the replication settings used against it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub partitioner: PartitionerKind,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,
    pub nodes: Vec<NodeConfig>,
}

impl TopologyConfig {
    /// Four nodes splitting the ring into quarters, as in the failover demo.
    pub fn demo() -> Self {
        let tokens = [i64::MIN, -(1_i64 << 62), 0, (1_i64 << 62) - 1];
        let nodes = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| NodeConfig {
                address: format!("cassandra-{}", i + 1),
                port: DEFAULT_PORT,
                rack: default_rack(),
                datacenter: Some(DEFAULT_DATACENTER.to_string()),
                host_id: None,
                tokens: vec![Token(*token)],
            })
            .collect();
        Self {
            partitioner: PartitionerKind::default(),
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            nodes,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidConfig("topology has no nodes".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if node.address.is_empty() {
                return Err(Error::InvalidConfig("node with empty address".into()));
            }
            if node.tokens.is_empty() {
                return Err(Error::InvalidConfig(format!("{} has no tokens", node.id())));
            }
            if !seen.insert(node.id()) {
                return Err(Error::InvalidConfig(format!("{} listed twice", node.id())));
            }
        }
        Ok(())
    }

    /// Builds a ring with every configured node UP.
    pub fn build_ring(&self) -> Result<RingTopology> {
        self.validate()?;
        let ring = RingTopology::new();
        for node in &self.nodes {
            ring.add_node(node.to_node(), node.tokens.iter().copied())?;
        }
        Ok(ring)
    }
}
