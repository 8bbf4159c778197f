//! Node abstractions for the consistent hash ring.
//!
//! Nodes are identified by their endpoint (address and port), the same way a
//! client driver or `nodetool` refers to them.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_128;

/// Endpoint identifying a node in the cluster.
///
/// Serialized as the `address:port` string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    pub address: String,
    pub port: u16,
}

impl NodeId {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    /// Parses `address:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidNode(format!("expected address:port, got `{s}`")))?;
        if address.is_empty() {
            return Err(Error::InvalidNode(format!("missing address in `{s}`")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::InvalidNode(format!("bad port in `{s}`: {e}")))?;
        Ok(Self::new(address, port))
    }
}

impl TryFrom<String> for NodeId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

/// Stable host identifier, rendered in UUID form.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub u128);

impl HostId {
    /// Derives a host id from an endpoint so the same endpoint always gets the
    /// same id.
    pub fn derive(id: &NodeId) -> Self {
        HostId(xxh3_128(id.to_string().as_bytes()))
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = format!("{:032x}", self.0);
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

/// Liveness of a node as seen by the ring.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    #[default]
    Up,
    Down,
}

impl NodeStatus {
    #[inline]
    pub fn is_up(self) -> bool {
        self == NodeStatus::Up
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Up => f.write_str("Up"),
            NodeStatus::Down => f.write_str("Down"),
        }
    }
}

impl FromStr for NodeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(NodeStatus::Up),
            "down" | "d" => Ok(NodeStatus::Down),
            other => Err(Error::InvalidNode(format!("unknown status `{other}`"))),
        }
    }
}

/// Logical node participating in the ring.
///
/// Keep this struct small and cheap to clone; status and token ownership
/// live in the ring itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub host_id: HostId,
    /// Optional data center label for topology‑aware replication.
    pub datacenter: Option<String>,
    /// Rack label, as reported by `nodetool ring`.
    pub rack: String,
}

impl Node {
    /// Construct a new node with default placement (`rack1`, no datacenter).
    pub fn new(id: NodeId) -> Self {
        let host_id = HostId::derive(&id);
        Self {
            id,
            host_id,
            datacenter: None,
            rack: "rack1".to_string(),
        }
    }

    pub fn with_topology(
        id: NodeId,
        datacenter: impl Into<Option<String>>,
        rack: impl Into<String>,
    ) -> Self {
        Self {
            datacenter: datacenter.into(),
            rack: rack.into(),
            ..Self::new(id)
        }
    }

    pub fn with_host_id(mut self, host_id: HostId) -> Self {
        self.host_id = host_id;
        self
    }
}
