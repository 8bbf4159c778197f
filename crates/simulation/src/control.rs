//! Contracts of the collaborators the simulation drives but does not own:
//! process supervision, the storage client, and live ring inspection.

use crate::inspector::InspectedEntry;
use crate::trace::TraceRecord;
use async_trait::async_trait;
use corelib::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A node could not be stopped or started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("node control failed for {node}: {message}")]
pub struct NodeControlError {
    pub node: NodeId,
    pub message: String,
}

impl NodeControlError {
    pub fn new(node: NodeId, message: impl Into<String>) -> Self {
        Self {
            node,
            message: message.into(),
        }
    }
}

/// Failure reported by the storage client or the ring inspector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage client error: {0}")]
pub struct ClientError(pub String);

/// Halts and resumes storage nodes (containers, processes, VMs).
#[async_trait]
pub trait NodeControl: Send + Sync {
    async fn stop(&self, node: &NodeId) -> Result<(), NodeControlError>;

    async fn start(&self, node: &NodeId) -> Result<(), NodeControlError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    #[default]
    Read,
    Write,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Read => f.pad("READ"),
            StatementKind::Write => f.pad("WRITE"),
        }
    }
}

/// Opaque request for the storage engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub query: String,
    #[serde(default)]
    pub kind: StatementKind,
    pub params: Vec<String>,
    /// Partition key the driver routes on, when the statement has one.
    pub routing_key: Option<String>,
    /// Keyspace replication factor, when the caller knows it. Clients fall
    /// back to their own setting.
    #[serde(default)]
    pub replication_factor: Option<usize>,
}

impl Statement {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            kind: StatementKind::Read,
            params: Vec::new(),
            routing_key: None,
            replication_factor: None,
        }
    }

    /// Binds `key` as the single parameter and routing key of `query`.
    pub fn for_key(query: impl Into<String>, key: &str) -> Self {
        Self {
            params: vec![key.to_string()],
            routing_key: Some(key.to_string()),
            ..Self::new(query)
        }
    }

    pub fn with_kind(mut self, kind: StatementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_replication_factor(mut self, replication_factor: usize) -> Self {
        self.replication_factor = Some(replication_factor);
        self
    }
}

/// Outcome of [`StorageClient::execute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub rows: usize,
    /// Node the driver sent the request to, if it reports one.
    pub coordinator: Option<NodeId>,
    /// Present when tracing was requested and the engine produced a trace.
    pub trace: Option<TraceRecord>,
}

/// Client of the replicated storage engine.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn execute(&self, statement: &Statement, trace: bool)
        -> Result<ExecutionResult, ClientError>;
}

/// Live view of the cluster ring, as `nodetool ring` would print it.
#[async_trait]
pub trait RingInspector: Send + Sync {
    async fn inspect(&self) -> Result<Vec<InspectedEntry>, ClientError>;
}
