//! In-memory cluster for tests and the demo binary.
//!
//! [`LocalCluster`] keeps its own copy of the ring, the way a real cluster
//! keeps its own gossip view independent of what the simulation expects.
//! Stopping a node marks it DOWN in that copy; statements are routed through
//! the first running contact point to the live replicas and produce a
//! synthetic trace shaped like the storage engine's: READ messages for reads,
//! MUTATION messages to every live replica for writes. Nothing is stored.
//!
//! Replicas are placed with the statement's replication factor when it
//! carries one, otherwise with the factor from the topology config.

use crate::control::{
    ClientError, ExecutionResult, NodeControl, NodeControlError, RingInspector, Statement,
    StatementKind, StorageClient,
};
use crate::inspector::InspectedEntry;
use crate::trace::{TraceEvent, TraceRecord};
use async_trait::async_trait;
use corelib::config::TopologyConfig;
use corelib::node::{NodeId, NodeStatus};
use corelib::partitioner::Partitioner;
use corelib::ring::RingTopology;
use replication::{ReplicationStrategy, SimpleStrategy};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

const REQUEST_THREAD: &str = "Native-Transport-Requests-1";
const MESSAGING_THREAD: &str = "MessagingService-Outgoing";
const READ_THREAD: &str = "ReadStage-2";
const MUTATION_THREAD: &str = "MutationStage-1";
const STEP_MICROS: u64 = 45;

pub struct LocalCluster {
    ring: RingTopology,
    partitioner: Arc<dyn Partitioner>,
    replication_factor: usize,
    contact_points: Vec<NodeId>,
    traces: AtomicU64,
}

impl fmt::Debug for LocalCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCluster")
            .field("partitioner", &self.partitioner.name())
            .field("replication_factor", &self.replication_factor)
            .field("contact_points", &self.contact_points)
            .finish_non_exhaustive()
    }
}

impl LocalCluster {
    /// Starts every configured node. Contact points follow config order.
    pub fn from_config(config: &TopologyConfig) -> corelib::Result<Self> {
        Ok(Self {
            ring: config.build_ring()?,
            partitioner: config.partitioner.build(),
            replication_factor: config.replication_factor,
            contact_points: config.nodes.iter().map(|n| n.id()).collect(),
            traces: AtomicU64::new(0),
        })
    }

    pub fn with_contact_points(mut self, contact_points: Vec<NodeId>) -> Self {
        self.contact_points = contact_points;
        self
    }

    /// The cluster's own view of the ring.
    pub fn ring(&self) -> &RingTopology {
        &self.ring
    }

    pub fn is_running(&self, node: &NodeId) -> bool {
        self.ring.status(node) == Some(NodeStatus::Up)
    }

    fn set_running(&self, node: &NodeId, status: NodeStatus) -> Result<(), NodeControlError> {
        let previous = self
            .ring
            .set_status(node, status)
            .map_err(|e| NodeControlError::new(node.clone(), e.to_string()))?;
        if previous == status {
            debug!(node = %node, %status, "node already in requested state");
        } else {
            info!(node = %node, %status, "local node state changed");
        }
        Ok(())
    }

    fn coordinator(&self) -> Result<&NodeId, ClientError> {
        self.contact_points
            .iter()
            .find(|n| self.is_running(n))
            .ok_or_else(|| ClientError("no hosts available".into()))
    }

    fn next_trace_id(&self) -> String {
        format!("{:032x}", self.traces.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Monotonic clock for synthetic trace events.
struct TraceBuilder {
    now: u64,
    events: Vec<TraceEvent>,
}

impl TraceBuilder {
    fn new() -> Self {
        Self {
            now: 0,
            events: Vec::new(),
        }
    }

    fn push(&mut self, source: &NodeId, thread: &str, description: impl Into<String>) {
        self.events.push(TraceEvent {
            source: source.clone(),
            source_elapsed_micros: self.now,
            thread: thread.to_string(),
            description: description.into(),
        });
        self.now += STEP_MICROS;
    }

    /// Local work a replica does for `kind`.
    fn apply(&mut self, replica: &NodeId, kind: StatementKind) {
        match kind {
            StatementKind::Read => {
                self.push(replica, READ_THREAD, "Executing single-partition query");
            }
            StatementKind::Write => {
                self.push(replica, MUTATION_THREAD, "Appending to commitlog");
                self.push(replica, MUTATION_THREAD, "Adding to memtable");
            }
        }
    }

    /// Coordinator fan-out to one replica and its response.
    fn round_trip(&mut self, coordinator: &NodeId, replica: &NodeId, kind: StatementKind) {
        let (verb, thread) = match kind {
            StatementKind::Read => ("READ", READ_THREAD),
            StatementKind::Write => ("MUTATION", MUTATION_THREAD),
        };
        self.push(
            coordinator,
            MESSAGING_THREAD,
            format!("Sending {verb} message to /{}", replica.address),
        );
        self.push(
            replica,
            thread,
            format!("{verb} message received from /{}", coordinator.address),
        );
        self.apply(replica, kind);
        self.push(
            replica,
            MESSAGING_THREAD,
            format!("Enqueuing response to /{}", coordinator.address),
        );
        self.push(
            coordinator,
            REQUEST_THREAD,
            format!("Processing response from /{}", replica.address),
        );
    }
}

#[async_trait]
impl NodeControl for LocalCluster {
    async fn stop(&self, node: &NodeId) -> Result<(), NodeControlError> {
        self.set_running(node, NodeStatus::Down)
    }

    async fn start(&self, node: &NodeId) -> Result<(), NodeControlError> {
        self.set_running(node, NodeStatus::Up)
    }
}

#[async_trait]
impl StorageClient for LocalCluster {
    /// Routes the statement and, if asked, returns its trace.
    ///
    /// Statements without a routing key only touch the coordinator.
    async fn execute(
        &self,
        statement: &Statement,
        trace: bool,
    ) -> Result<ExecutionResult, ClientError> {
        let coordinator = self.coordinator()?.clone();

        let replicas = match &statement.routing_key {
            Some(key) => {
                let token = self
                    .partitioner
                    .token(key)
                    .map_err(|e| ClientError(e.to_string()))?;
                let rf = statement
                    .replication_factor
                    .unwrap_or(self.replication_factor);
                let set = SimpleStrategy::new(rf)
                    .replicas_for_token(&self.ring.snapshot(), token)
                    .map_err(|e| ClientError(e.to_string()))?;
                if set.is_empty() {
                    return Err(ClientError(format!("no live replicas for token {token}")));
                }
                set.replicas
            }
            None => Vec::new(),
        };
        debug!(
            coordinator = %coordinator,
            kind = %statement.kind,
            replicas = replicas.len(),
            "executing statement"
        );

        let record = trace.then(|| {
            let mut tb = TraceBuilder::new();
            tb.push(&coordinator, REQUEST_THREAD, format!("Parsing {}", statement.query));
            tb.push(&coordinator, REQUEST_THREAD, "Preparing statement");
            if statement.kind == StatementKind::Write {
                tb.push(&coordinator, REQUEST_THREAD, "Determining replicas for mutation");
            }
            for replica in &replicas {
                if replica == &coordinator {
                    tb.apply(&coordinator, statement.kind);
                } else {
                    tb.round_trip(&coordinator, replica, statement.kind);
                }
            }
            tb.push(&coordinator, REQUEST_THREAD, "Request complete");

            let mut parameters = BTreeMap::new();
            parameters.insert("query".to_string(), statement.query.clone());
            if let Some(key) = &statement.routing_key {
                parameters.insert("routing_key".to_string(), key.clone());
            }
            TraceRecord {
                trace_id: self.next_trace_id(),
                duration_micros: tb.now,
                request_type: Some("Execute CQL3 query".to_string()),
                parameters,
                events: tb.events,
            }
        });

        Ok(ExecutionResult {
            rows: 0,
            coordinator: Some(coordinator),
            trace: record,
        })
    }
}

#[async_trait]
impl RingInspector for LocalCluster {
    async fn inspect(&self) -> Result<Vec<InspectedEntry>, ClientError> {
        Ok(InspectedEntry::from_snapshot(&self.ring.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{Role, TraceAnalyzer};

    fn node(n: u8) -> NodeId {
        NodeId::new(format!("cassandra-{n}"), 9042)
    }

    fn cluster() -> LocalCluster {
        LocalCluster::from_config(&TopologyConfig::demo()).unwrap()
    }

    #[tokio::test]
    async fn test_stop_start_are_idempotent() {
        let cluster = cluster();
        cluster.stop(&node(2)).await.unwrap();
        cluster.stop(&node(2)).await.unwrap();
        assert!(!cluster.is_running(&node(2)));
        cluster.start(&node(2)).await.unwrap();
        assert!(cluster.is_running(&node(2)));

        let err = cluster.stop(&node(7)).await.unwrap_err();
        assert_eq!(err.node, node(7));
    }

    #[tokio::test]
    async fn test_trace_names_coordinator_and_replicas() {
        let cluster = cluster();
        let result = cluster
            .execute(&Statement::for_key("SELECT 1", "bird_01"), true)
            .await
            .unwrap();
        assert_eq!(result.coordinator, Some(node(1)));

        let trace = result.trace.unwrap();
        let report = TraceAnalyzer::analyze(&trace, None).unwrap();
        assert_eq!(report.coordinator, node(1));
        assert_eq!(report.events.first().map(|e| e.role), Some(Role::CoordinatorOperation));
        assert_eq!(report.events.last().unwrap().description, "Request complete");
        assert!(report.replica_count <= 2);
        assert_eq!(trace.parameters.get("routing_key").map(String::as_str), Some("bird_01"));
    }

    #[tokio::test]
    async fn test_write_trace_sends_mutation_to_every_live_replica() {
        let cluster = cluster();
        let statement = Statement::for_key("UPDATE t SET v = 1 WHERE k = ?", "bird_01")
            .with_kind(StatementKind::Write)
            .with_replication_factor(3);
        let result = cluster.execute(&statement, true).await.unwrap();
        let report = TraceAnalyzer::analyze(&result.trace.unwrap(), None).unwrap();

        let remote = report.replica_nodes();
        assert_eq!(report.replica_count, remote.len());
        assert!(!remote.contains(&&node(1)));
        // rf 3 with node 1 coordinating: two remote replicas, or three when
        // node 1 is not a replica at all.
        assert!(remote.len() >= 2);
        let sends = report
            .events_with(Role::CoordinatorOperation)
            .filter(|e| e.description.starts_with("Sending MUTATION message"))
            .count();
        assert_eq!(sends, remote.len());
        let applied = report
            .events_with(Role::ReplicaOperation)
            .filter(|e| e.description == "Adding to memtable")
            .count();
        assert_eq!(applied, remote.len());
        assert!(report.events.iter().all(|e| !e.description.contains("READ")));
    }

    #[tokio::test]
    async fn test_statement_replication_factor_overrides_config() {
        let cluster = cluster();
        let statement = Statement::for_key("SELECT 1", "bird_42").with_replication_factor(4);
        let result = cluster.execute(&statement, true).await.unwrap();
        let report = TraceAnalyzer::analyze(&result.trace.unwrap(), None).unwrap();
        // All four nodes hold the key; the coordinator answers locally.
        assert_eq!(report.replica_count, 3);
        assert_eq!(report.nodes_involved().len(), 4);
    }

    #[tokio::test]
    async fn test_coordinator_moves_when_contact_point_stops() {
        let cluster = cluster();
        cluster.stop(&node(1)).await.unwrap();
        let result = cluster
            .execute(&Statement::for_key("SELECT 1", "bird_01"), true)
            .await
            .unwrap();
        assert_eq!(result.coordinator, Some(node(2)));
        let report = TraceAnalyzer::analyze(&result.trace.unwrap(), None).unwrap();
        assert!(report.rerouted_around(&node(1)));
    }

    #[tokio::test]
    async fn test_no_hosts_available() {
        let cluster = cluster();
        for n in 1..=4 {
            cluster.stop(&node(n)).await.unwrap();
        }
        let err = cluster
            .execute(&Statement::new("SELECT 1"), false)
            .await
            .unwrap_err();
        assert_eq!(err, ClientError("no hosts available".into()));
    }

    #[tokio::test]
    async fn test_inspect_matches_ring() {
        let cluster = cluster();
        cluster.stop(&node(3)).await.unwrap();
        let entries = cluster.inspect().await.unwrap();
        assert_eq!(entries.len(), 4);
        assert!(crate::inspector::compare(&cluster.ring().snapshot(), &entries).is_empty());
        assert_eq!(
            entries.iter().filter(|e| e.status == NodeStatus::Down).count(),
            1
        );
    }
}
