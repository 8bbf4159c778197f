//! Before/after failure experiment.
//!
//! A [`FailureSimulationOrchestrator`] runs one experiment as a fixed
//! sequence of steps:
//!
//! ```text
//! INIT -> RESOLVED_BEFORE -> NODE_FAILED -> RESOLVED_AFTER -> TRACED_AFTER -> REPORTED
//! ```
//!
//! Each step is one method call; calling a step out of order fails with
//! [`Error::InvalidSequence`] and changes nothing. A step that fails part-way
//! leaves the state where it was and keeps whatever it already recorded in
//! [`SimulationProgress`]. Once the node has been failed the caller either
//! runs to [`SimulationState::Reported`] or calls
//! [`FailureSimulationOrchestrator::recover`].

use crate::control::{NodeControl, Statement, StatementKind, StorageClient};
use crate::controller::ClusterController;
use crate::error::{Error, Result};
use crate::locks::{KeyGuard, KeyLocks};
use crate::policy::SelectionPolicy;
use crate::trace::{FlowReport, TraceAnalyzer};
use corelib::node::NodeId;
use corelib::partitioner::Partitioner;
use corelib::ring::RingSnapshot;
use corelib::token::Token;
use replication::{ConsistencyCheck, ConsistencyLevel, ReplicaResolver, ReplicaSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Default read issued before and after the failure.
pub const DEFAULT_QUERY: &str = "SELECT * FROM bird_locations WHERE bird_id = ?";

/// Default write issued before and after the failure.
pub const DEFAULT_WRITE: &str =
    "UPDATE bird_locations SET species = 'Eurasian Hoopoe' WHERE bird_id = ?";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationState {
    #[default]
    Init,
    ResolvedBefore,
    NodeFailed,
    ResolvedAfter,
    TracedAfter,
    Reported,
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimulationState::Init => "INIT",
            SimulationState::ResolvedBefore => "RESOLVED_BEFORE",
            SimulationState::NodeFailed => "NODE_FAILED",
            SimulationState::ResolvedAfter => "RESOLVED_AFTER",
            SimulationState::TracedAfter => "TRACED_AFTER",
            SimulationState::Reported => "REPORTED",
        };
        f.write_str(s)
    }
}

/// A statement traced once before and once after the failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedOperation {
    pub kind: StatementKind,
    /// Statement template; the key is bound as its single parameter.
    pub query: String,
}

impl TracedOperation {
    pub fn read(query: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Read,
            query: query.into(),
        }
    }

    pub fn write(query: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Write,
            query: query.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Level checked against the before and after replica sets.
    pub consistency: ConsistencyLevel,
    pub policy: SelectionPolicy,
    /// Traced in order; must not be empty.
    pub operations: Vec<TracedOperation>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            consistency: ConsistencyLevel::default(),
            policy: SelectionPolicy::default(),
            operations: vec![
                TracedOperation::read(DEFAULT_QUERY),
                TracedOperation::write(DEFAULT_WRITE),
            ],
        }
    }
}

/// Analyzed trace of one operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationFlow {
    pub kind: StatementKind,
    pub query: String,
    pub flow: FlowReport,
}

/// Everything recorded so far. Fields fill in step by step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationProgress {
    pub key: Option<String>,
    pub token: Option<Token>,
    pub replication_factor: Option<usize>,
    pub ring_before: Option<RingSnapshot>,
    pub replicas_before: Option<ReplicaSet>,
    /// One entry per traced operation, in config order.
    pub flows_before: Vec<OperationFlow>,
    pub failed_node: Option<NodeId>,
    pub ring_after: Option<RingSnapshot>,
    pub replicas_after: Option<ReplicaSet>,
    pub flows_after: Vec<OperationFlow>,
}

/// Before and after flows of one traced operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    pub kind: StatementKind,
    pub query: String,
    pub before: FlowReport,
    pub after: FlowReport,
}

/// Result of a completed experiment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub key: String,
    pub token: Token,
    pub replication_factor: usize,
    pub failed_node: NodeId,
    pub ring_before: RingSnapshot,
    pub ring_after: RingSnapshot,
    pub replicas_before: ReplicaSet,
    pub replicas_after: ReplicaSet,
    pub operations: Vec<OperationReport>,
    pub consistency_before: ConsistencyCheck,
    pub consistency_after: ConsistencyCheck,
}

impl SimulationReport {
    /// No after-failure operation touched the failed node.
    pub fn rerouted(&self) -> bool {
        self.operations
            .iter()
            .all(|op| op.after.rerouted_around(&self.failed_node))
    }

    /// First traced operation of `kind`.
    pub fn operation(&self, kind: StatementKind) -> Option<&OperationReport> {
        self.operations.iter().find(|op| op.kind == kind)
    }

    /// Replicas that took over responsibility for the key.
    pub fn promoted(&self) -> Vec<&NodeId> {
        self.replicas_after
            .iter()
            .filter(|n| !self.replicas_before.contains(n))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Key `{}` -> token {} (rf {})",
            self.key, self.token, self.replication_factor
        )?;
        writeln!(f, "Failed node: {}", self.failed_node)?;
        writeln!(f)?;
        writeln!(f, "Before failure")?;
        writeln!(f, "  replicas:    {}", self.replicas_before)?;
        writeln!(f, "  consistency: {}", self.consistency_before)?;
        writeln!(f, "After failure")?;
        writeln!(f, "  replicas:    {}", self.replicas_after)?;
        writeln!(f, "  consistency: {}", self.consistency_after)?;
        for op in &self.operations {
            let verdict = if op.after.rerouted_around(&self.failed_node) {
                "request rerouted around the failed node"
            } else {
                "failed node still involved in the request"
            };
            writeln!(
                f,
                "  {:<5} coordinator {} -> {}: {verdict}",
                op.kind, op.before.coordinator, op.after.coordinator
            )?;
        }
        for op in &self.operations {
            writeln!(f)?;
            writeln!(f, "{} trace after failure", op.kind)?;
            write!(f, "{}", op.after)?;
        }
        Ok(())
    }
}

/// Drives one failure experiment against a live ring and its collaborators.
pub struct FailureSimulationOrchestrator {
    controller: Arc<ClusterController>,
    node_control: Arc<dyn NodeControl>,
    client: Arc<dyn StorageClient>,
    partitioner: Arc<dyn Partitioner>,
    locks: KeyLocks,
    config: SimulationConfig,
    state: SimulationState,
    progress: SimulationProgress,
    guard: Option<KeyGuard>,
}

impl fmt::Debug for FailureSimulationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureSimulationOrchestrator")
            .field("partitioner", &self.partitioner.name())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl FailureSimulationOrchestrator {
    pub fn new(
        controller: Arc<ClusterController>,
        node_control: Arc<dyn NodeControl>,
        client: Arc<dyn StorageClient>,
        partitioner: Arc<dyn Partitioner>,
    ) -> Self {
        let locks = controller.locks().clone();
        Self {
            controller,
            node_control,
            client,
            partitioner,
            locks,
            config: SimulationConfig::default(),
            state: SimulationState::Init,
            progress: SimulationProgress::default(),
            guard: None,
        }
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the controller's lock registry, e.g. to share one across
    /// several controllers.
    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn progress(&self) -> &SimulationProgress {
        &self.progress
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs every step in order.
    pub async fn run(&mut self, key: &str, replication_factor: usize) -> Result<SimulationReport> {
        self.resolve_before(key, replication_factor).await?;
        self.fail_node().await?;
        self.resolve_after()?;
        self.trace_after().await?;
        self.report()
    }

    /// Hashes `key`, resolves its replicas on the current ring and traces
    /// every configured operation as a baseline.
    pub async fn resolve_before(&mut self, key: &str, replication_factor: usize) -> Result<()> {
        self.require(SimulationState::Init)?;
        if self.config.operations.is_empty() {
            return Err(Error::NoOperations);
        }
        let guard = match self.guard.take() {
            Some(held) if held.key() == key => held,
            _ => self.locks.try_acquire(key)?,
        };

        self.progress = SimulationProgress {
            key: Some(key.to_string()),
            replication_factor: Some(replication_factor),
            ..SimulationProgress::default()
        };
        let token = self.partitioner.token(key)?;
        self.progress.token = Some(token);

        let snapshot = self.controller.snapshot();
        let replicas = ReplicaResolver::resolve_in(&snapshot, token, replication_factor)?;
        info!(key, %token, replicas = %replicas, "resolved replicas before failure");
        self.progress.ring_before = Some(snapshot);
        self.progress.replicas_before = Some(replicas);

        // Kept past this point so a retry after a failed trace keeps the key.
        self.guard = Some(guard);
        for op in self.config.operations.clone() {
            let flow = self.traced_execute(&op, key, replication_factor).await?;
            self.progress.flows_before.push(flow);
        }

        self.advance(SimulationState::ResolvedBefore);
        Ok(())
    }

    /// Picks the victim with the configured policy, marks it DOWN and stops it.
    pub async fn fail_node(&mut self) -> Result<()> {
        self.require(SimulationState::ResolvedBefore)?;
        let replicas = recorded(&self.progress.replicas_before, "replicas before failure")?;
        let victim = self
            .config
            .policy
            .select(replicas)
            .ok_or_else(|| Error::NoFailureCandidate(replicas.to_string()))?;

        self.controller.fail_node(&victim)?;
        self.progress.failed_node = Some(victim.clone());
        self.node_control.stop(&victim).await?;

        info!(node = %victim, policy = %self.config.policy, "node failed");
        self.advance(SimulationState::NodeFailed);
        Ok(())
    }

    /// Re-resolves the key against the ring as it is now.
    pub fn resolve_after(&mut self) -> Result<()> {
        self.require(SimulationState::NodeFailed)?;
        let token = *recorded(&self.progress.token, "token")?;
        let replication_factor =
            *recorded(&self.progress.replication_factor, "replication factor")?;

        let snapshot = self.controller.snapshot();
        let replicas = ReplicaResolver::resolve_in(&snapshot, token, replication_factor)?;
        info!(%token, replicas = %replicas, "resolved replicas after failure");
        self.progress.ring_after = Some(snapshot);
        self.progress.replicas_after = Some(replicas);

        self.advance(SimulationState::ResolvedAfter);
        Ok(())
    }

    /// Re-runs every traced operation.
    pub async fn trace_after(&mut self) -> Result<()> {
        self.require(SimulationState::ResolvedAfter)?;
        let key = recorded(&self.progress.key, "key")?.clone();
        let replication_factor =
            *recorded(&self.progress.replication_factor, "replication factor")?;

        self.progress.flows_after.clear();
        for op in self.config.operations.clone() {
            let flow = self.traced_execute(&op, &key, replication_factor).await?;
            self.progress.flows_after.push(flow);
        }

        self.advance(SimulationState::TracedAfter);
        Ok(())
    }

    /// Assembles the report and releases the key.
    pub fn report(&mut self) -> Result<SimulationReport> {
        self.require(SimulationState::TracedAfter)?;
        let p = &self.progress;
        let replicas_before = recorded(&p.replicas_before, "replicas before failure")?;
        let replicas_after = recorded(&p.replicas_after, "replicas after failure")?;
        let level = self.config.consistency;
        if p.flows_before.len() != p.flows_after.len() {
            return Err(Error::Incomplete("trace after failure"));
        }
        let operations = p
            .flows_before
            .iter()
            .zip(&p.flows_after)
            .map(|(before, after)| OperationReport {
                kind: before.kind,
                query: before.query.clone(),
                before: before.flow.clone(),
                after: after.flow.clone(),
            })
            .collect();

        let report = SimulationReport {
            key: recorded(&p.key, "key")?.clone(),
            token: *recorded(&p.token, "token")?,
            replication_factor: *recorded(&p.replication_factor, "replication factor")?,
            failed_node: recorded(&p.failed_node, "failed node")?.clone(),
            ring_before: recorded(&p.ring_before, "ring before failure")?.clone(),
            ring_after: recorded(&p.ring_after, "ring after failure")?.clone(),
            replicas_before: replicas_before.clone(),
            replicas_after: replicas_after.clone(),
            operations,
            consistency_before: level.check(replicas_before),
            consistency_after: level.check(replicas_after),
        };

        if !report.consistency_after.satisfied {
            warn!(
                key = %report.key,
                level = %level,
                live = report.consistency_after.available,
                "key no longer satisfies consistency level"
            );
        }
        self.advance(SimulationState::Reported);
        self.guard = None;
        Ok(report)
    }

    /// Brings the node failed by this run back: marks it UP and starts it.
    ///
    /// Valid in any state once a node has been failed.
    pub async fn recover(&mut self) -> Result<()> {
        let node = recorded(&self.progress.failed_node, "failed node")?.clone();
        self.controller.recover_node(&node)?;
        self.node_control.start(&node).await?;
        info!(node = %node, state = %self.state, "node recovered");
        Ok(())
    }

    async fn traced_execute(
        &self,
        op: &TracedOperation,
        key: &str,
        replication_factor: usize,
    ) -> Result<OperationFlow> {
        let statement = Statement::for_key(op.query.clone(), key)
            .with_kind(op.kind)
            .with_replication_factor(replication_factor);
        let result = self.client.execute(&statement, true).await?;
        let trace = result.trace.ok_or_else(|| {
            Error::MalformedTrace(format!("no {} trace returned for key `{key}`", op.kind))
        })?;
        let flow = TraceAnalyzer::analyze(&trace, result.coordinator.as_ref())?;
        info!(kind = %op.kind, coordinator = %flow.coordinator, "operation traced");
        Ok(OperationFlow {
            kind: op.kind,
            query: op.query.clone(),
            flow,
        })
    }

    fn require(&self, expected: SimulationState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidSequence {
                expected,
                actual: self.state,
            })
        }
    }

    fn advance(&mut self, next: SimulationState) {
        info!(from = %self.state, to = %next, "simulation step");
        self.state = next;
    }
}

fn recorded<'a, T>(field: &'a Option<T>, what: &'static str) -> Result<&'a T> {
    field.as_ref().ok_or(Error::Incomplete(what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SimulationState::Init.to_string(), "INIT");
        assert_eq!(SimulationState::TracedAfter.to_string(), "TRACED_AFTER");
    }

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.consistency, ConsistencyLevel::Quorum);
        assert_eq!(config.policy, SelectionPolicy::PrimaryOwner);
        let kinds: Vec<_> = config.operations.iter().map(|op| op.kind).collect();
        assert_eq!(kinds, vec![StatementKind::Read, StatementKind::Write]);
        assert!(config.operations.iter().all(|op| op.query.contains("bird_id = ?")));
    }
}
