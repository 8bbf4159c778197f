//! Turns a raw trace into a coordinator/replica timeline.
//!
//! # Algorithm
//!
//! 1. Order events by relative timestamp with a stable sort, so events that
//!    share a timestamp keep the order the engine reported them in
//! 2. The coordinator is the source of the first event in that order, unless
//!    the caller passes the node the driver actually connected to
//! 3. Events from the coordinator are coordinator operations, everything
//!    else is replica work

use crate::error::{Error, Result};
use crate::trace::record::{TraceEvent, TraceRecord};
use corelib::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    CoordinatorOperation,
    ReplicaOperation,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::CoordinatorOperation => f.write_str("COORDINATOR"),
            Role::ReplicaOperation => f.write_str("REPLICA"),
        }
    }
}

/// A classified trace event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEvent {
    /// Position of the event in the raw trace.
    pub sequence: usize,
    pub source: NodeId,
    pub elapsed_micros: u64,
    pub role: Role,
    pub thread: String,
    pub description: String,
}

/// Coordinator plus the time-ordered, classified events of one trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReport {
    pub trace_id: String,
    pub coordinator: NodeId,
    pub events: Vec<FlowEvent>,
    pub duration_micros: u64,
    /// Distinct nodes other than the coordinator that produced events.
    pub replica_count: usize,
}

impl FlowReport {
    /// Every node that produced at least one event.
    pub fn nodes_involved(&self) -> BTreeSet<&NodeId> {
        self.events.iter().map(|e| &e.source).collect()
    }

    pub fn replica_nodes(&self) -> BTreeSet<&NodeId> {
        self.events
            .iter()
            .filter(|e| e.role == Role::ReplicaOperation)
            .map(|e| &e.source)
            .collect()
    }

    pub fn events_with(&self, role: Role) -> impl Iterator<Item = &FlowEvent> {
        self.events.iter().filter(move |e| e.role == role)
    }

    /// The request was served without touching `failed`: another node
    /// coordinated it and `failed` produced no event.
    pub fn rerouted_around(&self, failed: &NodeId) -> bool {
        &self.coordinator != failed && self.events.iter().all(|e| &e.source != failed)
    }
}

impl fmt::Display for FlowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trace {}", self.trace_id)?;
        writeln!(f, "Coordinator: {}", self.coordinator)?;
        writeln!(
            f,
            "Duration: {:.2} ms, replicas involved: {}",
            self.duration_micros as f64 / 1000.0,
            self.replica_count
        )?;
        for (i, e) in self.events.iter().enumerate() {
            writeln!(
                f,
                "  {:2}. [{:8.2} ms] {:<24} {:<11} {}",
                i + 1,
                e.elapsed_micros as f64 / 1000.0,
                e.source.to_string(),
                e.role.to_string(),
                e.description
            )?;
        }
        Ok(())
    }
}

/// Stateless trace classifier.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceAnalyzer;

impl TraceAnalyzer {
    /// Classifies `trace` into a [`FlowReport`].
    ///
    /// # Errors
    ///
    /// [`Error::MalformedTrace`] when the trace has no events.
    pub fn analyze(trace: &TraceRecord, coordinator_hint: Option<&NodeId>) -> Result<FlowReport> {
        let mut ordered: Vec<(usize, &TraceEvent)> = trace.events.iter().enumerate().collect();
        ordered.sort_by_key(|(_, e)| e.source_elapsed_micros);

        let Some((_, first)) = ordered.first() else {
            return Err(Error::MalformedTrace(format!(
                "trace {} has no events",
                trace.trace_id
            )));
        };
        let coordinator = coordinator_hint.unwrap_or(&first.source).clone();

        let events: Vec<FlowEvent> = ordered
            .into_iter()
            .map(|(sequence, e)| FlowEvent {
                sequence,
                source: e.source.clone(),
                elapsed_micros: e.source_elapsed_micros,
                role: if e.source == coordinator {
                    Role::CoordinatorOperation
                } else {
                    Role::ReplicaOperation
                },
                thread: e.thread.clone(),
                description: e.description.clone(),
            })
            .collect();

        let replica_count = events
            .iter()
            .filter(|e| e.role == Role::ReplicaOperation)
            .map(|e| &e.source)
            .collect::<BTreeSet<_>>()
            .len();

        Ok(FlowReport {
            trace_id: trace.trace_id.clone(),
            coordinator,
            events,
            duration_micros: trace.duration_micros,
            replica_count,
        })
    }
}
