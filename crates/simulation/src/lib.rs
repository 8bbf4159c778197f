//! Failure injection and trace-flow analysis on top of the token ring.
//!
//! This crate provides:
//! - Membership changes with change notifications ([`ClusterController`])
//! - Collaborator contracts for node control, storage access and ring
//!   inspection, plus an in-memory [`LocalCluster`] implementing all three
//! - Trace classification into coordinator and replica work
//! - The before/after failure experiment ([`FailureSimulationOrchestrator`])

pub mod control;
pub mod controller;
pub mod error;
pub mod inspector;
pub mod local;
pub mod locks;
pub mod orchestrator;
pub mod policy;
pub mod trace;

pub use control::{
    ClientError, ExecutionResult, NodeControl, NodeControlError, RingInspector, Statement,
    StatementKind, StorageClient,
};
pub use controller::{ClusterController, RingChangeEvent, RingChangeKind};
pub use error::{Error, Result};
pub use inspector::{compare, parse_nodetool_ring, InspectedEntry, RingMismatch};
pub use local::LocalCluster;
pub use locks::{KeyGuard, KeyLocks};
pub use orchestrator::{
    FailureSimulationOrchestrator, OperationFlow, OperationReport, SimulationConfig,
    SimulationProgress, SimulationReport, SimulationState, TracedOperation,
};
pub use policy::SelectionPolicy;
pub use trace::{FlowEvent, FlowReport, Role, TraceAnalyzer, TraceEvent, TraceRecord};
