//! Simulation errors.

use crate::control::{ClientError, NodeControlError};
use crate::orchestrator::SimulationState;
use replication::ReplicationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Ring-level failure (invalid key, unknown node, duplicate token).
    #[error(transparent)]
    Ring(#[from] corelib::Error),
    /// The replica set could not be derived, e.g. no live node is left.
    #[error(transparent)]
    Resolution(#[from] ReplicationError),
    #[error("malformed trace: {0}")]
    MalformedTrace(String),
    #[error("malformed ring dump: {0}")]
    MalformedRing(String),
    #[error("invalid sequence: step requires state {expected}, simulation is in {actual}")]
    InvalidSequence {
        expected: SimulationState,
        actual: SimulationState,
    },
    #[error(transparent)]
    NodeControl(#[from] NodeControlError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("no traced operations configured")]
    NoOperations,
    #[error("selection policy picked no node from {0}")]
    NoFailureCandidate(String),
    #[error("a simulation is already running for key `{0}`")]
    SimulationInProgress(String),
    #[error("simulation progress is missing {0}")]
    Incomplete(&'static str),
}
