//! Raw traces as produced by the storage engine.

use crate::error::{Error, Result};
use corelib::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One step the engine took while serving a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub source: NodeId,
    /// Microseconds since the request started.
    pub source_elapsed_micros: u64,
    /// Thread or stage that performed the step.
    #[serde(default)]
    pub thread: String,
    pub description: String,
}

/// Full trace of one operation. Events keep the order the engine returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub trace_id: String,
    pub duration_micros: u64,
    #[serde(default)]
    pub request_type: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub events: Vec<TraceEvent>,
}

impl TraceRecord {
    /// Parses a JSON trace dump.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::MalformedTrace(e.to_string()))
    }
}
