//! Execution traces and their analysis.

pub mod analyzer;
pub mod record;

pub use analyzer::{FlowEvent, FlowReport, Role, TraceAnalyzer};
pub use record::{TraceEvent, TraceRecord};
