//! `ringsim`: token ring inspection and node failure simulation.
//!
//! Provides commands for:
//! - Printing the ring with nodes marked down
//! - Resolving keys to tokens and replicas
//! - Running a failure simulation against the in-memory cluster
//! - Comparing a `nodetool ring` dump with the topology

pub mod commands;
pub mod config;

pub use commands::{CommandResult, ResolvedKey};
pub use config::{CliConfig, Command, OutputFormat};
