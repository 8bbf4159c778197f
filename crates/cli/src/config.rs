//! Command-line configuration.

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use corelib::node::NodeId;
use corelib::partitioner::PartitionerKind;
use corelib::TopologyConfig;
use replication::ConsistencyLevel;
use simulation::SelectionPolicy;
use std::path::PathBuf;
use tracing::debug;

/// Token ring inspection and node failure simulation.
#[derive(Parser, Debug)]
#[command(name = "ringsim", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliConfig {
    /// Topology file (JSON). Defaults to the four-node demo cluster.
    #[arg(long, env = "RINGSIM_TOPOLOGY", global = true)]
    pub topology: Option<PathBuf>,

    /// Override the topology's partitioner (sip, xxh3).
    #[arg(long, env = "RINGSIM_PARTITIONER", global = true)]
    pub partitioner: Option<PartitionerKind>,

    /// Override the topology's replication factor.
    #[arg(long, global = true)]
    pub rf: Option<usize>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the ring as `nodetool ring` would.
    Ring {
        /// Mark these nodes DOWN first (address:port).
        #[arg(long)]
        down: Vec<NodeId>,
    },

    /// Show token and replicas for each key.
    Resolve {
        #[arg(required = true)]
        keys: Vec<String>,

        /// Mark these nodes DOWN first (address:port).
        #[arg(long)]
        down: Vec<NodeId>,

        #[arg(long, default_value = "QUORUM")]
        consistency: ConsistencyLevel,
    },

    /// Fail a replica of KEY and compare routing before and after.
    Simulate {
        #[arg(default_value = "bird_01")]
        key: String,

        /// primary, replica:N or node:ADDR:PORT.
        #[arg(long, default_value = "primary")]
        policy: SelectionPolicy,

        #[arg(long, default_value = "QUORUM")]
        consistency: ConsistencyLevel,

        /// Bring the failed node back after the report.
        #[arg(long)]
        recover: bool,
    },

    /// Compare a live ring dump with the topology.
    Inspect {
        /// Saved `nodetool ring` output. Without it the in-memory cluster is
        /// inspected.
        #[arg(long)]
        dump: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl CliConfig {
    /// Topology file or demo cluster, with command-line overrides applied.
    pub fn topology(&self) -> anyhow::Result<TopologyConfig> {
        let mut topology = match &self.topology {
            Some(path) => TopologyConfig::load(path)
                .with_context(|| format!("loading topology {}", path.display()))?,
            None => TopologyConfig::demo(),
        };
        if let Some(kind) = self.partitioner {
            topology.partitioner = kind;
        }
        if let Some(rf) = self.rf {
            topology.replication_factor = rf;
        }
        debug!(
            nodes = topology.nodes.len(),
            partitioner = %topology.partitioner,
            rf = topology.replication_factor,
            "topology loaded"
        );
        Ok(topology)
    }

    /// Default filter directive for `-v` when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
