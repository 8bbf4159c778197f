//! Subcommand execution and output rendering.

use crate::config::{CliConfig, Command, OutputFormat};
use anyhow::Context;
use corelib::node::NodeId;
use corelib::ring::RingSnapshot;
use corelib::token::Token;
use corelib::TopologyConfig;
use replication::{ConsistencyCheck, ConsistencyLevel, ReplicaSet};
use serde::Serialize;
use simulation::{
    compare, parse_nodetool_ring, ClusterController, FailureSimulationOrchestrator, InspectedEntry,
    LocalCluster, RingInspector, RingMismatch, SelectionPolicy, SimulationConfig,
    SimulationReport,
};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Placement of one key.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedKey {
    pub key: String,
    pub token: Token,
    pub replicas: ReplicaSet,
    pub consistency: ConsistencyCheck,
}

/// Outcome of a subcommand, rendered by [`CommandResult::render`].
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    Ring(RingSnapshot),
    Resolved(Vec<ResolvedKey>),
    Simulated(Box<SimulationReport>),
    Inspected {
        entries: Vec<InspectedEntry>,
        mismatches: Vec<RingMismatch>,
    },
}

impl CommandResult {
    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(self).context("serializing command output")
            }
            OutputFormat::Text => Ok(self.to_string()),
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Ring(snapshot) => write!(f, "{snapshot}"),
            CommandResult::Resolved(keys) => {
                for k in keys {
                    writeln!(f, "{:<16} {}", k.key, k.replicas)?;
                    writeln!(f, "{:<16} {}", "", k.consistency)?;
                }
                Ok(())
            }
            CommandResult::Simulated(report) => write!(f, "{report}"),
            CommandResult::Inspected {
                entries,
                mismatches,
            } => {
                for e in entries {
                    let owns = e
                        .ownership
                        .map(|o| format!("{o:.2}%"))
                        .unwrap_or_else(|| "?".to_string());
                    writeln!(
                        f,
                        "{:<24} {:<10} {:<6} {:>8}  {}",
                        e.address,
                        e.rack,
                        e.status.to_string(),
                        owns,
                        e.token
                    )?;
                }
                if mismatches.is_empty() {
                    writeln!(f, "ring matches topology")
                } else {
                    writeln!(f, "{} mismatch(es):", mismatches.len())?;
                    for m in mismatches {
                        writeln!(f, "  {m}")?;
                    }
                    Ok(())
                }
            }
        }
    }
}

impl CliConfig {
    pub async fn run(&self) -> anyhow::Result<CommandResult> {
        let topology = self.topology()?;
        match &self.command {
            Command::Ring { down } => {
                let controller = controller_with_down(&topology, down)?;
                Ok(CommandResult::Ring(controller.snapshot()))
            }
            Command::Resolve {
                keys,
                down,
                consistency,
            } => resolve_keys(&topology, keys, down, *consistency),
            Command::Simulate {
                key,
                policy,
                consistency,
                recover,
            } => simulate(&topology, key, policy.clone(), *consistency, *recover).await,
            Command::Inspect { dump } => {
                let entries = match dump {
                    Some(path) => {
                        let raw = std::fs::read_to_string(path)
                            .with_context(|| format!("reading {}", path.display()))?;
                        parse_nodetool_ring(&raw)?
                    }
                    None => LocalCluster::from_config(&topology)?.inspect().await?,
                };
                let expected = topology.build_ring()?.snapshot();
                let mismatches = compare(&expected, &entries);
                Ok(CommandResult::Inspected {
                    entries,
                    mismatches,
                })
            }
        }
    }
}

fn controller_with_down(
    topology: &TopologyConfig,
    down: &[NodeId],
) -> anyhow::Result<ClusterController> {
    let controller = ClusterController::new(Arc::new(topology.build_ring()?));
    for node in down {
        controller
            .fail_node(node)
            .with_context(|| format!("marking {node} down"))?;
    }
    Ok(controller)
}

fn resolve_keys(
    topology: &TopologyConfig,
    keys: &[String],
    down: &[NodeId],
    level: ConsistencyLevel,
) -> anyhow::Result<CommandResult> {
    let controller = controller_with_down(topology, down)?;
    let resolver = controller.resolver();
    let partitioner = topology.partitioner.build();

    let mut resolved = Vec::with_capacity(keys.len());
    for key in keys {
        let replicas = resolver
            .resolve_key(partitioner.as_ref(), key, topology.replication_factor)
            .with_context(|| format!("resolving `{key}`"))?;
        resolved.push(ResolvedKey {
            key: key.clone(),
            token: replicas.token,
            consistency: level.check(&replicas),
            replicas,
        });
    }
    Ok(CommandResult::Resolved(resolved))
}

async fn simulate(
    topology: &TopologyConfig,
    key: &str,
    policy: SelectionPolicy,
    consistency: ConsistencyLevel,
    recover: bool,
) -> anyhow::Result<CommandResult> {
    let controller = Arc::new(ClusterController::new(Arc::new(topology.build_ring()?)));
    let cluster = Arc::new(LocalCluster::from_config(topology)?);
    let mut orchestrator = FailureSimulationOrchestrator::new(
        controller,
        cluster.clone(),
        cluster,
        topology.partitioner.build(),
    )
    .with_config(SimulationConfig {
        consistency,
        policy,
        ..SimulationConfig::default()
    });

    let report = orchestrator
        .run(key, topology.replication_factor)
        .await
        .with_context(|| format!("simulating failure for `{key}`"))?;
    if recover {
        orchestrator.recover().await?;
        info!(node = %report.failed_node, "failed node recovered");
    }
    Ok(CommandResult::Simulated(Box::new(report)))
}
