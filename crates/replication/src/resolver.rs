//! Replica resolution against the live ring.

use crate::error::Result;
use crate::placement::ReplicaSet;
use crate::strategy::{ReplicationStrategy, SimpleStrategy};
use corelib::partitioner::Partitioner;
use corelib::ring::{RingSnapshot, RingTopology};
use corelib::token::Token;
use std::sync::Arc;
use tracing::debug;

/// Resolves replica sets from the current membership of a shared ring.
///
/// Every call takes a fresh snapshot; nothing is cached between calls since
/// membership may change in between.
#[derive(Debug, Clone)]
pub struct ReplicaResolver {
    ring: Arc<RingTopology>,
}

impl ReplicaResolver {
    pub fn new(ring: Arc<RingTopology>) -> Self {
        Self { ring }
    }

    pub fn ring(&self) -> &Arc<RingTopology> {
        &self.ring
    }

    /// Ordered live replicas for `token` under `replication_factor`.
    pub fn resolve(&self, token: Token, replication_factor: usize) -> Result<ReplicaSet> {
        let snapshot = self.ring.snapshot();
        Self::resolve_in(&snapshot, token, replication_factor)
    }

    /// Same as [`ReplicaResolver::resolve`] against an existing snapshot.
    pub fn resolve_in(
        snapshot: &RingSnapshot,
        token: Token,
        replication_factor: usize,
    ) -> Result<ReplicaSet> {
        let replicas = SimpleStrategy::new(replication_factor).replicas_for_token(snapshot, token)?;
        debug!(
            %token,
            replication_factor,
            found = replicas.len(),
            version = snapshot.version,
            "resolved replicas"
        );
        Ok(replicas)
    }

    /// Hashes `key` with `partitioner` and resolves its replicas.
    pub fn resolve_key(
        &self,
        partitioner: &dyn Partitioner,
        key: &str,
        replication_factor: usize,
    ) -> Result<ReplicaSet> {
        let token = partitioner.token(key)?;
        self.resolve(token, replication_factor)
    }
}
