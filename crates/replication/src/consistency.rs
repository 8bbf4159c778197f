//! Consistency levels layered over a replica set.
//!
//! Resolution never consults these; they only answer whether a set of live
//! replicas could serve a request at a given level.

use crate::placement::ReplicaSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsistencyLevel {
    One,
    Two,
    Three,
    #[default]
    Quorum,
    All,
}

impl ConsistencyLevel {
    /// Replica acknowledgements needed under `replication_factor`. Never
    /// less than one.
    pub fn required(self, replication_factor: usize) -> usize {
        match self {
            ConsistencyLevel::One => 1,
            ConsistencyLevel::Two => 2,
            ConsistencyLevel::Three => 3,
            ConsistencyLevel::Quorum => replication_factor / 2 + 1,
            ConsistencyLevel::All => replication_factor.max(1),
        }
    }

    pub fn check(self, replicas: &ReplicaSet) -> ConsistencyCheck {
        let required = self.required(replicas.replication_factor);
        let available = replicas.len();
        ConsistencyCheck {
            level: self,
            required,
            available,
            satisfied: available >= required,
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::All => "ALL",
        };
        f.write_str(name)
    }
}

impl FromStr for ConsistencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ONE" => Ok(ConsistencyLevel::One),
            "TWO" => Ok(ConsistencyLevel::Two),
            "THREE" => Ok(ConsistencyLevel::Three),
            "QUORUM" => Ok(ConsistencyLevel::Quorum),
            "ALL" => Ok(ConsistencyLevel::All),
            other => Err(format!("unknown consistency level `{other}`")),
        }
    }
}

/// Outcome of [`ConsistencyLevel::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub level: ConsistencyLevel,
    pub required: usize,
    pub available: usize,
    pub satisfied: bool,
}

impl fmt::Display for ConsistencyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.satisfied { "available" } else { "unavailable" };
        write!(
            f,
            "{}: {}/{} replicas live, {verdict}",
            self.level, self.available, self.required
        )
    }
}
