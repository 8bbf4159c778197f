//! Which node a simulation takes down.

use corelib::node::NodeId;
use replication::ReplicaSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Picks the failure target from the "before" replica set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// The first replica: the live owner of the key's token.
    #[default]
    PrimaryOwner,
    /// The replica at this position in the ordered set.
    ReplicaAt(usize),
    /// A fixed node, whether or not it holds the key.
    Explicit(NodeId),
}

impl SelectionPolicy {
    pub fn select(&self, replicas: &ReplicaSet) -> Option<NodeId> {
        match self {
            SelectionPolicy::PrimaryOwner => replicas.primary().cloned(),
            SelectionPolicy::ReplicaAt(index) => replicas.get(*index).cloned(),
            SelectionPolicy::Explicit(node) => Some(node.clone()),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::PrimaryOwner => f.write_str("primary"),
            SelectionPolicy::ReplicaAt(i) => write!(f, "replica:{i}"),
            SelectionPolicy::Explicit(node) => write!(f, "node:{node}"),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    /// Accepts `primary`, `replica:<index>` and `node:<address>:<port>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("primary") {
            return Ok(SelectionPolicy::PrimaryOwner);
        }
        match s.split_once(':') {
            Some(("replica", index)) => index
                .parse()
                .map(SelectionPolicy::ReplicaAt)
                .map_err(|e| format!("invalid replica index `{index}`: {e}")),
            Some(("node", node)) => node
                .parse()
                .map(SelectionPolicy::Explicit)
                .map_err(|e: corelib::Error| e.to_string()),
            _ => Err(format!(
                "unknown selection policy `{s}` (expected primary, replica:N or node:ADDR:PORT)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::token::Token;

    fn replicas() -> ReplicaSet {
        ReplicaSet {
            token: Token(42),
            replication_factor: 3,
            replicas: vec![
                NodeId::new("cassandra-2", 9042),
                NodeId::new("cassandra-3", 9042),
            ],
        }
    }

    #[test]
    fn test_select() {
        let set = replicas();
        assert_eq!(
            SelectionPolicy::PrimaryOwner.select(&set),
            Some(NodeId::new("cassandra-2", 9042))
        );
        assert_eq!(
            SelectionPolicy::ReplicaAt(1).select(&set),
            Some(NodeId::new("cassandra-3", 9042))
        );
        assert_eq!(SelectionPolicy::ReplicaAt(2).select(&set), None);

        let empty = ReplicaSet {
            replicas: vec![],
            ..replicas()
        };
        assert_eq!(SelectionPolicy::PrimaryOwner.select(&empty), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("primary".parse(), Ok(SelectionPolicy::PrimaryOwner));
        assert_eq!("replica:1".parse(), Ok(SelectionPolicy::ReplicaAt(1)));
        assert_eq!(
            "node:10.0.0.7:9042".parse(),
            Ok(SelectionPolicy::Explicit(NodeId::new("10.0.0.7", 9042)))
        );
        assert!("replica:x".parse::<SelectionPolicy>().is_err());
        assert!("random".parse::<SelectionPolicy>().is_err());

        let policy = SelectionPolicy::ReplicaAt(2);
        assert_eq!(policy.to_string().parse(), Ok(policy));
    }
}
