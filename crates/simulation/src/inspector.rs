//! Live ring dumps and their comparison with the expected ring.
//!
//! `nodetool ring` prints one line per token:
//!
//! ```text
//! Datacenter: datacenter1
//! ==========
//! Address     Rack   Status State   Load        Owns     Token
//!                                                        4611686018427387903
//! 172.18.0.2  rack1  Up     Normal  104.2 KiB   25.00%   -9223372036854775808
//! ```
//!
//! [`parse_nodetool_ring`] reads that table into [`InspectedEntry`] rows and
//! [`compare`] lists where it disagrees with a [`RingSnapshot`].

use crate::error::{Error, Result};
use corelib::node::{HostId, NodeId, NodeStatus};
use corelib::ring::RingSnapshot;
use corelib::token::Token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const SKIPPED_PREFIXES: [&str; 5] = ["Datacenter:", "==", "Address", "Note:", "Warning:"];

// Address, rack, status, state, load, owns, token.
const MIN_FIELDS: usize = 7;

/// One row of a live ring dump.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InspectedEntry {
    pub address: String,
    pub rack: String,
    pub status: NodeStatus,
    pub token: Token,
    /// Percent owned, when the tool could compute it.
    pub ownership: Option<f64>,
    pub host_id: Option<HostId>,
}

impl InspectedEntry {
    /// What a faithful live dump of `snapshot` would contain.
    pub fn from_snapshot(snapshot: &RingSnapshot) -> Vec<Self> {
        snapshot
            .iter()
            .map(|e| Self {
                address: e.node.address.clone(),
                rack: e.rack.clone(),
                status: e.status,
                token: e.token,
                ownership: Some(e.ownership),
                host_id: Some(e.host_id),
            })
            .collect()
    }
}

/// Parses the output of `nodetool ring`.
///
/// # Errors
///
/// [`Error::MalformedRing`] on any row that is not a header and cannot be
/// read as a token binding.
pub fn parse_nodetool_ring(raw: &str) -> Result<Vec<InspectedEntry>> {
    let mut entries = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || SKIPPED_PREFIXES.iter().any(|p| line.starts_with(p)) {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        // The wrap-around token printed above the rows.
        if fields.len() == 1 && fields[0].parse::<i64>().is_ok() {
            continue;
        }
        if fields.len() < MIN_FIELDS {
            return Err(malformed(lineno, line, "too few columns"));
        }

        let token = fields[fields.len() - 1]
            .parse::<Token>()
            .map_err(|_| malformed(lineno, line, "bad token"))?;
        let ownership = match fields[fields.len() - 2] {
            "?" => None,
            owns => Some(
                owns.trim_end_matches('%')
                    .parse::<f64>()
                    .map_err(|_| malformed(lineno, line, "bad ownership"))?,
            ),
        };
        let status = fields[2]
            .parse::<NodeStatus>()
            .map_err(|_| malformed(lineno, line, "bad status"))?;

        entries.push(InspectedEntry {
            address: fields[0].to_string(),
            rack: fields[1].to_string(),
            status,
            token,
            ownership,
            host_id: None,
        });
    }
    Ok(entries)
}

fn malformed(lineno: usize, line: &str, reason: &str) -> Error {
    Error::MalformedRing(format!("line {}: {reason}: `{line}`", lineno + 1))
}

/// A disagreement between the expected ring and a live dump.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RingMismatch {
    /// Expected binding absent from the dump.
    MissingToken { token: Token, expected: NodeId },
    /// Dump shows a token the snapshot does not have.
    UnexpectedToken { token: Token, address: String },
    OwnerMismatch {
        token: Token,
        expected: NodeId,
        actual: String,
    },
    StatusMismatch {
        token: Token,
        node: NodeId,
        expected: NodeStatus,
        actual: NodeStatus,
    },
}

impl fmt::Display for RingMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingMismatch::MissingToken { token, expected } => {
                write!(f, "token {token}: expected on {expected}, missing from ring")
            }
            RingMismatch::UnexpectedToken { token, address } => {
                write!(f, "token {token}: unexpected, owned by {address}")
            }
            RingMismatch::OwnerMismatch {
                token,
                expected,
                actual,
            } => write!(f, "token {token}: expected owner {expected}, found {actual}"),
            RingMismatch::StatusMismatch {
                token,
                node,
                expected,
                actual,
            } => write!(f, "token {token}: {node} expected {expected}, found {actual}"),
        }
    }
}

/// Lists every difference between `snapshot` and `inspected`, in token order.
///
/// Nodes are matched by address only, since the dump does not print ports.
pub fn compare(snapshot: &RingSnapshot, inspected: &[InspectedEntry]) -> Vec<RingMismatch> {
    let live: BTreeMap<Token, &InspectedEntry> = inspected.iter().map(|e| (e.token, e)).collect();
    let mut mismatches = Vec::new();

    for expected in snapshot.iter() {
        match live.get(&expected.token) {
            None => mismatches.push(RingMismatch::MissingToken {
                token: expected.token,
                expected: expected.node.clone(),
            }),
            Some(actual) if actual.address != expected.node.address => {
                mismatches.push(RingMismatch::OwnerMismatch {
                    token: expected.token,
                    expected: expected.node.clone(),
                    actual: actual.address.clone(),
                })
            }
            Some(actual) if actual.status != expected.status => {
                mismatches.push(RingMismatch::StatusMismatch {
                    token: expected.token,
                    node: expected.node.clone(),
                    expected: expected.status,
                    actual: actual.status,
                })
            }
            Some(_) => {}
        }
    }

    for (token, actual) in &live {
        if !snapshot.iter().any(|e| e.token == *token) {
            mismatches.push(RingMismatch::UnexpectedToken {
                token: *token,
                address: actual.address.clone(),
            });
        }
    }
    mismatches.sort_by_key(|m| match m {
        RingMismatch::MissingToken { token, .. }
        | RingMismatch::UnexpectedToken { token, .. }
        | RingMismatch::OwnerMismatch { token, .. }
        | RingMismatch::StatusMismatch { token, .. } => *token,
    });
    mismatches
}
