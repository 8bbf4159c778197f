//! Replication strategy abstractions.
//!
//! Replication strategies determine how many replicas to create and where
//! to place them on the ring.
//!
//! - **SimpleStrategy**: N replicas placed sequentially around the ring

pub mod simple;

pub use simple::SimpleStrategy;

use crate::error::Result;
use crate::placement::ReplicaSet;
use corelib::ring::RingSnapshot;
use corelib::token::Token;

/// Trait for replication strategies.
///
/// Strategies are pure functions of a ring snapshot: they never look at the
/// live ring, so a resolution always sees one consistent membership.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as they may be
/// shared across threads.
pub trait ReplicationStrategy: Send + Sync + 'static {
    /// Get the number of replicas this strategy creates.
    fn replication_factor(&self) -> usize;

    /// Find replica nodes for a token (primary first).
    ///
    /// # Errors
    ///
    /// `EmptyRing` when the snapshot has no UP node.
    fn replicas_for_token(&self, ring: &RingSnapshot, token: Token) -> Result<ReplicaSet>;

    /// Get the strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}
