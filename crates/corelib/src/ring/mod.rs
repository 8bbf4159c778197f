//! Token ring membership.
//!
//! [`RingTopology`] is the live, mutable ring; [`RingSnapshot`] is a sorted,
//! read-only copy of it that resolution and reporting work from.

pub mod snapshot;
pub mod topology;

pub use snapshot::{RingEntry, RingSnapshot};
pub use topology::RingTopology;
