//! Core identity types shared across the schema graph and checker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a vertex within one [`crate::graph::SchemaGraph`].
///
/// Ids are assigned by the owning graph's monotonic counter and are dense:
/// the id doubles as the vertex's index in the graph's store. They are never
/// reused within a session, and the serialized schema format relies on the
/// density for its append/offset composition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    /// The root ("state") vertex of every graph.
    pub const ROOT: Self = Self(0);

    /// Index into the graph's dense vertex store.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by [`crate::event::ListenerSet::subscribe`], used to
/// unsubscribe later. Handles are unique per listener set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
