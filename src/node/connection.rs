//! Node and physical-connection identifiers.
//!
//! # Responsibilities
//! - Generate unique node IDs (one per logical node connection)
//! - Generate unique connection IDs (one per physical transport; a node
//!   sees a new one after every reconnect)

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Relaxed ordering is sufficient: only uniqueness is needed.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifier of a logical node connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn new() -> Self {
        Self(NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Identifier of one physical transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_unique() {
        assert_ne!(NodeId::new(), NodeId::new());
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_display_prefix() {
        let id = NodeId::new();
        assert_eq!(id.to_string(), format!("node-{}", id.as_u64()));
    }
}
