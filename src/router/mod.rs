//! Command routing across node connections.
//!
//! # Data Flow
//! ```text
//! Caller submits command
//!     → Router::dispatch
//!     → cluster.rs (pick next open node, round-robin)
//!     → NodeCommandHandler::write
//!
//! Node closes with queued commands:
//!     → failover drain
//!     → Router::dispatch (hand-off)
//!     → another node, or HandoffRejected back to the command
//! ```
//!
//! # Design Decisions
//! - `Router` is the only seam the node core sees; slot mapping and
//!   topology discovery live behind it
//! - Closed nodes are skipped, the same way unhealthy backends are
//! - Dispatch never holds a registry lock while writing to a node, so a
//!   closing node handing off to the router cannot deadlock

pub mod cluster;

use crate::command::Command;
use crate::error::RouterError;

pub use cluster::ClusterRouter;

/// Higher-level writer able to re-dispatch a command to any node.
pub trait Router: Send + Sync {
    /// Accept `command` for delivery. On error the command is untouched and
    /// the caller decides its fate.
    fn dispatch(&self, command: Command) -> Result<(), RouterError>;
}
