//! Command lifecycle and failover core for cluster node connections.
//!
//! Each node connection owns an in-flight queue and a pending buffer. When
//! the node closes, every command it holds is either handed to the router
//! for re-dispatch or failed in place, exactly once.

pub mod command;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod node;
pub mod observability;
pub mod resilience;
pub mod router;
pub mod transport;

pub use command::{Command, CommandDescriptor, CommandOutcome, CompletionState};
pub use config::ClientConfig;
pub use error::{CommandError, QueueError, RouterError};
pub use node::{CloseReport, LifecycleState, NodeCommandHandler, TransportEvent};
pub use router::{ClusterRouter, Router};
