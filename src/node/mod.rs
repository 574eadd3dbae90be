//! Node connection subsystem.
//!
//! # Data Flow
//! ```text
//! Submission:
//!     Router::dispatch / caller
//!     → handler.rs (write / enqueue_pending)
//!     → queue.rs (pending buffer)
//!     → promote on send → queue.rs (in-flight queue)
//!     → response → complete_in_flight
//!
//! Transport events:
//!     connect / activate / disconnect
//!     → state.rs (lifecycle state machine)
//!
//! Teardown:
//!     prepare_close → watchdog suspended
//!     close → state.rs (CLOSED gate) → queue.rs (drain)
//!           → hand-off to router or fail in place
//! ```
//!
//! # Design Decisions
//! - One handler per logical node; a reconnect swaps the channel, not the
//!   handler, so queued work survives transient failures
//! - Completion state lives on the command, not in the containers

pub mod connection;
pub mod handler;
pub mod queue;
pub mod state;

pub use connection::{ConnectionId, NodeId};
pub use handler::{CloseReport, NodeCommandHandler};
pub use queue::{CommandQueues, Placement};
pub use state::{LifecycleState, LifecycleStateMachine, TransportEvent};
