//! Transport seam.
//!
//! # Data Flow
//! ```text
//! Dispatch path:
//!     NodeCommandHandler::write / activated
//!     → Channel::write (wire encoder, external)
//!
//! Teardown:
//!     NodeCommandHandler::prepare_close
//!     → Channel::watchdog() (capability, optional)
//!     → SuspendReconnect::suspend_reconnect
//!
//!     NodeCommandHandler::close
//!     → failover drain
//!     → Channel::close
//! ```
//!
//! # Design Decisions
//! - Socket setup, TLS and encoding live behind the `Transport` trait
//! - The reconnect watchdog is a capability, not a concrete type; a
//!   transport without auto-reconnect returns `None`
//! - A `Channel` wraps one physical transport and gets a fresh
//!   `ConnectionId` per reconnect

pub mod watchdog;

use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::error::TransportError;
use crate::node::connection::ConnectionId;

pub use watchdog::{ConnectionWatchdog, WatchdogExit};

/// Something that can be told to stop reconnecting.
pub trait SuspendReconnect: Send + Sync {
    /// Suspend automatic reconnection. Never cleared by the node core.
    fn suspend_reconnect(&self);

    fn is_reconnect_suspended(&self) -> bool;
}

/// A physical link to one node.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Hand an encoded command to the wire.
    fn write(&self, command: &Command) -> Result<(), TransportError>;

    /// Close the underlying socket.
    fn close(&self);

    /// Reconnect watchdog attached to this transport, if any.
    fn watchdog(&self) -> Option<Arc<dyn SuspendReconnect>> {
        None
    }
}

/// Live transport handle owned by a node connection.
#[derive(Debug)]
pub struct Channel {
    id: ConnectionId,
    transport: Box<dyn Transport>,
}

impl Channel {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            id: ConnectionId::new(),
            transport: Box::new(transport),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn write(&self, command: &Command) -> Result<(), TransportError> {
        self.transport.write(command)
    }

    pub fn close(&self) {
        tracing::trace!(connection_id = %self.id, "Closing transport");
        self.transport.close();
    }

    pub fn watchdog(&self) -> Option<Arc<dyn SuspendReconnect>> {
        self.transport.watchdog()
    }
}
