//! Error definitions shared across the node-connection core.
//!
//! Completion errors (`CommandError`) travel through a command's completion
//! channel, so they are `Clone` and carry owned data only. Queue errors hand
//! the rejected command back so the caller can submit it elsewhere.

use thiserror::Error;

use crate::command::Command;
use crate::node::connection::NodeId;

/// Terminal failure delivered through a command's completion callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No viable path: no router, or the command was not eligible for hand-off.
    #[error("connection closed")]
    ConnectionClosed,

    /// The router could not accept a transferred command.
    #[error("hand-off rejected: {0}")]
    HandoffRejected(RouterError),

    /// The remote store answered with an error reply.
    #[error("server error: {0}")]
    Server(String),
}

/// Errors returned by the router's dispatch path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The router itself is shutting down.
    #[error("router is closed")]
    Closed,

    /// No registered node accepted the command.
    #[error("no node available to accept command")]
    NoAvailableNode,

    /// The command already reached a terminal state.
    #[error("command already completed")]
    AlreadyCompleted,
}

/// Reasons a node connection refuses a command at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueErrorKind {
    /// The connection is CLOSED; submit elsewhere.
    #[error("connection {0} is closed")]
    ClosedConnection(NodeId),

    /// In-flight plus pending would exceed the configured request queue size.
    #[error("request queue full ({0} commands)")]
    QueueFull(usize),

    /// The command already completed or failed and must not be requeued.
    #[error("command already completed")]
    AlreadyCompleted,

    /// The command is already held by this connection.
    #[error("command already queued")]
    AlreadyQueued,

    /// The command is not in the container the operation expected.
    #[error("command not queued in expected container")]
    NotQueued,
}

/// A rejected submission, returning ownership of the command to the caller.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct QueueError {
    pub kind: QueueErrorKind,
    pub command: Command,
}

impl QueueError {
    pub fn new(kind: QueueErrorKind, command: Command) -> Self {
        Self { kind, command }
    }

    /// Take the command back for resubmission.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Errors raised by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Reconnect attempt failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Writing a command to the wire failed.
    #[error("write failed: {0}")]
    Write(String),
}
