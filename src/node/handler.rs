//! Node command handler: the per-node command lifecycle and failover core.
//!
//! # Responsibilities
//! - Accept commands into the pending buffer and move them to the in-flight
//!   queue as they are written
//! - Complete in-flight commands as responses arrive
//! - On close, dispose of every queued and buffered command exactly once:
//!   hand it to the router or fail it in place
//! - Suspend the transport's reconnect watchdog before an intentional
//!   teardown
//!
//! # Close algorithm
//! ```text
//! lock queues
//!     → state := CLOSED (gate, at most once)
//!     → take both containers
//! unlock
//! router gone?          → fail everything with ConnectionClosed
//! in-flight eligible    = auto_reconnect && previous state not open
//! pending eligible      = per PendingHandoff policy
//! eligible              → Router::dispatch, rejection fails the command
//! not eligible          → fail with ConnectionClosed
//! close transport
//! ```
//!
//! # Design Decisions
//! - The queue mutex is the only mutual-exclusion region; hand-off runs
//!   outside it because the router may write back into this node
//! - Transport writes run outside it too, so a slow socket never holds up
//!   response delivery
//! - Router presence and reconnect policy are independent inputs combined
//!   with AND
//! - Commands already completed are skipped by completion state, never by
//!   container membership

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arc_swap::ArcSwapOption;

use crate::command::{Command, CommandId, CommandResult};
use crate::config::{ClientOptions, PendingHandoff};
use crate::error::{CommandError, QueueError, QueueErrorKind};
use crate::node::connection::{ConnectionId, NodeId};
use crate::node::queue::{CommandQueues, Drained};
use crate::node::state::{LifecycleState, LifecycleStateMachine, TransitionError, TransportEvent};
use crate::observability::metrics;
use crate::router::Router;
use crate::transport::Channel;

/// How a close disposed of the commands it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    /// State observed right before the connection moved to CLOSED.
    pub previous_state: LifecycleState,
    /// Accepted by the router.
    pub handed_off: usize,
    /// Failed here with `ConnectionClosed`.
    pub failed_in_place: usize,
    /// Router refused; failed with `HandoffRejected`.
    pub rejected: usize,
    /// Already completed elsewhere; left untouched.
    pub skipped: usize,
}

impl CloseReport {
    fn new(previous_state: LifecycleState) -> Self {
        Self {
            previous_state,
            handed_off: 0,
            failed_in_place: 0,
            rejected: 0,
            skipped: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.handed_off + self.failed_in_place + self.rejected + self.skipped
    }
}

/// One logical node connection.
pub struct NodeCommandHandler {
    id: NodeId,
    options: ClientOptions,
    state: LifecycleStateMachine,
    queues: Mutex<CommandQueues>,
    channel: ArcSwapOption<Channel>,
    router: Option<Weak<dyn Router>>,
}

impl NodeCommandHandler {
    /// A node without a router, e.g. a bootstrap-only connection. Everything
    /// it holds at close fails in place.
    pub fn new(options: ClientOptions) -> Self {
        Self::build(options, None)
    }

    /// A node whose leftovers can be handed to `router` on close.
    pub fn with_router(options: ClientOptions, router: Weak<dyn Router>) -> Self {
        Self::build(options, Some(router))
    }

    fn build(options: ClientOptions, router: Option<Weak<dyn Router>>) -> Self {
        Self {
            id: NodeId::new(),
            queues: Mutex::new(CommandQueues::new(options.request_queue_size)),
            options,
            state: LifecycleStateMachine::new(),
            channel: ArcSwapOption::empty(),
            router,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.state.current()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Apply a transport event to the lifecycle state machine.
    pub fn apply_event(&self, event: TransportEvent) -> Result<LifecycleState, TransitionError> {
        let from = self.state.apply(event)?;
        tracing::debug!(node_id = %self.id, %from, to = %event.target(), "Lifecycle transition");
        Ok(from)
    }

    /// Install the live transport. A channel attached after close is closed
    /// right away and `None` is returned.
    pub fn attach_channel(&self, channel: Channel) -> Option<ConnectionId> {
        let id = channel.id();
        if let Some(old) = self.channel.swap(Some(Arc::new(channel))) {
            old.close();
        }
        if self.state.is_closed() {
            if let Some(ch) = self.channel.swap(None) {
                ch.close();
            }
            return None;
        }
        tracing::debug!(node_id = %self.id, connection_id = %id, "Channel attached");
        Some(id)
    }

    /// Drop the live transport handle, e.g. after the socket went away.
    pub fn detach_channel(&self) -> Option<Arc<Channel>> {
        self.channel.swap(None)
    }

    /// Mark the connection ACTIVE and flush the pending buffer to the
    /// transport. Returns how many commands were written.
    pub fn activated(&self) -> Result<usize, TransitionError> {
        self.apply_event(TransportEvent::Activated)?;
        Ok(self.flush_pending(self.lock_queues()))
    }

    /// Submit a command: written straight away when ACTIVE with a live
    /// channel, buffered otherwise.
    pub fn write(&self, command: Command) -> Result<(), QueueError> {
        let mut queues = self.lock_queues();
        if self.state.is_closed() {
            return Err(QueueError::new(QueueErrorKind::ClosedConnection(self.id), command));
        }
        queues.push_pending(command)?;
        if self.state.current() == LifecycleState::Active {
            self.flush_pending(queues);
        }
        Ok(())
    }

    /// Append to the pending buffer without attempting a write.
    pub fn enqueue_pending(&self, command: Command) -> Result<(), QueueError> {
        let mut queues = self.lock_queues();
        if self.state.is_closed() {
            return Err(QueueError::new(QueueErrorKind::ClosedConnection(self.id), command));
        }
        queues.push_pending(command)
    }

    /// Move a pending command to the in-flight queue at send time.
    pub fn promote_to_in_flight(&self, id: CommandId) -> Result<Command, QueueErrorKind> {
        self.lock_queues().promote(id)
    }

    /// Remove an in-flight command and deliver its response.
    pub fn complete_in_flight(&self, id: CommandId, result: CommandResult) -> Result<(), QueueErrorKind> {
        let command = self.lock_queues().take_in_flight(id)?;
        let delivered = match result {
            Ok(output) => command.complete(output),
            Err(error) => command.fail(error),
        };
        if !delivered {
            tracing::trace!(node_id = %self.id, command_id = %id, "Response for already completed command");
        }
        Ok(())
    }

    /// Oldest in-flight command; responses arrive in dispatch order.
    pub fn next_in_flight(&self) -> Option<CommandId> {
        self.lock_queues().front_in_flight()
    }

    /// True iff no command is pending or in flight.
    pub fn is_queue_empty(&self) -> bool {
        self.lock_queues().is_empty()
    }

    /// `(in_flight, pending)` counts.
    pub fn queue_depth(&self) -> (usize, usize) {
        let queues = self.lock_queues();
        (queues.in_flight_len(), queues.pending_len())
    }

    /// Ask the transport's reconnect watchdog, if any, to stop reconnecting.
    /// Used before tearing the node down for good.
    pub fn prepare_close(&self) {
        let Some(channel) = self.channel.load_full() else {
            return;
        };
        if let Some(watchdog) = channel.watchdog() {
            watchdog.suspend_reconnect();
            metrics::record_reconnect_suspended(self.id);
            tracing::info!(
                node_id = %self.id,
                connection_id = %channel.id(),
                "Reconnect suspended ahead of close"
            );
        }
    }

    /// Close the connection, disposing of every queued and buffered command.
    /// Returns `None` when the connection was already closed.
    pub fn close(&self) -> Option<CloseReport> {
        tracing::debug!(node_id = %self.id, "close()");

        let (previous_state, drained) = {
            let mut queues = self.lock_queues();
            let previous_state = self.state.close()?;
            (previous_state, queues.drain())
        };

        let report = self.dispose(previous_state, drained);

        if let Some(channel) = self.channel.swap(None) {
            channel.close();
        }

        metrics::record_close(self.id, &report);
        tracing::debug!(
            node_id = %self.id,
            previous_state = %report.previous_state,
            handed_off = report.handed_off,
            failed_in_place = report.failed_in_place,
            rejected = report.rejected,
            skipped = report.skipped,
            "Node connection closed"
        );
        Some(report)
    }

    fn dispose(&self, previous_state: LifecycleState, drained: Drained) -> CloseReport {
        let mut report = CloseReport::new(previous_state);

        let Some(router) = self.router.as_ref().and_then(Weak::upgrade) else {
            for command in drained.in_flight.into_iter().chain(drained.pending) {
                self.fail_in_place(command, &mut report);
            }
            return report;
        };

        let policy_permits = self.options.auto_reconnect;
        // A response may still be on its way over an open connection.
        let in_flight_eligible = policy_permits && !previous_state.is_open();
        let pending_eligible = match self.options.pending_handoff {
            PendingHandoff::Always => true,
            PendingHandoff::FollowAutoReconnect => policy_permits,
        };

        for command in drained.in_flight {
            if in_flight_eligible {
                self.hand_off(router.as_ref(), command, &mut report);
            } else {
                self.fail_in_place(command, &mut report);
            }
        }
        for command in drained.pending {
            if pending_eligible {
                self.hand_off(router.as_ref(), command, &mut report);
            } else {
                self.fail_in_place(command, &mut report);
            }
        }

        report
    }

    fn hand_off(&self, router: &dyn Router, command: Command, report: &mut CloseReport) {
        if command.is_done() {
            report.skipped += 1;
            return;
        }
        match router.dispatch(command.clone()) {
            Ok(()) => report.handed_off += 1,
            Err(error) => {
                tracing::warn!(
                    node_id = %self.id,
                    command_id = %command.id(),
                    error = %error,
                    "Hand-off rejected, failing command"
                );
                if command.fail(CommandError::HandoffRejected(error)) {
                    report.rejected += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }
    }

    fn fail_in_place(&self, command: Command, report: &mut CloseReport) {
        if command.fail(CommandError::ConnectionClosed) {
            report.failed_in_place += 1;
        } else {
            report.skipped += 1;
        }
    }

    /// Promote the whole pending buffer under the lock, then write it with
    /// the lock released. On a write error the unwritten tail goes back to
    /// the front of the pending buffer in its original order.
    fn flush_pending(&self, mut queues: MutexGuard<'_, CommandQueues>) -> usize {
        let Some(channel) = self.channel.load_full() else {
            return 0;
        };
        let mut batch = Vec::with_capacity(queues.pending_len());
        while let Some(id) = queues.front_pending() {
            match queues.promote(id) {
                Ok(command) => batch.push(command),
                Err(_) => break,
            }
        }
        drop(queues);

        for (written, command) in batch.iter().enumerate() {
            if let Err(error) = channel.write(command) {
                tracing::warn!(
                    node_id = %self.id,
                    command_id = %command.id(),
                    error = %error,
                    unwritten = batch.len() - written,
                    "Write failed, keeping commands buffered"
                );
                // A close that ran meanwhile already drained these; demote
                // then reports NotQueued and there is nothing to restore.
                let mut queues = self.lock_queues();
                for unwritten in batch[written..].iter().rev() {
                    let _ = queues.demote(unwritten.id());
                }
                return written;
            }
        }
        batch.len()
    }

    fn lock_queues(&self) -> MutexGuard<'_, CommandQueues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for NodeCommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCommandHandler")
            .field("id", &self.id)
            .field("state", &self.state.current())
            .field("auto_reconnect", &self.options.auto_reconnect)
            .field("has_router", &self.router.is_some())
            .finish_non_exhaustive()
    }
}
