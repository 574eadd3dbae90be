//! Shared helpers for node failover integration tests.

use std::sync::{Arc, Mutex, Weak};

use cluster_node::command::{Command, CommandDescriptor, CommandOutcome};
use cluster_node::config::{ClientOptions, PendingHandoff};
use cluster_node::error::RouterError;
use cluster_node::node::{LifecycleState, NodeCommandHandler, TransportEvent};
use cluster_node::router::Router;

/// Router that records every hand-off, or rejects them all.
#[derive(Default)]
pub struct RecordingRouter {
    pub accepted: Mutex<Vec<Command>>,
    pub reject_with: Option<RouterError>,
}

#[allow(dead_code)]
impl RecordingRouter {
    pub fn rejecting(error: RouterError) -> Arc<Self> {
        Arc::new(Self {
            accepted: Mutex::new(Vec::new()),
            reject_with: Some(error),
        })
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.lock().unwrap().len()
    }

    pub fn weak(self: &Arc<Self>) -> Weak<dyn Router> {
        let router: Arc<dyn Router> = self.clone();
        Arc::downgrade(&router)
    }
}

impl Router for RecordingRouter {
    fn dispatch(&self, command: Command) -> Result<(), RouterError> {
        if let Some(err) = &self.reject_with {
            return Err(err.clone());
        }
        self.accepted.lock().unwrap().push(command);
        Ok(())
    }
}

pub fn options(auto_reconnect: bool) -> ClientOptions {
    ClientOptions {
        auto_reconnect,
        ..ClientOptions::default()
    }
}

/// Options that also gate never-sent commands on auto-reconnect.
#[allow(dead_code)]
pub fn gated_options(auto_reconnect: bool) -> ClientOptions {
    ClientOptions {
        pending_handoff: PendingHandoff::FollowAutoReconnect,
        ..options(auto_reconnect)
    }
}

/// Drive a fresh node to `state` through valid transport events.
pub fn drive_to(node: &NodeCommandHandler, state: LifecycleState) {
    use TransportEvent::*;
    let path: &[TransportEvent] = match state {
        LifecycleState::Initializing => &[],
        LifecycleState::Connecting => &[Connecting],
        LifecycleState::Connected => &[Connecting, Connected],
        LifecycleState::Activating => &[Connecting, Connected, Activating],
        LifecycleState::Active => &[Connecting, Connected, Activating, Activated],
        LifecycleState::Disconnected => &[Connecting, Connected, Disconnected],
        LifecycleState::Closed => panic!("drive_to cannot reach Closed"),
    };
    for event in path {
        node.apply_event(*event).unwrap();
    }
}

/// Load `in_flight` written commands followed by `pending` buffered ones.
pub fn load(
    node: &NodeCommandHandler,
    in_flight: usize,
    pending: usize,
) -> Vec<(Command, CommandOutcome)> {
    (0..in_flight + pending)
        .map(|i| {
            let (cmd, outcome) =
                Command::new(CommandDescriptor::new("INCR").arg(format!("counter:{i}")));
            node.enqueue_pending(cmd.clone()).unwrap();
            if i < in_flight {
                node.promote_to_in_flight(cmd.id()).unwrap();
            }
            (cmd, outcome)
        })
        .collect()
}
