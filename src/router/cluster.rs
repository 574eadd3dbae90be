//! Round-robin router over the cluster's node connections.
//!
//! # Responsibilities
//! - Register and remove node connections as the topology changes
//! - Spread commands across open nodes, skipping closed ones
//! - Serve as the hand-off target for nodes that close with work queued

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::command::Command;
use crate::config::ClientOptions;
use crate::error::{QueueErrorKind, RouterError};
use crate::node::connection::NodeId;
use crate::node::handler::{CloseReport, NodeCommandHandler};
use crate::router::Router;

/// Routes commands to the registered node connections.
#[derive(Debug, Default)]
pub struct ClusterRouter {
    nodes: DashMap<NodeId, Arc<NodeCommandHandler>>,
    counter: AtomicUsize,
    closed: AtomicBool,
}

impl ClusterRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a node connection that hands its leftovers back to this router,
    /// and register it.
    pub fn add_node(self: &Arc<Self>, options: ClientOptions) -> Arc<NodeCommandHandler> {
        let router: Arc<dyn Router> = self.clone();
        let weak: Weak<dyn Router> = Arc::downgrade(&router);
        let node = Arc::new(NodeCommandHandler::with_router(options, weak));
        self.nodes.insert(node.id(), node.clone());
        tracing::debug!(node_id = %node.id(), "Node registered");
        node
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<NodeCommandHandler>> {
        self.nodes.get(&id).map(|n| n.value().clone())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The topology dropped a node: unregister it, stop its reconnects and
    /// close it so its queued work moves to the remaining nodes.
    pub fn remove_node(&self, id: NodeId) -> Option<CloseReport> {
        let (_, node) = self.nodes.remove(&id)?;
        tracing::info!(node_id = %id, "Node left topology, closing");
        node.prepare_close();
        node.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting commands and close every node. Hand-offs during this
    /// close are rejected, so leftovers fail with `HandoffRejected`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let ids: Vec<NodeId> = self.nodes.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, node)) = self.nodes.remove(&id) {
                node.prepare_close();
                node.close();
            }
        }
        tracing::info!("Cluster router closed");
    }

    /// Snapshot of open candidates in stable order, taken without holding
    /// any map lock afterwards.
    fn candidates(&self) -> Vec<Arc<NodeCommandHandler>> {
        let mut nodes: Vec<_> = self
            .nodes
            .iter()
            .filter(|e| !e.value().is_closed())
            .map(|e| e.value().clone())
            .collect();
        nodes.sort_by_key(|n| n.id());
        nodes
    }
}

impl Router for ClusterRouter {
    fn dispatch(&self, command: Command) -> Result<(), RouterError> {
        if self.is_closed() {
            return Err(RouterError::Closed);
        }
        if command.is_done() {
            return Err(RouterError::AlreadyCompleted);
        }

        let nodes = self.candidates();
        if nodes.is_empty() {
            return Err(RouterError::NoAvailableNode);
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut command = command;
        for i in 0..nodes.len() {
            let node = &nodes[(start + i) % nodes.len()];
            match node.write(command) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if e.kind == QueueErrorKind::AlreadyCompleted {
                        return Err(RouterError::AlreadyCompleted);
                    }
                    tracing::debug!(node_id = %node.id(), reason = %e.kind, "Node refused command, trying next");
                    command = e.into_command();
                }
            }
        }
        Err(RouterError::NoAvailableNode)
    }
}
