//! cluster-node: failover scenario runner.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller ──▶ ClusterRouter ──round-robin──▶ NodeCommandHandler ──▶ Channel ──▶ node
//!                   ▲                              │   ▲
//!                   │                              │   └── TransportEvent (state machine)
//!                   └──────── hand-off on close ───┘
//!                                                  │
//!                              prepare_close ──▶ ConnectionWatchdog (suspend reconnect)
//! ```
//!
//! `simulate` loads a node with in-flight and pending commands, closes it
//! and reports what happened to every command. `check-config` validates a
//! configuration file.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use cluster_node::command::{Command, CommandDescriptor, CommandOutcome};
use cluster_node::config::{load_config, ClientConfig, PendingHandoff};
use cluster_node::error::TransportError;
use cluster_node::lifecycle::Shutdown;
use cluster_node::node::{LifecycleState, NodeCommandHandler, TransportEvent};
use cluster_node::observability::{logging, metrics};
use cluster_node::router::ClusterRouter;
use cluster_node::transport::{Channel, ConnectionWatchdog, SuspendReconnect, Transport};

#[derive(Parser)]
#[command(name = "cluster-node")]
#[command(about = "Node connection failover scenarios", long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Close a loaded node and report every command's outcome
    Simulate {
        /// Lifecycle state of the node when it closes
        #[arg(long, value_enum, default_value_t = StateArg::Active)]
        state: StateArg,
        /// Commands already written and awaiting a response
        #[arg(long, default_value_t = 3)]
        in_flight: usize,
        /// Commands accepted but not yet written
        #[arg(long, default_value_t = 2)]
        pending: usize,
        /// Override the configured auto-reconnect flag
        #[arg(long)]
        auto_reconnect: Option<bool>,
        /// Fail pending commands in place when auto-reconnect is off
        #[arg(long)]
        gate_pending_on_reconnect: bool,
        /// Close a bootstrap node that has no router
        #[arg(long)]
        no_router: bool,
        /// Surviving nodes available to take hand-offs
        #[arg(long, default_value_t = 1)]
        survivors: usize,
    },
    /// Validate a configuration file
    CheckConfig { path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StateArg {
    Initializing,
    Connecting,
    Connected,
    Activating,
    Active,
    Disconnected,
}

impl StateArg {
    fn path(self) -> &'static [TransportEvent] {
        use TransportEvent::*;
        match self {
            StateArg::Initializing => &[],
            StateArg::Connecting => &[Connecting],
            StateArg::Connected => &[Connecting, Connected],
            StateArg::Activating => &[Connecting, Connected, Activating],
            StateArg::Active => &[Connecting, Connected, Activating, Activated],
            StateArg::Disconnected => &[Connecting, Connected, Disconnected],
        }
    }
}

/// Transport that accepts every write and exposes a reconnect watchdog.
#[derive(Debug)]
struct LoopbackTransport {
    watchdog: Arc<ConnectionWatchdog>,
}

impl Transport for LoopbackTransport {
    fn write(&self, _command: &Command) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&self) {}

    fn watchdog(&self) -> Option<Arc<dyn SuspendReconnect>> {
        Some(self.watchdog.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    logging::init_logging(&config.observability);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::CheckConfig { path } => {
            let checked = load_config(&path)?;
            println!("{} is valid", path.display());
            println!("{}", serde_json::to_string_pretty(&checked)?);
        }
        Commands::Simulate {
            state,
            in_flight,
            pending,
            auto_reconnect,
            gate_pending_on_reconnect,
            no_router,
            survivors,
        } => {
            let mut options = config.client.clone();
            if let Some(flag) = auto_reconnect {
                options.auto_reconnect = flag;
            }
            if gate_pending_on_reconnect {
                options.pending_handoff = PendingHandoff::FollowAutoReconnect;
            }

            let shutdown = Shutdown::new();
            let router = ClusterRouter::new();
            for _ in 0..survivors {
                router.add_node(config.client.clone());
            }

            let node = if no_router {
                Arc::new(NodeCommandHandler::new(options))
            } else {
                router.add_node(options)
            };

            let watchdog = ConnectionWatchdog::new(config.reconnect.clone());
            let reconnect_node = node.clone();
            let watchdog_task = tokio::spawn(watchdog.clone().run(
                move || {
                    let node = reconnect_node.clone();
                    async move {
                        node.apply_event(TransportEvent::Connecting)
                            .map_err(|e| TransportError::Connect(e.to_string()))?;
                        Ok::<(), TransportError>(())
                    }
                },
                shutdown.subscribe(),
            ));

            for event in state.path() {
                node.apply_event(*event)?;
            }
            node.attach_channel(Channel::new(LoopbackTransport {
                watchdog: watchdog.clone(),
            }));

            let outcomes = load(&node, in_flight, pending)?;
            tracing::info!(
                node_id = %node.id(),
                state = %node.state(),
                in_flight,
                pending,
                "Closing node"
            );

            let report = if no_router {
                node.prepare_close();
                node.close()
            } else {
                router.remove_node(node.id())
            };

            shutdown.trigger();
            let exit = watchdog_task.await?;

            println!("reconnect watchdog: {exit:?}");
            match report {
                Some(report) => {
                    println!("closed from {}", report.previous_state);
                    println!("  handed off:      {}", report.handed_off);
                    println!("  failed in place: {}", report.failed_in_place);
                    println!("  rejected:        {}", report.rejected);
                    println!("  skipped:         {}", report.skipped);
                }
                None => println!("node was already closed"),
            }
            for (i, mut outcome) in outcomes.into_iter().enumerate() {
                let result = match outcome.try_result() {
                    Some(Ok(_)) => "completed".to_string(),
                    Some(Err(e)) => format!("failed: {e}"),
                    None => "handed off, awaiting response".to_string(),
                };
                println!("  command {i}: {result}");
            }
            debug_assert_eq!(node.state(), LifecycleState::Closed);
        }
    }

    Ok(())
}

fn load(
    node: &NodeCommandHandler,
    in_flight: usize,
    pending: usize,
) -> Result<Vec<CommandOutcome>, Box<dyn std::error::Error>> {
    let mut outcomes = Vec::with_capacity(in_flight + pending);
    for i in 0..in_flight + pending {
        let (command, outcome) = Command::new(CommandDescriptor::new("SET").arg(format!("key:{i}")).arg("v"));
        let id = command.id();
        node.enqueue_pending(command)?;
        if i < in_flight {
            node.promote_to_in_flight(id)?;
        }
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
