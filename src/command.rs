//! Commands and their completion state.
//!
//! A [`Command`] is a cheap, cloneable handle. Every clone points to the same
//! completion slot, so whichever container or router holds it, the command
//! reaches its terminal state at most once.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::CommandError;

/// Result delivered through a command's completion channel.
pub type CommandResult = Result<Vec<u8>, CommandError>;

/// Unique identifier for a command, stable across hand-offs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0.simple())
    }
}

/// Target operation descriptor. Opaque to the node core; the wire encoder
/// is the only consumer of `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    pub args: Vec<Vec<u8>>,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Completion state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Pending = 0,
    Completed = 1,
    Failed = 2,
}

impl From<u8> for CompletionState {
    fn from(val: u8) -> Self {
        match val {
            1 => CompletionState::Completed,
            2 => CompletionState::Failed,
            _ => CompletionState::Pending,
        }
    }
}

#[derive(Debug)]
struct CommandInner {
    id: CommandId,
    descriptor: CommandDescriptor,
    state: AtomicU8,
    error: Mutex<Option<CommandError>>,
    callback: Mutex<Option<oneshot::Sender<CommandResult>>>,
}

/// A unit of work carrying its own completion callback.
#[derive(Debug, Clone)]
pub struct Command {
    inner: Arc<CommandInner>,
}

impl Command {
    /// Create a command and the receiver its outcome will be delivered to.
    pub fn new(descriptor: CommandDescriptor) -> (Self, CommandOutcome) {
        let (tx, rx) = oneshot::channel();
        let command = Self {
            inner: Arc::new(CommandInner {
                id: CommandId::new(),
                descriptor,
                state: AtomicU8::new(CompletionState::Pending as u8),
                error: Mutex::new(None),
                callback: Mutex::new(Some(tx)),
            }),
        };
        (command, CommandOutcome { rx })
    }

    pub fn id(&self) -> CommandId {
        self.inner.id
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.inner.descriptor
    }

    pub fn state(&self) -> CompletionState {
        CompletionState::from(self.inner.state.load(Ordering::Acquire))
    }

    /// True once the command completed or failed.
    pub fn is_done(&self) -> bool {
        self.state() != CompletionState::Pending
    }

    /// Error recorded by [`Command::fail`], if any. Always `Some` once
    /// [`Command::state`] reads `Failed`.
    pub fn error(&self) -> Option<CommandError> {
        self.lock_error().clone()
    }

    /// Mark completed with the response payload.
    /// Returns false if the command had already reached a terminal state.
    pub fn complete(&self, output: Vec<u8>) -> bool {
        if !self.transition(CompletionState::Completed) {
            return false;
        }
        self.deliver(Ok(output));
        true
    }

    /// Mark failed with `error`.
    /// Returns false if the command had already reached a terminal state.
    pub fn fail(&self, error: CommandError) -> bool {
        {
            // The state flips while the error slot is held, so a reader that
            // sees `Failed` blocks in `error()` until the error is stored.
            let mut slot = self.lock_error();
            if !self.transition(CompletionState::Failed) {
                return false;
            }
            *slot = Some(error.clone());
        }
        self.deliver(Err(error));
        true
    }

    fn lock_error(&self) -> MutexGuard<'_, Option<CommandError>> {
        self.inner.error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, to: CompletionState) -> bool {
        self.inner
            .state
            .compare_exchange(
                CompletionState::Pending as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn deliver(&self, result: CommandResult) {
        let sender = self
            .inner
            .callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(tx) = sender {
            // Receiver may have been dropped by a caller that stopped waiting.
            let _ = tx.send(result);
        }
    }
}

/// Receiving side of a command's completion callback.
#[derive(Debug)]
pub struct CommandOutcome {
    rx: oneshot::Receiver<CommandResult>,
}

impl CommandOutcome {
    /// Wait for the command's terminal outcome.
    ///
    /// A command dropped without ever completing is reported as
    /// [`CommandError::ConnectionClosed`].
    pub async fn wait(self) -> CommandResult {
        self.rx.await.unwrap_or(Err(CommandError::ConnectionClosed))
    }

    /// Non-blocking poll. `None` while the command is still pending.
    pub fn try_result(&mut self) -> Option<CommandResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CommandError::ConnectionClosed)),
        }
    }
}
