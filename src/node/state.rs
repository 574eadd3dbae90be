//! Node connection lifecycle state machine.
//!
//! # States
//! ```text
//! Initializing → Connecting → Connected → Activating → Active
//!                    ↑  │         │            │          │
//!                    │  └─────────┴────────────┴──────────┤
//!                    │                                    ▼
//!                    └──────────────────────────── Disconnected
//!
//! any state except Closed ──close()──▶ Closed (terminal)
//! ```
//!
//! # Design Decisions
//! - Transitions are driven by transport events; the core itself only ever
//!   moves a connection to Closed
//! - Stored as an atomic so readers never block dispatch or delivery
//! - `Connected`, `Activating` and `Active` form the "open" subset: a
//!   response for an in-flight command may still arrive

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

/// Lifecycle phase of a node connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Initializing = 0,
    Connecting = 1,
    Connected = 2,
    Activating = 3,
    Active = 4,
    Disconnected = 5,
    Closed = 6,
}

impl LifecycleState {
    /// Whether the connection is presumed able to finish in-flight work.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            LifecycleState::Connected | LifecycleState::Activating | LifecycleState::Active
        )
    }

    fn can_advance_to(self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, to),
            (Initializing, Connecting)
                | (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connected, Activating)
                | (Activating, Active)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
                | (Activating, Disconnected)
                | (Active, Disconnected)
        )
    }
}

impl From<u8> for LifecycleState {
    fn from(val: u8) -> Self {
        match val {
            1 => LifecycleState::Connecting,
            2 => LifecycleState::Connected,
            3 => LifecycleState::Activating,
            4 => LifecycleState::Active,
            5 => LifecycleState::Disconnected,
            6 => LifecycleState::Closed,
            _ => LifecycleState::Initializing,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Initializing => "INITIALIZING",
            LifecycleState::Connecting => "CONNECTING",
            LifecycleState::Connected => "CONNECTED",
            LifecycleState::Activating => "ACTIVATING",
            LifecycleState::Active => "ACTIVE",
            LifecycleState::Disconnected => "DISCONNECTED",
            LifecycleState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Events reported by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// A (re)connect attempt started.
    Connecting,
    /// The socket is established.
    Connected,
    /// Connection handshake (auth, select, ...) started.
    Activating,
    /// Handshake finished; commands may be written.
    Activated,
    /// The transport stopped.
    Disconnected,
}

impl TransportEvent {
    pub fn target(self) -> LifecycleState {
        match self {
            TransportEvent::Connecting => LifecycleState::Connecting,
            TransportEvent::Connected => LifecycleState::Connected,
            TransportEvent::Activating => LifecycleState::Activating,
            TransportEvent::Activated => LifecycleState::Active,
            TransportEvent::Disconnected => LifecycleState::Disconnected,
        }
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Atomic lifecycle state holder.
#[derive(Debug)]
pub struct LifecycleStateMachine {
    state: AtomicU8,
}

impl LifecycleStateMachine {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Initializing as u8),
        }
    }

    pub fn current(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.current().is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.current() == LifecycleState::Closed
    }

    /// Apply a transport event. Returns the previous state.
    pub fn apply(&self, event: TransportEvent) -> Result<LifecycleState, TransitionError> {
        let to = event.target();
        let mut from = self.current();
        loop {
            if !from.can_advance_to(to) {
                return Err(TransitionError { from, to });
            }
            match self.state.compare_exchange_weak(
                from as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => from = LifecycleState::from(actual),
            }
        }
    }

    /// Move to Closed. Returns the state observed just before closing, or
    /// `None` if the connection was already closed. The `Some` result is the
    /// gate that lets a close run exactly once.
    pub fn close(&self) -> Option<LifecycleState> {
        let prev = LifecycleState::from(
            self.state
                .swap(LifecycleState::Closed as u8, Ordering::AcqRel),
        );
        (prev != LifecycleState::Closed).then_some(prev)
    }
}

impl Default for LifecycleStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_subset() {
        use LifecycleState::*;
        for s in [Connected, Activating, Active] {
            assert!(s.is_open(), "{s} should be open");
        }
        for s in [Initializing, Connecting, Disconnected, Closed] {
            assert!(!s.is_open(), "{s} should not be open");
        }
    }

    #[test]
    fn test_forward_path() {
        let sm = LifecycleStateMachine::new();
        for event in [
            TransportEvent::Connecting,
            TransportEvent::Connected,
            TransportEvent::Activating,
            TransportEvent::Activated,
        ] {
            sm.apply(event).unwrap();
        }
        assert_eq!(sm.current(), LifecycleState::Active);
        assert!(sm.is_open());
    }

    #[test]
    fn test_reconnect_cycle() {
        let sm = LifecycleStateMachine::new();
        sm.apply(TransportEvent::Connecting).unwrap();
        sm.apply(TransportEvent::Disconnected).unwrap();
        sm.apply(TransportEvent::Connecting).unwrap();
        sm.apply(TransportEvent::Disconnected).unwrap();
        assert_eq!(sm.current(), LifecycleState::Disconnected);
    }

    #[test]
    fn test_rejects_skipping_forward() {
        let sm = LifecycleStateMachine::new();
        let err = sm.apply(TransportEvent::Activated).unwrap_err();
        assert_eq!(err.from, LifecycleState::Initializing);
        assert_eq!(err.to, LifecycleState::Active);
        assert_eq!(sm.current(), LifecycleState::Initializing);
    }

    #[test]
    fn test_closed_is_terminal() {
        let sm = LifecycleStateMachine::new();
        sm.apply(TransportEvent::Connecting).unwrap();

        assert_eq!(sm.close(), Some(LifecycleState::Connecting));
        assert_eq!(sm.close(), None);
        assert!(sm.apply(TransportEvent::Connecting).is_err());
        assert!(sm.is_closed());
    }
}
