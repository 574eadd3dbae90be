//! Resilience helpers for the transport layer.
//!
//! # Data Flow
//! ```text
//! Transport disconnect:
//!     → ConnectionWatchdog wakes
//!     → backoff.rs (delay before each reconnect attempt)
//!     → connect routine
//! ```
//!
//! # Design Decisions
//! - The node core never retries; reconnect pacing is the watchdog's job
//! - Jittered backoff prevents every node reconnecting at once

pub mod backoff;
