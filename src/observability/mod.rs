//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Node core produces:
//!     → logging.rs (structured tracing events: transitions, close, hand-off)
//!     → metrics.rs (hand-off / fail-in-place counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
