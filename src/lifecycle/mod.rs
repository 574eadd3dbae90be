//! Lifecycle management for background tasks.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Client teardown → trigger → watchdog loops exit
//!     → nodes closed (pending work handed off or failed)
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
