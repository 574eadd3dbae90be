//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML or JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → ClientOptions cloned into every NodeCommandHandler
//! ```
//!
//! # Design Decisions
//! - Options are read-only to a node once it is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::ClientOptions;
pub use schema::ObservabilityConfig;
pub use schema::PendingHandoff;
pub use schema::ReconnectConfig;
