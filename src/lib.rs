//! LPT Défis - anonymous participation reconciliation
//!
//! Visitors can take part in coding challenges before signing in. Their
//! participations are kept in a local anonymous store and moved into their
//! account the first time a signed-in session starts.
//!
//! ## Components
//!
//! - **Anonymous**: local store of pre-sign-in participations
//! - **Migration**: detector, reconciliation engine and session-start coordinator
//! - **Persistence**: authoritative participation repository (MongoDB or memory)
//! - **Session**: identity providers (JWT bearer token or static)
//! - **Notify**: user-facing notification surfaces
//! - **Logging**: tracing setup and JSONL audit trail

pub mod anonymous;
pub mod config;
pub mod db;
pub mod logging;
pub mod migration;
pub mod notify;
pub mod persistence;
pub mod session;
pub mod types;

pub use config::Args;
pub use migration::{MigrationCoordinator, MigrationOutcome, MigrationStatus};
pub use types::{DefisError, Result};
