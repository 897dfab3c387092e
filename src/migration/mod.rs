//! Anonymous participation migration
//!
//! - **Detector**: is there anything to migrate for this session?
//! - **Engine**: merge anonymous records into the user's participations
//! - **Coordinator**: session-start entry point, store cleanup, notifications
//!
//! The detector and engine return data; only the coordinator decides what
//! the user sees.

pub mod coordinator;
pub mod detector;
pub mod engine;
pub mod outcome;

pub use coordinator::MigrationCoordinator;
pub use detector::MigrationDetector;
pub use engine::{EngineConfig, ReconciliationEngine};
pub use outcome::{MigrationOutcome, MigrationStatus, RecordFailure};
