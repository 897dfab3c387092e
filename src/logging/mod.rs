//! Logging infrastructure for LPT Défis
//!
//! - process-wide tracing subscriber, installed once
//! - JSONL audit trail of migration runs

pub mod audit;

pub use audit::{AuditEvent, AuditLogger, AuditRecord};

use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set once the global subscriber is installed; lives until process exit
static TRACING_INIT: OnceLock<bool> = OnceLock::new();

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `lpt_defis=<log_level>,info`.
/// Idempotent: later calls are no-ops. Returns true when this call
/// installed the subscriber.
pub fn init_tracing(log_level: &str) -> bool {
    let mut installed_now = false;

    TRACING_INIT.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("lpt_defis={},info", log_level).into());

        // Another subscriber may already be set (e.g. by a test harness)
        installed_now = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_ok();
        true
    });

    installed_now
}
