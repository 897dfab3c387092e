//! Migration audit trail
//!
//! Writes one JSON object per line. Each event kind has its own typed
//! fields; there is no free-form metadata bag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::migration::MigrationStatus;
use crate::types::ParticipationSource;

/// Audit event kinds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    MigrationStarted {
        pending: u32,
    },
    RecordMigrated {
        local_id: String,
        challenge_id: String,
        participation_id: String,
    },
    RecordSkipped {
        local_id: String,
        challenge_id: String,
        existing_source: Option<ParticipationSource>,
    },
    RecordFailed {
        local_id: String,
        challenge_id: String,
        reason: String,
    },
    MigrationFinished {
        status: MigrationStatus,
        migrated: u32,
        skipped: u32,
        failed: u32,
        duration_ms: u64,
    },
}

/// One line of the audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditRecord {
    pub fn new(user_id: &str, event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            event,
        }
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger appending to a JSONL file
///
/// Without a file every call is a no-op.
#[derive(Clone, Default)]
pub struct AuditLogger {
    inner: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl AuditLogger {
    /// Logger that discards everything
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Logger appending to `path`
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Audit logging initialized to {}", path.display());

        Ok(Self {
            inner: Arc::new(Mutex::new(Some(BufWriter::new(file)))),
        })
    }

    /// Append an event for a user
    pub async fn log(&self, user_id: &str, event: AuditEvent) {
        let mut inner = self.inner.lock().await;
        let Some(writer) = inner.as_mut() else {
            return;
        };

        let line = match AuditRecord::new(user_id, event).to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(writer, "{}", line) {
            error!("Failed to write audit event: {}", e);
        }
        if let Err(e) = writer.flush() {
            error!("Failed to flush audit log: {}", e);
        }
    }
}
