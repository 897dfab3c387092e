//! Result of one reconciliation run

use serde::{Deserialize, Serialize};

/// Overall status of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStatus {
    /// Nothing was pending
    NoneFound,
    /// Every record was migrated or skipped as a duplicate
    Success,
    /// Some records failed, others were processed
    Partial,
    /// Every record failed
    Failed,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoneFound => "NONE_FOUND",
            Self::Success => "SUCCESS",
            Self::Partial => "PARTIAL",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// A record that could not be reconciled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    pub local_id: String,
    pub challenge_id: String,
    pub reason: String,
}

/// Accumulated outcome of [`super::ReconciliationEngine::migrate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub migrated_count: u32,
    pub skipped_count: u32,
    pub failed_count: u32,
    pub status: MigrationStatus,
    /// Local ids that were migrated or skipped; safe to remove locally
    pub processed: Vec<String>,
    pub failures: Vec<RecordFailure>,
}

impl MigrationOutcome {
    /// Outcome for an empty pending list
    pub fn none_found() -> Self {
        Self {
            migrated_count: 0,
            skipped_count: 0,
            failed_count: 0,
            status: MigrationStatus::NoneFound,
            processed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn record_migrated(&mut self, local_id: String) {
        self.migrated_count += 1;
        self.processed.push(local_id);
    }

    pub(crate) fn record_skipped(&mut self, local_id: String) {
        self.skipped_count += 1;
        self.processed.push(local_id);
    }

    pub(crate) fn record_failed(&mut self, failure: RecordFailure) {
        self.failed_count += 1;
        self.failures.push(failure);
    }

    /// Derive the status from the counters
    pub(crate) fn finish(mut self) -> Self {
        let succeeded = self.migrated_count + self.skipped_count;
        self.status = match (succeeded, self.failed_count) {
            (0, 0) => MigrationStatus::NoneFound,
            (_, 0) => MigrationStatus::Success,
            (0, _) => MigrationStatus::Failed,
            _ => MigrationStatus::Partial,
        };
        self
    }

    /// Whether the local store should drop the processed records
    pub fn should_clear(&self) -> bool {
        matches!(self.status, MigrationStatus::Success | MigrationStatus::Partial)
            && !self.processed.is_empty()
    }
}
