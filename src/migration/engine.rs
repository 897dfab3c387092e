//! Reconciliation engine
//!
//! Moves anonymous participations into a signed-in user's participation set.
//!
//! For each pending record, in the order given:
//!
//! ```text
//! find(user, challenge) ──► found ──────────────► skip (direct wins)
//!        │
//!        └─► none ──► create(MIGRATED) ──► ok ──► migrated
//!                            │
//!                            └─► conflict ──────► skip (lost a race)
//! ```
//!
//! Any other error, including a timeout, fails only that record. Records are
//! handled one after another so a later duplicate always sees the record an
//! earlier one created.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::logging::{AuditEvent, AuditLogger};
use crate::persistence::ParticipationRepository;
use crate::types::{
    AnonymousParticipation, AuthenticatedParticipation, DefisError, Identity, NewParticipation,
    ParticipationSource, Result,
};

use super::outcome::{MigrationOutcome, RecordFailure};

/// Configuration for the reconciliation engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout applied to each persistence call
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// What happened to a single record
enum RecordResult {
    Migrated(AuthenticatedParticipation),
    /// Existing source is unknown when the create lost a race
    Skipped(Option<ParticipationSource>),
}

pub struct ReconciliationEngine {
    config: EngineConfig,
    repository: Arc<dyn ParticipationRepository>,
    audit: AuditLogger,
}

impl ReconciliationEngine {
    pub fn new(config: EngineConfig, repository: Arc<dyn ParticipationRepository>) -> Self {
        Self {
            config,
            repository,
            audit: AuditLogger::disabled(),
        }
    }

    /// Record every run in the given audit log
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Migrate `pending` into the participations of `identity`
    ///
    /// Fails only with [`DefisError::InvalidIdentity`]; per-record failures
    /// are reported in the outcome.
    pub async fn migrate(
        &self,
        identity: Option<&Identity>,
        pending: Vec<AnonymousParticipation>,
    ) -> Result<MigrationOutcome> {
        let identity = match identity {
            Some(identity) if identity.can_migrate() => identity,
            Some(identity) => {
                return Err(DefisError::InvalidIdentity(format!(
                    "session '{}' is not authenticated",
                    identity.id
                )))
            }
            None => return Err(DefisError::InvalidIdentity("no session".into())),
        };

        if pending.is_empty() {
            debug!(user_id = %identity.id, "No anonymous participations to migrate");
            return Ok(MigrationOutcome::none_found());
        }

        let user_id = identity.id.as_str();
        let started = Instant::now();
        info!(user_id = %user_id, pending = pending.len(), "Starting participation migration");
        self.audit
            .log(
                user_id,
                AuditEvent::MigrationStarted {
                    pending: pending.len() as u32,
                },
            )
            .await;

        let mut outcome = MigrationOutcome::none_found();

        for record in pending {
            match self.reconcile_one(user_id, &record).await {
                Ok(RecordResult::Migrated(participation)) => {
                    debug!(
                        user_id = %user_id,
                        challenge_id = %record.challenge_id,
                        participation_id = %participation.id,
                        "Participation migrated"
                    );
                    self.audit
                        .log(
                            user_id,
                            AuditEvent::RecordMigrated {
                                local_id: record.local_id.clone(),
                                challenge_id: record.challenge_id.clone(),
                                participation_id: participation.id,
                            },
                        )
                        .await;
                    outcome.record_migrated(record.local_id);
                }
                Ok(RecordResult::Skipped(existing_source)) => {
                    debug!(
                        user_id = %user_id,
                        challenge_id = %record.challenge_id,
                        existing_source = ?existing_source,
                        "Participation already exists, skipped"
                    );
                    self.audit
                        .log(
                            user_id,
                            AuditEvent::RecordSkipped {
                                local_id: record.local_id.clone(),
                                challenge_id: record.challenge_id.clone(),
                                existing_source,
                            },
                        )
                        .await;
                    outcome.record_skipped(record.local_id);
                }
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        challenge_id = %record.challenge_id,
                        error = %e,
                        "Participation migration failed"
                    );
                    self.audit
                        .log(
                            user_id,
                            AuditEvent::RecordFailed {
                                local_id: record.local_id.clone(),
                                challenge_id: record.challenge_id.clone(),
                                reason: e.to_string(),
                            },
                        )
                        .await;
                    outcome.record_failed(RecordFailure {
                        local_id: record.local_id,
                        challenge_id: record.challenge_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let outcome = outcome.finish();
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(
            user_id = %user_id,
            status = %outcome.status,
            migrated = outcome.migrated_count,
            skipped = outcome.skipped_count,
            failed = outcome.failed_count,
            duration_ms = duration_ms,
            "Participation migration finished"
        );
        self.audit
            .log(
                user_id,
                AuditEvent::MigrationFinished {
                    status: outcome.status,
                    migrated: outcome.migrated_count,
                    skipped: outcome.skipped_count,
                    failed: outcome.failed_count,
                    duration_ms,
                },
            )
            .await;

        Ok(outcome)
    }

    async fn reconcile_one(
        &self,
        user_id: &str,
        record: &AnonymousParticipation,
    ) -> Result<RecordResult> {
        let existing = self
            .with_timeout(
                "find_participation",
                self.repository
                    .find_participation(user_id, &record.challenge_id),
            )
            .await?;

        if let Some(existing) = existing {
            return Ok(RecordResult::Skipped(Some(existing.source)));
        }

        let created = self
            .with_timeout(
                "create_participation",
                self.repository
                    .create_participation(NewParticipation::migrated(user_id, record)),
            )
            .await;

        match created {
            Ok(participation) => Ok(RecordResult::Migrated(participation)),
            Err(DefisError::Conflict(_)) => Ok(RecordResult::Skipped(None)),
            Err(e) => Err(e),
        }
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DefisError::Timeout(format!(
                "{} exceeded {}ms",
                operation,
                self.config.request_timeout.as_millis()
            ))),
        }
    }
}
