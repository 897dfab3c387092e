//! Migration coordinator
//!
//! The single entry point run when a session starts. It ties the session
//! provider, detector, engine and local store together and turns the
//! engine's outcome into notifications.
//!
//! Only one run is in flight per coordinator. A call made while a run is in
//! progress does not start a second one; it waits for the running one and
//! returns its result.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::anonymous::AnonymousStore;
use crate::notify::{Notifier, SuccessDetails};
use crate::persistence::ParticipationRepository;
use crate::session::SessionProvider;
use crate::types::Identity;

use super::detector::MigrationDetector;
use super::engine::{EngineConfig, ReconciliationEngine};
use super::outcome::{MigrationOutcome, MigrationStatus};

/// Message shown when some records could not be migrated
pub const PARTIAL_FAILURE_NOTICE: &str =
    "Some of your earlier participations could not be saved. We will try again next time.";

/// Message shown when no record could be migrated
pub const FAILURE_NOTICE: &str =
    "Your earlier participations could not be saved. We will try again next time.";

/// State shared between the running call and waiting callers
#[derive(Debug, Clone)]
enum RunState {
    Running,
    Done(Option<MigrationOutcome>),
}

pub struct MigrationCoordinator {
    session: Arc<dyn SessionProvider>,
    store: Arc<dyn AnonymousStore>,
    notifier: Arc<dyn Notifier>,
    detector: MigrationDetector,
    engine: ReconciliationEngine,
    in_flight: Arc<Mutex<Option<watch::Receiver<RunState>>>>,
}

/// Clears the in-flight slot when the running call finishes or is dropped
struct InFlightGuard {
    slot: Arc<Mutex<Option<watch::Receiver<RunState>>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

impl MigrationCoordinator {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn AnonymousStore>,
        repository: Arc<dyn ParticipationRepository>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        let detector = MigrationDetector::new(Arc::clone(&store), Arc::clone(&notifier));
        let engine = ReconciliationEngine::new(config, repository);
        Self::from_parts(session, store, notifier, detector, engine)
    }

    /// Assemble from an already configured detector and engine
    pub fn from_parts(
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn AnonymousStore>,
        notifier: Arc<dyn Notifier>,
        detector: MigrationDetector,
        engine: ReconciliationEngine,
    ) -> Self {
        Self {
            session,
            store,
            notifier,
            detector,
            engine,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Reset per-session state; call once when a new session begins
    ///
    /// A run still in flight keeps its guard and clears it when done.
    pub fn start_session(&self) {
        self.detector.reset();
    }

    /// Whether a run is currently in progress
    pub fn is_running(&self) -> bool {
        self.in_flight
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Run the migration check for the current session
    ///
    /// Returns `None` when there was nothing to do: no signed-in identity, no
    /// pending records, or an unreadable local store.
    pub async fn run_on_session_start(&self) -> Option<MigrationOutcome> {
        let identity = self.session.current_identity().await?;
        if !identity.can_migrate() {
            debug!(session = %identity.id, "Session not authenticated, skipping migration");
            return None;
        }

        let (tx, guard) = match self.claim() {
            Claim::Leader(tx, guard) => (tx, guard),
            Claim::Follower(rx) => return Self::wait_for(rx).await,
        };

        let result = self.run(&identity).await;
        let _ = tx.send(RunState::Done(result.clone()));
        drop(guard);
        result
    }

    fn claim(&self) -> Claim {
        let mut slot = match self.in_flight.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(rx) = slot.as_ref() {
            return Claim::Follower(rx.clone());
        }

        let (tx, rx) = watch::channel(RunState::Running);
        *slot = Some(rx);
        Claim::Leader(
            tx,
            InFlightGuard {
                slot: Arc::clone(&self.in_flight),
            },
        )
    }

    async fn wait_for(mut rx: watch::Receiver<RunState>) -> Option<MigrationOutcome> {
        debug!("Migration already in flight, waiting for its result");
        match rx.wait_for(|state| matches!(state, RunState::Done(_))).await {
            Ok(state) => match &*state {
                RunState::Done(result) => result.clone(),
                RunState::Running => None,
            },
            // The running call was dropped before finishing
            Err(_) => None,
        }
    }

    async fn run(&self, identity: &Identity) -> Option<MigrationOutcome> {
        if !self.detector.should_notify(Some(identity)).await {
            return None;
        }

        let pending = match self.store.list_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Anonymous store unreadable, skipping migration");
                return None;
            }
        };

        let outcome = match self.engine.migrate(Some(identity), pending).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Migration rejected");
                self.notifier
                    .notify_error(e.public_message().to_string())
                    .await;
                return None;
            }
        };

        self.present(&outcome).await;
        Some(outcome)
    }

    /// Apply the outcome to the local store and tell the user
    async fn present(&self, outcome: &MigrationOutcome) {
        if outcome.should_clear() {
            match self.store.remove(&outcome.processed).await {
                Ok(removed) => debug!(removed = removed, "Processed anonymous records removed"),
                // They stay pending and deduplicate on the next run
                Err(e) => warn!(error = %e, "Failed to remove processed anonymous records"),
            }
        }

        match outcome.status {
            MigrationStatus::NoneFound => {}
            MigrationStatus::Success | MigrationStatus::Partial => {
                if outcome.migrated_count > 0 {
                    self.notifier
                        .notify_success(
                            success_message(outcome.migrated_count),
                            SuccessDetails::Migration {
                                migrated_count: outcome.migrated_count,
                                skipped_count: outcome.skipped_count,
                            },
                        )
                        .await;
                }
                if outcome.status == MigrationStatus::Partial {
                    self.notifier
                        .notify_error(PARTIAL_FAILURE_NOTICE.to_string())
                        .await;
                }
            }
            MigrationStatus::Failed => {
                self.notifier.notify_error(FAILURE_NOTICE.to_string()).await;
            }
        }

        info!(
            status = %outcome.status,
            migrated = outcome.migrated_count,
            skipped = outcome.skipped_count,
            failed = outcome.failed_count,
            "Migration outcome presented"
        );
    }
}

enum Claim {
    Leader(watch::Sender<RunState>, InFlightGuard),
    Follower(watch::Receiver<RunState>),
}

fn success_message(migrated: u32) -> String {
    if migrated == 1 {
        "1 participation was moved to your account".to_string()
    } else {
        format!("{} participations were moved to your account", migrated)
    }
}
