//! Session-start coordinator integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;

use lpt_defis::anonymous::{AnonymousStore, FileAnonymousStore, InMemoryAnonymousStore};
use lpt_defis::migration::coordinator::{FAILURE_NOTICE, PARTIAL_FAILURE_NOTICE};
use lpt_defis::migration::detector::PENDING_NOTICE;
use lpt_defis::migration::{EngineConfig, MigrationCoordinator, MigrationStatus};
use lpt_defis::notify::{ChannelNotifier, Notification, Notifier, SuccessDetails};
use lpt_defis::persistence::{InMemoryParticipationRepository, ParticipationRepository};
use lpt_defis::session::StaticSessionProvider;
use lpt_defis::types::{
    AnonymousParticipation, AuthenticatedParticipation, Identity, NewParticipation,
    ParticipationSource,
};
use lpt_defis::{DefisError, Result};

/// Repository that can stall creates and reject chosen challenges
struct TestRepository {
    inner: InMemoryParticipationRepository,
    creates: AtomicUsize,
    create_delay: Duration,
    rejected: Vec<String>,
}

impl TestRepository {
    fn new() -> Self {
        Self {
            inner: InMemoryParticipationRepository::new(),
            creates: AtomicUsize::new(0),
            create_delay: Duration::ZERO,
            rejected: Vec::new(),
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            create_delay: delay,
            ..Self::new()
        }
    }

    fn rejecting(challenges: &[&str]) -> Self {
        Self {
            rejected: challenges.iter().map(|c| c.to_string()).collect(),
            ..Self::new()
        }
    }

    fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ParticipationRepository for TestRepository {
    async fn find_participation(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Option<AuthenticatedParticipation>> {
        self.inner.find_participation(user_id, challenge_id).await
    }

    async fn create_participation(
        &self,
        record: NewParticipation,
    ) -> Result<AuthenticatedParticipation> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        if self.rejected.contains(&record.challenge_id) {
            return Err(DefisError::Persistence("write rejected".into()));
        }
        self.inner.create_participation(record).await
    }

    async fn list_participations(&self, user_id: &str) -> Result<Vec<AuthenticatedParticipation>> {
        self.inner.list_participations(user_id).await
    }
}

/// Notifier whose surface is always broken
struct BrokenNotifier {
    attempts: AtomicUsize,
}

#[async_trait::async_trait]
impl Notifier for BrokenNotifier {
    async fn deliver(&self, _notification: Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DefisError::Notification("surface detached".into()))
    }
}

struct Fixture {
    store: Arc<dyn AnonymousStore>,
    repo: Arc<TestRepository>,
    notifications: broadcast::Receiver<Notification>,
    coordinator: MigrationCoordinator,
}

fn fixture(
    identity: Option<Identity>,
    store: Arc<dyn AnonymousStore>,
    repo: TestRepository,
) -> Fixture {
    let repo = Arc::new(repo);
    let notifier = ChannelNotifier::default();
    let notifications = notifier.subscribe();
    let coordinator = MigrationCoordinator::new(
        Arc::new(StaticSessionProvider::new(identity)),
        Arc::clone(&store),
        repo.clone(),
        Arc::new(notifier),
        EngineConfig::default(),
    );
    Fixture {
        store,
        repo,
        notifications,
        coordinator,
    }
}

fn store_with(challenges: &[&str]) -> Arc<dyn AnonymousStore> {
    let records = challenges
        .iter()
        .map(|c| AnonymousParticipation::new(*c, json!({ "answer": c })))
        .collect();
    Arc::new(InMemoryAnonymousStore::with_records(records))
}

fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut received = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        received.push(notification);
    }
    received
}

#[tokio::test]
async fn test_migrates_and_clears_store() {
    let mut f = fixture(
        Some(Identity::authenticated("u1")),
        store_with(&["c1", "c2"]),
        TestRepository::new(),
    );

    let outcome = f.coordinator.run_on_session_start().await.unwrap();

    assert_eq!(outcome.status, MigrationStatus::Success);
    assert_eq!(outcome.migrated_count, 2);
    assert!(f.store.list_pending().await.unwrap().is_empty());

    let stored = f.repo.list_participations("u1").await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|p| p.source == ParticipationSource::Migrated));

    let notifications = drain(&mut f.notifications);
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].message(), PENDING_NOTICE);
    assert!(matches!(
        &notifications[1],
        Notification::Success {
            details: SuccessDetails::Migration {
                migrated_count: 2,
                skipped_count: 0,
            },
            ..
        }
    ));
}

#[tokio::test]
async fn test_signed_out_session_is_noop() {
    let mut f = fixture(None, store_with(&["c1"]), TestRepository::new());

    assert!(f.coordinator.run_on_session_start().await.is_none());
    assert_eq!(f.store.list_pending().await.unwrap().len(), 1);
    assert_eq!(f.repo.creates(), 0);
    assert!(drain(&mut f.notifications).is_empty());
}

#[tokio::test]
async fn test_anonymous_session_is_noop() {
    let mut f = fixture(
        Some(Identity::anonymous("visitor")),
        store_with(&["c1"]),
        TestRepository::new(),
    );

    assert!(f.coordinator.run_on_session_start().await.is_none());
    assert_eq!(f.store.list_pending().await.unwrap().len(), 1);
    assert!(drain(&mut f.notifications).is_empty());
}

#[tokio::test]
async fn test_empty_store_is_silent() {
    let mut f = fixture(
        Some(Identity::authenticated("u1")),
        store_with(&[]),
        TestRepository::new(),
    );

    assert!(f.coordinator.run_on_session_start().await.is_none());
    assert_eq!(f.repo.creates(), 0);
    assert!(drain(&mut f.notifications).is_empty());
}

#[tokio::test]
async fn test_unavailable_store_is_treated_as_empty() {
    let store = Arc::new(InMemoryAnonymousStore::with_records(vec![
        AnonymousParticipation::new("c1", json!(null)),
    ]));
    store.set_unavailable(true);
    let mut f = fixture(
        Some(Identity::authenticated("u1")),
        store,
        TestRepository::new(),
    );

    assert!(f.coordinator.run_on_session_start().await.is_none());
    assert_eq!(f.repo.creates(), 0);
    assert!(drain(&mut f.notifications).is_empty());
}

#[tokio::test]
async fn test_partial_failure_keeps_failed_record() {
    let mut f = fixture(
        Some(Identity::authenticated("u1")),
        store_with(&["c1", "c2", "c3"]),
        TestRepository::rejecting(&["c2"]),
    );

    let outcome = f.coordinator.run_on_session_start().await.unwrap();

    assert_eq!(outcome.status, MigrationStatus::Partial);
    assert_eq!(outcome.migrated_count, 2);

    let remaining = f.store.list_pending().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].challenge_id, "c2");

    let messages: Vec<_> = drain(&mut f.notifications)
        .iter()
        .map(|n| n.message().to_string())
        .collect();
    assert!(messages.iter().any(|m| m == PARTIAL_FAILURE_NOTICE));
    assert!(messages.iter().any(|m| m.starts_with("2 participations")));
}

#[tokio::test]
async fn test_total_failure_leaves_store_untouched() {
    let mut f = fixture(
        Some(Identity::authenticated("u1")),
        store_with(&["c1", "c2"]),
        TestRepository::rejecting(&["c1", "c2"]),
    );

    let outcome = f.coordinator.run_on_session_start().await.unwrap();

    assert_eq!(outcome.status, MigrationStatus::Failed);
    assert_eq!(f.store.list_pending().await.unwrap().len(), 2);

    let notifications = drain(&mut f.notifications);
    let last = notifications.last().unwrap();
    assert!(matches!(last, Notification::Error { .. }));
    assert_eq!(last.message(), FAILURE_NOTICE);
    assert!(!notifications
        .iter()
        .any(|n| matches!(n, Notification::Success { .. })));
}

#[tokio::test]
async fn test_retry_after_failure_is_idempotent() {
    let store = store_with(&["c1", "c2", "c3"]);
    let first = fixture(
        Some(Identity::authenticated("u1")),
        Arc::clone(&store),
        TestRepository::rejecting(&["c2"]),
    );
    first.coordinator.run_on_session_start().await.unwrap();

    // Fresh repository seeded with what the first run persisted
    let second = fixture(
        Some(Identity::authenticated("u1")),
        store,
        TestRepository::new(),
    );
    for challenge in ["c1", "c3"] {
        second
            .repo
            .create_participation(NewParticipation::direct("u1", challenge, json!(null)))
            .await
            .unwrap();
    }

    let outcome = second.coordinator.run_on_session_start().await.unwrap();
    assert_eq!(outcome.status, MigrationStatus::Success);
    assert_eq!(outcome.migrated_count, 1);
    assert!(second.store.list_pending().await.unwrap().is_empty());
    assert_eq!(second.repo.list_participations("u1").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_run() {
    let f = fixture(
        Some(Identity::authenticated("u1")),
        store_with(&["c1", "c2"]),
        TestRepository::slow(Duration::from_millis(50)),
    );

    let (a, b) = tokio::join!(
        f.coordinator.run_on_session_start(),
        f.coordinator.run_on_session_start()
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.migrated_count, 2);
    assert_eq!(f.repo.creates(), 2);
    assert_eq!(f.repo.list_participations("u1").await.unwrap().len(), 2);
    assert!(!f.coordinator.is_running());
}

#[tokio::test]
async fn test_runs_again_after_previous_run_finished() {
    let f = fixture(
        Some(Identity::authenticated("u1")),
        store_with(&["c1"]),
        TestRepository::new(),
    );

    assert!(f.coordinator.run_on_session_start().await.is_some());
    f.store
        .record(AnonymousParticipation::new("c2", json!(null)))
        .await
        .unwrap();

    f.coordinator.start_session();
    let outcome = f.coordinator.run_on_session_start().await.unwrap();
    assert_eq!(outcome.migrated_count, 1);
    assert_eq!(f.repo.list_participations("u1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_broken_notifier_does_not_block_migration() {
    let store = store_with(&["c1"]);
    let repo = Arc::new(TestRepository::new());
    let notifier = Arc::new(BrokenNotifier {
        attempts: AtomicUsize::new(0),
    });
    let coordinator = MigrationCoordinator::new(
        Arc::new(StaticSessionProvider::authenticated("u1")),
        Arc::clone(&store),
        repo.clone(),
        notifier.clone(),
        EngineConfig::default(),
    );

    let outcome = coordinator.run_on_session_start().await.unwrap();

    assert_eq!(outcome.status, MigrationStatus::Success);
    assert!(store.list_pending().await.unwrap().is_empty());
    assert!(repo.find_participation("u1", "c1").await.unwrap().is_some());
    assert!(notifier.attempts.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_file_store_survives_restart_until_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anonymous.json");

    {
        let store = FileAnonymousStore::new(path.clone());
        store
            .record(AnonymousParticipation::new("c1", json!("p1")))
            .await
            .unwrap();
    }

    let store: Arc<dyn AnonymousStore> = Arc::new(FileAnonymousStore::new(path.clone()));
    let f = fixture(
        Some(Identity::authenticated("u1")),
        store,
        TestRepository::new(),
    );
    let outcome = f.coordinator.run_on_session_start().await.unwrap();

    assert_eq!(outcome.migrated_count, 1);
    let reopened = FileAnonymousStore::new(path);
    assert!(reopened.list_pending().await.unwrap().is_empty());
}
