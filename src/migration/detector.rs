//! Migration detector
//!
//! Decides whether a signed-in session has anonymous participations worth
//! migrating. The informational notice is shown at most once per session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::anonymous::AnonymousStore;
use crate::notify::Notifier;
use crate::types::Identity;

/// Notice shown when anonymous participations are found
pub const PENDING_NOTICE: &str =
    "We found challenge participations from before you signed in. Moving them to your account.";

pub struct MigrationDetector {
    store: Arc<dyn AnonymousStore>,
    notifier: Arc<dyn Notifier>,
    /// Session-scoped; cleared by `reset`
    notified: AtomicBool,
}

impl MigrationDetector {
    pub fn new(store: Arc<dyn AnonymousStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            notified: AtomicBool::new(false),
        }
    }

    /// Pure decision: identity may migrate and the store has records
    ///
    /// An unavailable store counts as empty.
    pub async fn has_opportunity(&self, identity: Option<&Identity>) -> bool {
        if !identity.is_some_and(Identity::can_migrate) {
            return false;
        }

        match self.store.has_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Anonymous store unreadable, treating as empty");
                false
            }
        }
    }

    /// Same decision as [`Self::has_opportunity`], notifying the user the
    /// first time it holds in this session
    pub async fn should_notify(&self, identity: Option<&Identity>) -> bool {
        if !self.has_opportunity(identity).await {
            return false;
        }

        if !self.notified.swap(true, Ordering::SeqCst) {
            debug!("Anonymous participations detected, notifying");
            self.notifier.notify_info(PENDING_NOTICE.to_string()).await;
        }
        true
    }

    /// Whether the notice was already shown in this session
    pub fn already_notified(&self) -> bool {
        self.notified.load(Ordering::SeqCst)
    }

    /// Start a new session
    pub fn reset(&self) {
        self.notified.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymous::InMemoryAnonymousStore;
    use crate::notify::{ChannelNotifier, Notification};
    use crate::types::AnonymousParticipation;
    use serde_json::json;

    fn setup(with_record: bool) -> (Arc<InMemoryAnonymousStore>, ChannelNotifier, MigrationDetector) {
        let records = if with_record {
            vec![AnonymousParticipation::new("c1", json!("p1"))]
        } else {
            Vec::new()
        };
        let store = Arc::new(InMemoryAnonymousStore::with_records(records));
        let notifier = ChannelNotifier::default();
        let detector = MigrationDetector::new(store.clone(), Arc::new(notifier.clone()));
        (store, notifier, detector)
    }

    #[tokio::test]
    async fn test_requires_authenticated_identity() {
        let (_, _, detector) = setup(true);

        assert!(!detector.should_notify(None).await);
        assert!(!detector.should_notify(Some(&Identity::anonymous("v1"))).await);
        assert!(!detector.already_notified());
    }

    #[tokio::test]
    async fn test_empty_store_is_false() {
        let (_, _, detector) = setup(false);
        assert!(!detector.should_notify(Some(&Identity::authenticated("u1"))).await);
    }

    #[tokio::test]
    async fn test_notifies_once_per_session() {
        let (_, notifier, detector) = setup(true);
        let mut rx = notifier.subscribe();
        let identity = Identity::authenticated("u1");

        assert!(detector.should_notify(Some(&identity)).await);
        assert!(detector.should_notify(Some(&identity)).await);

        assert!(matches!(rx.try_recv(), Ok(Notification::Info { .. })));
        assert!(rx.try_recv().is_err());

        detector.reset();
        assert!(detector.should_notify(Some(&identity)).await);
        assert!(matches!(rx.try_recv(), Ok(Notification::Info { .. })));
    }

    #[tokio::test]
    async fn test_unavailable_store_is_false() {
        let (store, _, detector) = setup(true);
        store.set_unavailable(true);
        assert!(!detector.should_notify(Some(&Identity::authenticated("u1"))).await);
    }
}
