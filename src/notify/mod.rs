//! Notification surface
//!
//! User-facing messages are fire-and-forget: a surface that fails to deliver
//! is logged and otherwise ignored, never failing the migration that
//! triggered it.

mod channel;

pub use channel::ChannelNotifier;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::types::Result;

/// Structured details attached to a success notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuccessDetails {
    /// Anonymous participations were moved to the account
    Migration {
        migrated_count: u32,
        skipped_count: u32,
    },
}

/// A user-facing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Notification {
    Info { message: String },
    Success {
        message: String,
        details: SuccessDetails,
    },
    Error { message: String },
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Self::Info { message } | Self::Success { message, .. } | Self::Error { message } => {
                message
            }
        }
    }
}

/// Surface that presents notifications to the user
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification
    async fn deliver(&self, notification: Notification) -> Result<()>;

    async fn notify_info(&self, message: String) {
        self.deliver_best_effort(Notification::Info { message }).await;
    }

    async fn notify_success(&self, message: String, details: SuccessDetails) {
        self.deliver_best_effort(Notification::Success { message, details })
            .await;
    }

    async fn notify_error(&self, message: String) {
        self.deliver_best_effort(Notification::Error { message }).await;
    }

    /// Deliver, swallowing failures
    async fn deliver_best_effort(&self, notification: Notification) {
        if let Err(e) = self.deliver(notification).await {
            warn!(error = %e, "Notification delivery failed");
        }
    }
}

/// Notifier writing every notification to the log
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait::async_trait]
impl Notifier for TracingNotifier {
    async fn deliver(&self, notification: Notification) -> Result<()> {
        match &notification {
            Notification::Info { message } => info!(target: "notify", "{}", message),
            Notification::Success { message, details } => {
                info!(target: "notify", details = ?details, "{}", message)
            }
            Notification::Error { message } => error!(target: "notify", "{}", message),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DefisError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingNotifier {
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Notifier for FailingNotifier {
        async fn deliver(&self, _notification: Notification) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(DefisError::Notification("toast surface gone".into()))
        }
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let notifier = FailingNotifier {
            attempts: AtomicUsize::new(0),
        };

        notifier.notify_info("hello".into()).await;
        notifier.notify_error("oops".into()).await;
        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_notification_serialization() {
        let notification = Notification::Success {
            message: "2 participations migrated".into(),
            details: SuccessDetails::Migration {
                migrated_count: 2,
                skipped_count: 0,
            },
        };

        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"level\":\"success\""));
        assert!(json.contains("\"kind\":\"migration\""));
        assert!(json.contains("\"migrated_count\":2"));
    }
}
