//! Participation records and session identity
//!
//! Anonymous participations live in the local store until migrated;
//! authenticated participations are the system of record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity supplied by the session provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Authenticated user id
    pub id: String,
    /// Whether the session is authenticated
    pub authenticated: bool,
}

impl Identity {
    /// An authenticated identity for the given user id
    pub fn authenticated(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            authenticated: true,
        }
    }

    /// A visitor identity that has not signed in
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            authenticated: false,
        }
    }

    /// True when migration may run for this identity
    pub fn can_migrate(&self) -> bool {
        self.authenticated && !self.id.trim().is_empty()
    }
}

/// Challenge participation recorded before the visitor signed in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousParticipation {
    /// Client-generated id, unique within the local store
    pub local_id: String,
    pub challenge_id: String,
    pub submitted_at: DateTime<Utc>,
    /// Opaque submission content
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl AnonymousParticipation {
    /// Create a new anonymous participation submitted now
    pub fn new(challenge_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            local_id: Uuid::new_v4().to_string(),
            challenge_id: challenge_id.into(),
            submitted_at: Utc::now(),
            payload,
        }
    }
}

/// How an authenticated participation came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipationSource {
    /// Created by the signed-in user
    #[default]
    Direct,
    /// Reconciled from the anonymous store
    Migrated,
}

impl ParticipationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "DIRECT",
            Self::Migrated => "MIGRATED",
        }
    }
}

impl std::fmt::Display for ParticipationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Participation owned by an authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedParticipation {
    /// Persistence-assigned id
    pub id: String,
    pub user_id: String,
    pub challenge_id: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub source: ParticipationSource,
}

/// Input for creating an authenticated participation
#[derive(Debug, Clone, PartialEq)]
pub struct NewParticipation {
    pub user_id: String,
    pub challenge_id: String,
    pub submitted_at: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub source: ParticipationSource,
}

impl NewParticipation {
    /// Participation created directly by a signed-in user
    pub fn direct(
        user_id: impl Into<String>,
        challenge_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            challenge_id: challenge_id.into(),
            submitted_at: Utc::now(),
            payload,
            source: ParticipationSource::Direct,
        }
    }

    /// Participation reconciled from an anonymous record, copying its content
    pub fn migrated(user_id: impl Into<String>, anonymous: &AnonymousParticipation) -> Self {
        Self {
            user_id: user_id.into(),
            challenge_id: anonymous.challenge_id.clone(),
            submitted_at: anonymous.submitted_at,
            payload: anonymous.payload.clone(),
            source: ParticipationSource::Migrated,
        }
    }
}
