//! Participation document schema
//!
//! One document per (user, challenge). The unique compound index is the
//! backstop against two reconciliation runs racing for the same user.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{
    AuthenticatedParticipation, DefisError, NewParticipation, ParticipationSource, Result,
};

/// Collection name for participations
pub const PARTICIPATION_COLLECTION: &str = "participations";

/// Participation document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ParticipationDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: String,

    pub challenge_id: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,

    /// Submission content, kept as an opaque BSON value
    pub payload: bson::Bson,

    #[serde(default)]
    pub source: ParticipationSource,
}

impl ParticipationDoc {
    /// Filter matching the (user, challenge) pair
    pub fn key_filter(user_id: &str, challenge_id: &str) -> Document {
        doc! { "user_id": user_id, "challenge_id": challenge_id }
    }

    /// Convert to the domain record, if the document has been persisted
    pub fn into_participation(self) -> Option<AuthenticatedParticipation> {
        let id = self._id?.to_hex();
        Some(AuthenticatedParticipation {
            id,
            user_id: self.user_id,
            challenge_id: self.challenge_id,
            submitted_at: self.submitted_at,
            payload: self.payload.into_relaxed_extjson(),
            source: self.source,
        })
    }
}

impl TryFrom<NewParticipation> for ParticipationDoc {
    type Error = DefisError;

    /// Fails when the payload has no BSON representation (e.g. a u64 above
    /// the i64 range)
    fn try_from(new: NewParticipation) -> Result<Self> {
        let payload = bson::to_bson(&new.payload).map_err(|e| {
            DefisError::Persistence(format!(
                "payload for challenge {} cannot be stored: {}",
                new.challenge_id, e
            ))
        })?;

        Ok(Self {
            _id: None,
            metadata: Metadata::default(),
            user_id: new.user_id,
            challenge_id: new.challenge_id,
            submitted_at: new.submitted_at,
            payload,
            source: new.source,
        })
    }
}

impl IntoIndexes for ParticipationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one participation per user and challenge
            (
                doc! { "user_id": 1, "challenge_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_challenge_unique".to_string())
                        .build(),
                ),
            ),
            // Leaderboard and admin views list by challenge
            (
                doc! { "challenge_id": 1, "submitted_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("challenge_submitted_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ParticipationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
