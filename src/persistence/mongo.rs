//! MongoDB-backed participation repository

use bson::doc;
use tracing::debug;

use crate::db::schemas::{ParticipationDoc, PARTICIPATION_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{AuthenticatedParticipation, DefisError, NewParticipation, Result};

use super::ParticipationRepository;

/// Participation repository over the `participations` collection
pub struct MongoParticipationRepository {
    collection: MongoCollection<ParticipationDoc>,
}

impl MongoParticipationRepository {
    /// Open the collection, creating the unique (user, challenge) index
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo
            .collection::<ParticipationDoc>(PARTICIPATION_COLLECTION)
            .await?;
        Ok(Self { collection })
    }
}

#[async_trait::async_trait]
impl ParticipationRepository for MongoParticipationRepository {
    async fn find_participation(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Option<AuthenticatedParticipation>> {
        let doc = self
            .collection
            .find_one(ParticipationDoc::key_filter(user_id, challenge_id))
            .await
            .map_err(into_persistence)?;

        Ok(doc.and_then(ParticipationDoc::into_participation))
    }

    async fn create_participation(
        &self,
        record: NewParticipation,
    ) -> Result<AuthenticatedParticipation> {
        let mut doc = ParticipationDoc::try_from(record)?;

        let id = self
            .collection
            .insert_one(doc.clone())
            .await
            .map_err(into_persistence)?;

        debug!(
            id = %id,
            user_id = %doc.user_id,
            challenge_id = %doc.challenge_id,
            source = %doc.source,
            "Participation inserted"
        );

        doc._id = Some(id);
        doc.into_participation()
            .ok_or_else(|| DefisError::Internal("Inserted participation has no id".into()))
    }

    async fn list_participations(&self, user_id: &str) -> Result<Vec<AuthenticatedParticipation>> {
        let docs = self
            .collection
            .find_many(doc! { "user_id": user_id })
            .await
            .map_err(into_persistence)?;

        Ok(docs
            .into_iter()
            .filter_map(ParticipationDoc::into_participation)
            .collect())
    }
}

/// Database failures become per-record persistence failures; a unique index
/// violation stays a conflict
fn into_persistence(err: DefisError) -> DefisError {
    match err {
        DefisError::Database(msg) => DefisError::Persistence(msg),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_wrapped_once() {
        let err = into_persistence(DefisError::Database("Find failed: socket closed".into()));
        assert!(matches!(&err, DefisError::Persistence(_)));
        assert_eq!(err.to_string(), "Persistence error: Find failed: socket closed");
    }

    #[test]
    fn test_conflict_passes_through() {
        let err = into_persistence(DefisError::Conflict("E11000 duplicate key".into()));
        assert!(matches!(err, DefisError::Conflict(_)));
    }
}
