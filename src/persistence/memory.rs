//! In-memory participation repository (dev mode and tests)

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::types::{AuthenticatedParticipation, DefisError, NewParticipation, Result};

use super::ParticipationRepository;

/// Participations indexed by (user_id, challenge_id)
///
/// Insertion goes through the map entry, so two concurrent creates for the
/// same pair cannot both succeed.
#[derive(Default)]
pub struct InMemoryParticipationRepository {
    records: DashMap<(String, String), AuthenticatedParticipation>,
}

impl InMemoryParticipationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored participations across all users
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl ParticipationRepository for InMemoryParticipationRepository {
    async fn find_participation(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Option<AuthenticatedParticipation>> {
        let key = (user_id.to_string(), challenge_id.to_string());
        Ok(self.records.get(&key).map(|entry| entry.value().clone()))
    }

    async fn create_participation(
        &self,
        record: NewParticipation,
    ) -> Result<AuthenticatedParticipation> {
        let key = (record.user_id.clone(), record.challenge_id.clone());

        match self.records.entry(key) {
            Entry::Occupied(_) => Err(DefisError::Conflict(format!(
                "user {} already has a participation for challenge {}",
                record.user_id, record.challenge_id
            ))),
            Entry::Vacant(slot) => {
                let participation = AuthenticatedParticipation {
                    id: Uuid::new_v4().to_string(),
                    user_id: record.user_id,
                    challenge_id: record.challenge_id,
                    submitted_at: record.submitted_at,
                    payload: record.payload,
                    source: record.source,
                };
                slot.insert(participation.clone());
                Ok(participation)
            }
        }
    }

    async fn list_participations(&self, user_id: &str) -> Result<Vec<AuthenticatedParticipation>> {
        let mut found: Vec<AuthenticatedParticipation> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParticipationSource;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_find() {
        let repo = InMemoryParticipationRepository::new();
        let created = repo
            .create_participation(NewParticipation::direct("u1", "c1", json!("p1")))
            .await
            .unwrap();

        let found = repo.find_participation("u1", "c1").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.source, ParticipationSource::Direct);
        assert!(repo.find_participation("u2", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let repo = InMemoryParticipationRepository::new();
        repo.create_participation(NewParticipation::direct("u1", "c1", json!("first")))
            .await
            .unwrap();

        let err = repo
            .create_participation(NewParticipation::direct("u1", "c1", json!("second")))
            .await
            .unwrap_err();
        assert!(matches!(err, DefisError::Conflict(_)));

        let kept = repo.find_participation("u1", "c1").await.unwrap().unwrap();
        assert_eq!(kept.payload, json!("first"));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_list_scoped_to_user() {
        let repo = InMemoryParticipationRepository::new();
        for (user, challenge) in [("u1", "c1"), ("u1", "c2"), ("u2", "c1")] {
            repo.create_participation(NewParticipation::direct(user, challenge, json!(null)))
                .await
                .unwrap();
        }

        let listed = repo.list_participations("u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|p| p.user_id == "u1"));
    }
}
