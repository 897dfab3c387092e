//! Persistence layer for authenticated participations
//!
//! The reconciliation engine only sees [`ParticipationRepository`]. MongoDB
//! backs it in production; the in-memory implementation backs dev mode and
//! tests.

mod memory;
mod mongo;

pub use memory::InMemoryParticipationRepository;
pub use mongo::MongoParticipationRepository;

use crate::types::{AuthenticatedParticipation, NewParticipation, Result};

/// Authoritative store of authenticated participations
///
/// Implementations must enforce the (user, challenge) uniqueness invariant
/// themselves and report a violation as [`crate::DefisError::Conflict`].
#[async_trait::async_trait]
pub trait ParticipationRepository: Send + Sync {
    /// Find the participation for a user and challenge
    async fn find_participation(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Option<AuthenticatedParticipation>>;

    /// Create a participation
    async fn create_participation(
        &self,
        record: NewParticipation,
    ) -> Result<AuthenticatedParticipation>;

    /// All participations owned by a user
    async fn list_participations(&self, user_id: &str) -> Result<Vec<AuthenticatedParticipation>>;
}
