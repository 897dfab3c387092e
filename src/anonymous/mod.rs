//! Local anonymous store
//!
//! Holds challenge participations recorded before the visitor signed in.
//! Any medium works as long as it can list, remove by id and clear.
//!
//! ## Media
//!
//! - **Memory**: process-local, used for embedding and tests
//! - **File**: one JSON document on disk, replaced atomically on every write

mod file;
mod memory;

pub use file::FileAnonymousStore;
pub use memory::InMemoryAnonymousStore;

use crate::types::{AnonymousParticipation, Result};

/// Durable holding area for pre-authentication participations
///
/// Read failures are reported as [`crate::DefisError::StorageUnavailable`];
/// callers treat them as "nothing pending".
#[async_trait::async_trait]
pub trait AnonymousStore: Send + Sync {
    /// True iff at least one record is present
    async fn has_pending(&self) -> Result<bool> {
        Ok(!self.list_pending().await?.is_empty())
    }

    /// All pending records
    async fn list_pending(&self) -> Result<Vec<AnonymousParticipation>>;

    /// Add a record, replacing any record with the same local id
    async fn record(&self, participation: AnonymousParticipation) -> Result<()>;

    /// Remove the given records; unknown ids are ignored
    ///
    /// Returns how many records were removed.
    async fn remove(&self, local_ids: &[String]) -> Result<usize>;

    /// Remove every record
    async fn clear(&self) -> Result<()>;
}
