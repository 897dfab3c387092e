//! In-memory anonymous store

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::types::{AnonymousParticipation, DefisError, Result};

use super::AnonymousStore;

/// Process-local anonymous store preserving insertion order
#[derive(Default)]
pub struct InMemoryAnonymousStore {
    records: RwLock<Vec<AnonymousParticipation>>,
    /// Simulates a disabled or full storage medium
    unavailable: AtomicBool,
}

impl InMemoryAnonymousStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with records
    pub fn with_records(records: Vec<AnonymousParticipation>) -> Self {
        Self {
            records: RwLock::new(records),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Copy of another store's current records
    ///
    /// Later changes to either store are not reflected in the other.
    pub async fn snapshot_of(store: &dyn AnonymousStore) -> Result<Self> {
        Ok(Self::with_records(store.list_pending().await?))
    }

    /// Make every operation fail with `StorageUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DefisError::StorageUnavailable(
                "in-memory store disabled".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AnonymousStore for InMemoryAnonymousStore {
    async fn list_pending(&self) -> Result<Vec<AnonymousParticipation>> {
        self.check_available()?;
        Ok(self.records.read().await.clone())
    }

    async fn record(&self, participation: AnonymousParticipation) -> Result<()> {
        self.check_available()?;
        let mut records = self.records.write().await;
        records.retain(|r| r.local_id != participation.local_id);
        records.push(participation);
        Ok(())
    }

    async fn remove(&self, local_ids: &[String]) -> Result<usize> {
        self.check_available()?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !local_ids.contains(&r.local_id));
        Ok(before - records.len())
    }

    async fn clear(&self) -> Result<()> {
        self.check_available()?;
        self.records.write().await.clear();
        Ok(())
    }
}
