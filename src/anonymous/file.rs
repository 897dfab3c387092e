//! JSON file anonymous store
//!
//! The whole store is one document:
//!
//! ```json
//! { "version": 1, "participations": [ { "localId": "...", ... } ] }
//! ```
//!
//! A missing file is an empty store. Writes go to a sibling temp file that
//! is then renamed over the original, so a crash never leaves a torn file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::types::{AnonymousParticipation, DefisError, Result};

use super::AnonymousStore;

/// Current on-disk format version
const STORE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    participations: Vec<AnonymousParticipation>,
}

/// Anonymous store persisted as a JSON file
pub struct FileAnonymousStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileAnonymousStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreDocument> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreDocument {
                    version: STORE_VERSION,
                    participations: Vec::new(),
                });
            }
            Err(e) => {
                return Err(DefisError::StorageUnavailable(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let document: StoreDocument = serde_json::from_slice(&bytes).map_err(|e| {
            DefisError::StorageUnavailable(format!("corrupt store {}: {}", self.path.display(), e))
        })?;

        if document.version > STORE_VERSION {
            warn!(
                path = %self.path.display(),
                version = document.version,
                "Anonymous store written by a newer version"
            );
            return Err(DefisError::StorageUnavailable(format!(
                "unsupported store version {}",
                document.version
            )));
        }

        Ok(document)
    }

    async fn save(&self, mut document: StoreDocument) -> Result<()> {
        document.version = STORE_VERSION;
        let json = serde_json::to_vec_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(
            path = %self.path.display(),
            records = document.participations.len(),
            "Anonymous store saved"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl AnonymousStore for FileAnonymousStore {
    async fn list_pending(&self) -> Result<Vec<AnonymousParticipation>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.participations)
    }

    async fn record(&self, participation: AnonymousParticipation) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        document
            .participations
            .retain(|r| r.local_id != participation.local_id);
        document.participations.push(participation);
        self.save(document).await
    }

    async fn remove(&self, local_ids: &[String]) -> Result<usize> {
        if local_ids.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let before = document.participations.len();
        document
            .participations
            .retain(|r| !local_ids.contains(&r.local_id));
        let removed = before - document.participations.len();

        if removed > 0 {
            self.save(document).await?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
