//! Bookkeeping timestamps shared by every stored document
//!
//! Participations are never removed by reconciliation; `is_deleted` is only
//! honoured so that records hidden by moderation stay invisible to lookups.

use bson::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl Metadata {
    /// Mark as a freshly written, visible document
    pub fn stamp_created(&mut self) {
        let now = DateTime::now();
        self.is_deleted = false;
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }
}
