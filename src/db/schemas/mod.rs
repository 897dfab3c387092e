//! Database schemas for LPT Défis

mod metadata;
mod participation;

pub use metadata::Metadata;
pub use participation::{ParticipationDoc, PARTICIPATION_COLLECTION};
