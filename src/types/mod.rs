//! Shared types for LPT Défis

mod error;
mod participation;

pub use error::{DefisError, Result};
pub use participation::{
    AnonymousParticipation, AuthenticatedParticipation, Identity, NewParticipation,
    ParticipationSource,
};
