//! Session identity providers
//!
//! The coordinator asks a [`SessionProvider`] who is signed in. Token
//! verification is the only part of authentication handled here; sign-in
//! itself belongs to the identity provider.

mod jwt;

pub use jwt::{Claims, JwtSessionProvider};

use crate::types::Identity;

/// Supplies the identity of the current session
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current identity, or `None` for a visitor without a session
    async fn current_identity(&self) -> Option<Identity>;
}

/// Session provider returning a fixed identity
#[derive(Debug, Clone, Default)]
pub struct StaticSessionProvider {
    identity: Option<Identity>,
}

impl StaticSessionProvider {
    pub fn new(identity: Option<Identity>) -> Self {
        Self { identity }
    }

    /// Provider for a signed-in user
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self::new(Some(Identity::authenticated(user_id)))
    }

    /// Provider for a visitor without a session
    pub fn signed_out() -> Self {
        Self::new(None)
    }
}

#[async_trait::async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_identity(&self) -> Option<Identity> {
        self.identity.clone()
    }
}
