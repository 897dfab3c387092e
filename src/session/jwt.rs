//! JWT-backed session provider
//!
//! Tokens are HS256 signed by the identity provider. A token that fails to
//! verify yields no identity; the coordinator then does nothing.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{DefisError, Identity, Result};

use super::SessionProvider;

/// Minimum accepted secret length outside dev mode
const MIN_SECRET_LEN: usize = 32;

/// Payload stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Display name, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Session provider verifying a bearer token
#[derive(Clone)]
pub struct JwtSessionProvider {
    secret: String,
    token: Option<String>,
}

impl JwtSessionProvider {
    /// Create a provider; rejects empty or short secrets
    pub fn new(secret: String, token: Option<String>) -> Result<Self> {
        if secret.is_empty() {
            return Err(DefisError::Config("JWT_SECRET is required".into()));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(DefisError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self { secret, token })
    }

    /// Provider for dev mode with a fixed, insecure secret
    pub fn new_dev(token: Option<String>) -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            token,
        }
    }

    /// Issue a token for a user, valid for `expiry_seconds`
    pub fn issue_token(&self, user_id: &str, expiry_seconds: u64) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DefisError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: user_id.to_string(),
            name: None,
            iat: now,
            exp: now + expiry_seconds,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Verify and decode a token
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}

#[async_trait::async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn current_identity(&self) -> Option<Identity> {
        let token = self.token.as_deref()?;

        match self.verify(token) {
            Ok(claims) => {
                debug!(user_id = %claims.sub, "Session token verified");
                Some(Identity::authenticated(claims.sub))
            }
            Err(e) => {
                warn!(error = %e, "Session token rejected");
                None
            }
        }
    }
}
