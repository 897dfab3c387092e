//! Configuration for LPT Défis
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::migration::EngineConfig;

/// LPT Défis - move anonymous challenge participations into an account
#[derive(Parser, Debug, Clone)]
#[command(name = "lpt-defis")]
#[command(about = "Anonymous participation reconciliation for LPT Défis")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "lpt_defis")]
    pub mongodb_db: String,

    /// Path of the local anonymous participation store
    #[arg(long, env = "ANONYMOUS_STORE_PATH", default_value = "anonymous_participations.json")]
    pub store_path: PathBuf,

    /// JWT secret used to verify session tokens (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Session token of the signed-in user
    #[arg(long, env = "SESSION_TOKEN")]
    pub token: Option<String>,

    /// Signed-in user id, bypassing token verification (dev mode only)
    #[arg(long, env = "USER_ID")]
    pub user_id: Option<String>,

    /// Enable development mode (in-memory persistence, static identity)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Timeout for each persistence call in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "5000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Append migration audit events to this JSONL file
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the session-start migration once
    Migrate,
    /// List pending anonymous participations
    Status,
    /// Record an anonymous participation
    Record {
        /// Challenge identifier
        challenge_id: String,
        /// Submission content (JSON, or plain text)
        #[arg(long, default_value = "null")]
        payload: String,
    },
    /// Discard every pending anonymous participation
    Clear,
}

impl Args {
    /// Engine settings derived from the arguments
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.jwt_secret.is_none() {
                return Err("JWT_SECRET is required in production mode".to_string());
            }

            if self.user_id.is_some() {
                return Err("USER_ID is only accepted in dev mode; use SESSION_TOKEN".to_string());
            }
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Parse a payload argument as JSON, falling back to a plain string
pub fn parse_payload(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
