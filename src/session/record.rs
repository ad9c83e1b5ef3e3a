//! Persisted session record format.
//!
//! The record stores what the client needs to resume a signed-in session:
//! - Access and refresh tokens
//! - Token expiry (if known)
//! - The signed-in account
//! - A SHA-256 digest over all of the above
//!
//! On load, we:
//! 1. Recompute and compare the digest
//! 2. Check `saved_at` is not in the future
//! 3. Check the token has not expired

use crate::clock::Clock;
use crate::errors::RemoteError;
use crate::protocol::models::Account;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Bearer token for authenticated calls.
    pub access_token: String,

    /// Refresh token, when the service issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the access token stops being valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The signed-in account.
    pub account: Account,

    /// When the session was established.
    pub saved_at: DateTime<Utc>,

    /// Hex SHA-256 over the fields above.
    #[serde(default)]
    pub digest: String,
}

/// Why a persisted session was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    /// Digest mismatch or impossible timestamps.
    Tampered,
    /// Token expiry has passed.
    Expired,
}

impl SessionRecord {
    /// Create a record stamped with the current time and digest.
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        account: Account,
        clock: &dyn Clock,
    ) -> Self {
        let mut record = Self {
            access_token,
            refresh_token,
            expires_at,
            account,
            saved_at: clock.now_utc(),
            digest: String::new(),
        };
        record.digest = record.compute_digest();
        record
    }

    fn compute_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.access_token.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.refresh_token.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\n");
        let expires = self.expires_at.map(|t| t.to_rfc3339()).unwrap_or_default();
        hasher.update(expires.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.account.id.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.account.email.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.account.full_name.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\n");
        hasher.update(self.account.username.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\n");
        hasher.update(self.saved_at.to_rfc3339().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the token is past its expiry at the clock's current time.
    ///
    /// Records without a known expiry never expire locally.
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.expires_at.is_some_and(|exp| clock.now_utc() >= exp)
    }

    /// Check integrity and expiry.
    pub fn verify(&self, clock: &dyn Clock) -> Result<(), SessionRejection> {
        if self.digest != self.compute_digest() {
            return Err(SessionRejection::Tampered);
        }
        if self.saved_at > clock.now_utc() {
            return Err(SessionRejection::Tampered);
        }
        if self.is_expired(clock) {
            return Err(SessionRejection::Expired);
        }
        Ok(())
    }

    /// Serialize the record to JSON.
    pub fn to_json(&self) -> Result<String, RemoteError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::SessionStore(format!("Failed to serialize session: {}", e)))
    }

    /// Deserialize a record from JSON.
    pub fn from_json(json: &str) -> Result<Self, RemoteError> {
        serde_json::from_str(json)
            .map_err(|e| RemoteError::SessionStore(format!("Failed to deserialize session: {}", e)))
    }
}
