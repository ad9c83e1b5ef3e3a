//! Account service response structs.

use crate::errors::RemoteError;
use serde::{Deserialize, Serialize};

/// Account details returned alongside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Service-assigned account ID.
    pub id: i64,
    /// Sign-in email.
    pub email: String,
    /// Display name given at registration.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Username, when it differs from the email.
    #[serde(default)]
    pub username: Option<String>,
}

/// Response to authenticate and register calls.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token (a JWT).
    pub access_token: String,
    /// Refresh token, if issued.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as a unix timestamp, in seconds.
    #[serde(default)]
    pub expires: Option<i64>,
    /// The signed-in account.
    pub account: Account,
}

/// Response to a password reset request.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message; older deployments call it `explain`.
    #[serde(default, alias = "explain")]
    pub message: Option<String>,
}

/// Receipt returned after server-side purchase validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Service message.
    #[serde(default)]
    pub message: Option<String>,
    /// Item unlocked by the purchase.
    #[serde(default)]
    pub item_id: Option<i64>,
    /// Access fee the purchase was matched to.
    #[serde(default)]
    pub access_fee_id: Option<i64>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Service error code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Error description.
    #[serde(default)]
    pub message: Option<String>,
}

/// Parse a JSON response body.
pub fn parse_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, RemoteError> {
    serde_json::from_slice(body)
        .map_err(|e| RemoteError::Protocol(format!("Failed to parse response: {}", e)))
}

/// Turn a non-success status and body into a [`RemoteError::Rejected`].
///
/// Bodies that are not the expected JSON shape still produce a rejection,
/// with the raw body (or the status) as the message.
pub fn rejection(status: u16, body: &[u8]) -> RemoteError {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code);
    let message = parsed
        .and_then(|b| b.message)
        .or_else(|| {
            std::str::from_utf8(body)
                .ok()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .unwrap_or_else(|| format!("HTTP {}", status));

    RemoteError::Rejected {
        status,
        code,
        message,
    }
}
