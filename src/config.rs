//! Accessbridge configuration.

use crate::contract::action::CamFlow;
use crate::BridgeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Delay used when simulating unimplemented actions.
pub const PLACEHOLDER_DELAY: Duration = Duration::from_millis(1250);

/// Account service deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Staging deployment.
    #[default]
    Staging,
    /// Production deployment.
    Production,
}

impl Environment {
    /// Default API base URL for this environment.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Staging => "https://staging-v2.inplayer.com",
            Self::Production => "https://services.inplayer.com",
        }
    }
}

/// Configuration for the HTTP account client.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Merchant client ID (UUID format).
    pub client_id: String,

    /// Referrer reported on registration.
    pub referrer: Option<String>,

    /// Deployment to talk to.
    pub environment: Environment,

    /// Overrides the environment's base URL (tests, proxies).
    pub base_url: Option<String>,

    /// User-Agent product identifier (e.g., "myapp-android")
    pub user_agent_product: String,

    /// Namespace for the persisted session under the data directory.
    pub session_namespace: String,

    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RemoteConfig {
    /// Create a config with defaults for everything but the client ID.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            referrer: None,
            environment: Environment::default(),
            base_url: None,
            user_agent_product: "accessbridge".to_string(),
            session_namespace: "accessbridge".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// The base URL requests are sent to.
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.client_id.trim().is_empty() {
            return Err(BridgeError::ConfigError(
                "client_id cannot be empty".to_string(),
            ));
        }
        if self.session_namespace.trim().is_empty() {
            return Err(BridgeError::ConfigError(
                "session_namespace cannot be empty".to_string(),
            ));
        }
        reqwest::Url::parse(self.effective_base_url()).map_err(|e| {
            BridgeError::ConfigError(format!(
                "invalid base URL {:?}: {}",
                self.effective_base_url(),
                e
            ))
        })?;
        if self.request_timeout.is_zero() {
            return Err(BridgeError::ConfigError(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the bridge does when the remote service reports an action as
/// not implemented (federated identity, catalog loading).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderPolicy {
    /// Development mock: report success after `delay`. Catalogs are empty.
    Simulate {
        /// How long to wait before reporting success.
        delay: Duration,
    },
    /// Report the action as failed.
    Reject,
}

impl Default for PlaceholderPolicy {
    fn default() -> Self {
        Self::Simulate {
            delay: PLACEHOLDER_DELAY,
        }
    }
}

/// Bridge-wide behaviour.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Screens the flow controller should present. Fixed for the bridge's lifetime.
    pub flow: CamFlow,

    // TODO: derive from the loaded entitlements once the catalog endpoint exists.
    /// Reported by `requires_purchase`.
    pub purchase_required: bool,

    /// Handling of unimplemented remote actions.
    pub placeholder_policy: PlaceholderPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            flow: CamFlow::default(),
            purchase_required: true,
            placeholder_policy: PlaceholderPolicy::default(),
        }
    }
}

/// Host-supplied plugin configuration (flow variant, auth-field setup, ...).
///
/// Owned and mutated by the host; the bridge only reads snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionConfig(HashMap<String, String>);

impl SessionConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flat JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json)
            .map_err(|e| BridgeError::ConfigError(format!("Invalid plugin config: {}", e)))
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, String>> for SessionConfig {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}
