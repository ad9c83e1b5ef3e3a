//! Action requests the flow controller hands to the bridge.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The fixed set of actions a flow controller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Sign in with email and password.
    Authenticate,
    /// Create an account.
    Register,
    /// Request an out-of-band password reset.
    ResetPassword,
    /// Sign in with a third-party identity.
    FederatedLogin,
    /// Sign up with a third-party identity.
    FederatedSignup,
    /// Fetch the purchasable-item catalog.
    LoadEntitlements,
    /// Validate a completed store purchase.
    ValidatePurchase,
    /// Validate previously made purchases being restored.
    RestorePurchases,
    /// Terminate the remote session.
    SignOut,
}

impl Action {
    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::Register => "register",
            Self::ResetPassword => "reset-password",
            Self::FederatedLogin => "federated-login",
            Self::FederatedSignup => "federated-signup",
            Self::LoadEntitlements => "load-entitlements",
            Self::ValidatePurchase => "validate-purchase",
            Self::RestorePurchases => "restore-purchases",
            Self::SignOut => "sign-out",
        }
    }

    /// Fixed human-readable message reported when the action fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Authenticate => "Sign In Failed",
            Self::Register => "Sign Up Failed",
            Self::ResetPassword => "Reset Password Failed",
            Self::FederatedLogin => "Federated Sign In Failed",
            Self::FederatedSignup => "Federated Sign Up Failed",
            Self::LoadEntitlements => "Loading Entitlements Failed",
            Self::ValidatePurchase | Self::RestorePurchases => "Purchase Failed",
            Self::SignOut => "Sign Out Failed",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-defined auth field input, e.g. `{"email": .., "password": ..}`.
///
/// Field names are not validated. Reading a missing key yields `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthFields(HashMap<String, String>);

impl AuthFields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name`, or an empty string when absent.
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("")
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no fields are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, String>> for AuthFields {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AuthFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A completed store purchase as reported by the platform billing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    /// Store order identifier.
    pub order_id: String,
    /// Product SKU.
    pub sku: String,
}

impl PurchaseRecord {
    /// Create a purchase record.
    pub fn new(order_id: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            sku: sku.into(),
        }
    }
}

/// Third-party identity handed over by a federated login SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedIdentity {
    /// Email reported by the identity provider.
    pub email: String,
    /// Provider-issued identity token.
    pub token: String,
}

/// A single user-initiated request, consumed by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    /// Uses `email` and `password`.
    Authenticate(AuthFields),
    /// Uses `fullName`, `email` and `password`.
    Register(AuthFields),
    /// Uses `email`.
    ResetPassword(AuthFields),
    /// Federated sign-in.
    FederatedLogin(FederatedIdentity),
    /// Federated sign-up.
    FederatedSignup(FederatedIdentity),
    /// Catalog fetch.
    LoadEntitlements,
    /// Purchases to validate; only the first is submitted.
    ValidatePurchase(Vec<PurchaseRecord>),
    /// Purchases being restored; only the first is submitted.
    RestorePurchases(Vec<PurchaseRecord>),
    /// Logout dialog result.
    SignOut {
        /// True when the user confirmed the dialog.
        confirmed: bool,
    },
}

impl ActionRequest {
    /// The action this request performs.
    pub fn action(&self) -> Action {
        match self {
            Self::Authenticate(_) => Action::Authenticate,
            Self::Register(_) => Action::Register,
            Self::ResetPassword(_) => Action::ResetPassword,
            Self::FederatedLogin(_) => Action::FederatedLogin,
            Self::FederatedSignup(_) => Action::FederatedSignup,
            Self::LoadEntitlements => Action::LoadEntitlements,
            Self::ValidatePurchase(_) => Action::ValidatePurchase,
            Self::RestorePurchases(_) => Action::RestorePurchases,
            Self::SignOut { .. } => Action::SignOut,
        }
    }
}

/// Which screens the flow controller should present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CamFlow {
    /// Authentication screens only.
    AuthOnly,
    /// Storefront only.
    StorefrontOnly,
    /// Authentication followed by storefront.
    #[default]
    AuthAndStorefront,
    /// Nothing to present.
    None,
}

/// A purchasable catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingOffer {
    /// Store product SKU.
    pub sku: String,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Localized display price.
    #[serde(default)]
    pub price: Option<String>,
}
