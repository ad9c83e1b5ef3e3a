//! The remote account/payment service boundary.
//!
//! The bridge talks to the service only through [`RemoteService`]. Session
//! state is ambient: implementations keep the signed-in session themselves
//! and it is never passed per call.

use crate::contract::action::{BillingOffer, FederatedIdentity};
use crate::errors::RemoteError;
use crate::protocol::models::{Account, PurchaseReceipt};
use async_trait::async_trait;

/// Async operations offered by a remote account/payment service.
///
/// Federated identity and catalog loading have default implementations
/// reporting [`RemoteError::NotImplemented`]; the bridge's placeholder
/// policy decides what to do with that.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Sign in with credentials, establishing the ambient session.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, RemoteError>;

    /// Create an account and sign in.
    async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<Account, RemoteError>;

    /// Request an out-of-band password reset. Returns the service message.
    async fn request_password_reset(&self, email: &str) -> Result<String, RemoteError>;

    /// Validate a store purchase server-side.
    async fn validate_purchase(
        &self,
        order_id: &str,
        sku: &str,
    ) -> Result<PurchaseReceipt, RemoteError>;

    /// Terminate the ambient session.
    async fn sign_out(&self) -> Result<(), RemoteError>;

    /// Whether an ambient session is currently active.
    fn is_authenticated(&self) -> bool;

    /// Sign in with a third-party identity.
    async fn federated_login(&self, _identity: &FederatedIdentity) -> Result<(), RemoteError> {
        Err(RemoteError::not_implemented("federated-login"))
    }

    /// Sign up with a third-party identity.
    async fn federated_signup(&self, _identity: &FederatedIdentity) -> Result<(), RemoteError> {
        Err(RemoteError::not_implemented("federated-signup"))
    }

    /// Fetch the purchasable-item catalog.
    async fn load_entitlements(&self) -> Result<Vec<BillingOffer>, RemoteError> {
        Err(RemoteError::not_implemented("load-entitlements"))
    }
}
