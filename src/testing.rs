//! Scripted [`RemoteService`] test double.

use crate::contract::action::{Action, BillingOffer, FederatedIdentity};
use crate::errors::RemoteError;
use crate::protocol::models::{Account, PurchaseReceipt};
use crate::remote::RemoteService;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A call received by [`StubRemote`], with the arguments it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `authenticate(email, password)`
    Authenticate {
        /// Email argument.
        email: String,
        /// Password argument.
        password: String,
    },
    /// `register(...)`
    Register {
        /// Full name argument.
        full_name: String,
        /// Email argument.
        email: String,
        /// Password argument.
        password: String,
        /// Confirmation argument.
        password_confirmation: String,
    },
    /// `request_password_reset(email)`
    PasswordReset {
        /// Email argument.
        email: String,
    },
    /// `validate_purchase(order_id, sku)`
    ValidatePurchase {
        /// Order ID argument.
        order_id: String,
        /// SKU argument.
        sku: String,
    },
    /// `sign_out()`
    SignOut,
    /// `federated_login(identity)`
    FederatedLogin {
        /// Identity email.
        email: String,
    },
    /// `federated_signup(identity)`
    FederatedSignup {
        /// Identity email.
        email: String,
    },
    /// `load_entitlements()`
    LoadEntitlements,
}

/// In-memory remote service that records calls and answers from a script.
///
/// Every operation succeeds unless marked with [`StubRemote::failing`].
/// Federated identity and catalog loading stay unimplemented unless
/// enabled, matching the shipped HTTP client.
#[derive(Default)]
pub struct StubRemote {
    calls: Mutex<Vec<RemoteCall>>,
    failing: HashSet<Action>,
    fail_all: bool,
    delays: HashMap<Action, Duration>,
    catalog: Option<Vec<BillingOffer>>,
    federated: bool,
    authenticated: AtomicBool,
}

impl StubRemote {
    /// A stub where everything succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the operation backing `action` fail.
    ///
    /// Restore-purchases shares the validate-purchase operation.
    pub fn failing(mut self, action: Action) -> Self {
        self.failing.insert(action);
        self
    }

    /// Make every implemented operation fail.
    pub fn failing_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Delay the operation backing `action`.
    pub fn delayed(mut self, action: Action, delay: Duration) -> Self {
        self.delays.insert(action, delay);
        self
    }

    /// Implement catalog loading, answering with `offers`.
    pub fn with_catalog(mut self, offers: Vec<BillingOffer>) -> Self {
        self.catalog = Some(offers);
        self
    }

    /// Implement federated login/signup.
    pub fn with_federated(mut self) -> Self {
        self.federated = true;
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, call: RemoteCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    async fn answer(&self, action: Action, call: RemoteCall) -> Result<(), RemoteError> {
        self.record(call);

        if let Some(delay) = self.delays.get(&action) {
            tokio::time::sleep(*delay).await;
        }

        if self.fail_all || self.failing.contains(&action) {
            return Err(RemoteError::Rejected {
                status: 400,
                code: Some(400),
                message: format!("{} rejected by stub", action),
            });
        }
        Ok(())
    }

    fn account(email: &str) -> Account {
        Account {
            id: 1,
            email: email.to_string(),
            full_name: None,
            username: None,
        }
    }
}

#[async_trait]
impl RemoteService for StubRemote {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, RemoteError> {
        let call = RemoteCall::Authenticate {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.answer(Action::Authenticate, call).await?;
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(Self::account(email))
    }

    async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<Account, RemoteError> {
        let call = RemoteCall::Register {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: password_confirmation.to_string(),
        };
        self.answer(Action::Register, call).await?;
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(Self::account(email))
    }

    async fn request_password_reset(&self, email: &str) -> Result<String, RemoteError> {
        let call = RemoteCall::PasswordReset {
            email: email.to_string(),
        };
        self.answer(Action::ResetPassword, call).await?;
        Ok("Reset email sent".to_string())
    }

    async fn validate_purchase(
        &self,
        order_id: &str,
        sku: &str,
    ) -> Result<PurchaseReceipt, RemoteError> {
        let call = RemoteCall::ValidatePurchase {
            order_id: order_id.to_string(),
            sku: sku.to_string(),
        };
        self.answer(Action::ValidatePurchase, call).await?;
        Ok(PurchaseReceipt {
            message: Some("Validated".to_string()),
            item_id: None,
            access_fee_id: None,
        })
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        self.authenticated.store(false, Ordering::SeqCst);
        self.answer(Action::SignOut, RemoteCall::SignOut).await
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn federated_login(&self, identity: &FederatedIdentity) -> Result<(), RemoteError> {
        let call = RemoteCall::FederatedLogin {
            email: identity.email.clone(),
        };
        if !self.federated {
            self.record(call);
            return Err(RemoteError::not_implemented("federated-login"));
        }
        self.answer(Action::FederatedLogin, call).await
    }

    async fn federated_signup(&self, identity: &FederatedIdentity) -> Result<(), RemoteError> {
        let call = RemoteCall::FederatedSignup {
            email: identity.email.clone(),
        };
        if !self.federated {
            self.record(call);
            return Err(RemoteError::not_implemented("federated-signup"));
        }
        self.answer(Action::FederatedSignup, call).await
    }

    async fn load_entitlements(&self) -> Result<Vec<BillingOffer>, RemoteError> {
        let Some(catalog) = &self.catalog else {
            self.record(RemoteCall::LoadEntitlements);
            return Err(RemoteError::not_implemented("load-entitlements"));
        };
        self.answer(Action::LoadEntitlements, RemoteCall::LoadEntitlements)
            .await?;
        Ok(catalog.clone())
    }
}
