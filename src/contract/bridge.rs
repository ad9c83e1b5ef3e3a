//! The access bridge: the contract implementation the flow controller
//! calls into.
//!
//! Each `perform` spawns one task on the runtime captured at construction
//! and returns immediately. The task runs the remote operation and hands
//! the result to the request's [`Completion`], so every request ends in
//! exactly one callback. Requests share no mutable state.

use crate::config::{BridgeConfig, PlaceholderPolicy, SessionConfig};
use crate::contract::action::{Action, ActionRequest, CamFlow};
use crate::contract::callback::{ActionPayload, Completion, OutcomeCallback};
use crate::errors::{BridgeError, RemoteError};
use crate::remote::RemoteService;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Interface a Content Access Manager flow controller drives.
pub trait CamContract: Send + Sync {
    /// Start `request`; exactly one of the callback's handlers runs later,
    /// possibly on another thread.
    fn perform(&self, request: ActionRequest, callback: Box<dyn OutcomeCallback>);

    /// Snapshot of the host-owned plugin configuration.
    fn session_config(&self) -> SessionConfig;

    /// Whether the user is signed in.
    fn is_session_active(&self) -> bool;

    /// Whether content access needs a purchase.
    fn requires_purchase(&self) -> bool;

    /// Screens to present.
    fn current_flow(&self) -> CamFlow;

    /// Called once when the whole flow concludes.
    fn on_flow_finished(&self);
}

/// [`CamContract`] implementation backed by a [`RemoteService`].
pub struct AccessBridge<R: ?Sized> {
    remote: Arc<R>,
    config: BridgeConfig,
    plugin_config: watch::Receiver<SessionConfig>,
    runtime: Handle,
}

impl<R: RemoteService + ?Sized + 'static> AccessBridge<R> {
    /// Create a bridge driven by the current tokio runtime.
    ///
    /// # Errors
    /// Returns `Runtime` when called outside a tokio runtime.
    pub fn new(
        remote: Arc<R>,
        config: BridgeConfig,
        plugin_config: watch::Receiver<SessionConfig>,
    ) -> Result<Self, BridgeError> {
        let runtime = Handle::try_current()
            .map_err(|e| BridgeError::Runtime(format!("No tokio runtime available: {}", e)))?;
        Ok(Self::with_runtime(remote, config, plugin_config, runtime))
    }

    /// Create a bridge that spawns requests on `runtime`.
    pub fn with_runtime(
        remote: Arc<R>,
        config: BridgeConfig,
        plugin_config: watch::Receiver<SessionConfig>,
        runtime: Handle,
    ) -> Self {
        Self {
            remote,
            config,
            plugin_config,
            runtime,
        }
    }

    /// Logout dialog result without a callback.
    ///
    /// Fire-and-forget: a confirmed logout terminates the remote session in
    /// the background, an unconfirmed one does nothing.
    pub fn logout(&self, confirmed: bool) {
        if !confirmed {
            tracing::debug!("logout dismissed");
            return;
        }
        let remote = Arc::clone(&self.remote);
        self.runtime.spawn(async move {
            if let Err(e) = remote.sign_out().await {
                tracing::warn!(error = %e, "remote sign-out failed");
            }
        });
    }

    /// The bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl<R: RemoteService + ?Sized + 'static> CamContract for AccessBridge<R> {
    fn perform(&self, request: ActionRequest, callback: Box<dyn OutcomeCallback>) {
        let action = request.action();
        tracing::debug!(action = %action, "performing action");

        let completion = Completion::new(action, callback);
        let remote = Arc::clone(&self.remote);
        let policy = self.config.placeholder_policy;

        self.runtime.spawn(async move {
            let outcome = execute(remote.as_ref(), policy, request).await;
            completion.complete(outcome);
        });
    }

    fn session_config(&self) -> SessionConfig {
        self.plugin_config.borrow().clone()
    }

    fn is_session_active(&self) -> bool {
        self.remote.is_authenticated()
    }

    fn requires_purchase(&self) -> bool {
        self.config.purchase_required
    }

    fn current_flow(&self) -> CamFlow {
        self.config.flow
    }

    fn on_flow_finished(&self) {
        tracing::info!("content access flow finished");
    }
}

fn failed(action: Action, source: RemoteError) -> BridgeError {
    BridgeError::RemoteOperationFailed { action, source }
}

/// Run one request against the remote service.
async fn execute<R: RemoteService + ?Sized>(
    remote: &R,
    policy: PlaceholderPolicy,
    request: ActionRequest,
) -> Result<ActionPayload, BridgeError> {
    let action = request.action();

    match request {
        ActionRequest::Authenticate(fields) => remote
            .authenticate(fields.get("email"), fields.get("password"))
            .await
            .map(|_| ActionPayload::Completed)
            .map_err(|e| failed(action, e)),

        ActionRequest::Register(fields) => {
            let password = fields.get("password");
            remote
                .register(fields.get("fullName"), fields.get("email"), password, password)
                .await
                .map(|_| ActionPayload::Completed)
                .map_err(|e| failed(action, e))
        }

        ActionRequest::ResetPassword(fields) => remote
            .request_password_reset(fields.get("email"))
            .await
            .map(|_| ActionPayload::Completed)
            .map_err(|e| failed(action, e)),

        ActionRequest::FederatedLogin(identity) => {
            let result = remote.federated_login(&identity).await;
            placeholder(action, policy, result.map(|()| ActionPayload::Completed)).await
        }

        ActionRequest::FederatedSignup(identity) => {
            let result = remote.federated_signup(&identity).await;
            placeholder(action, policy, result.map(|()| ActionPayload::Completed)).await
        }

        ActionRequest::LoadEntitlements => {
            let result = remote.load_entitlements().await;
            placeholder(action, policy, result.map(ActionPayload::Entitlements)).await
        }

        ActionRequest::ValidatePurchase(records) | ActionRequest::RestorePurchases(records) => {
            let first = records
                .first()
                .ok_or(BridgeError::MissingPurchase { action })?;
            if records.len() > 1 {
                tracing::debug!(
                    action = %action,
                    ignored = records.len() - 1,
                    "validating first purchase record only"
                );
            }
            remote
                .validate_purchase(&first.order_id, &first.sku)
                .await
                .map(|_| ActionPayload::Completed)
                .map_err(|e| failed(action, e))
        }

        ActionRequest::SignOut { confirmed } => {
            if confirmed {
                if let Err(e) = remote.sign_out().await {
                    tracing::warn!(error = %e, "remote sign-out failed");
                }
            }
            Ok(ActionPayload::Completed)
        }
    }
}

/// Apply the placeholder policy to an operation the service may not offer.
async fn placeholder(
    action: Action,
    policy: PlaceholderPolicy,
    result: Result<ActionPayload, RemoteError>,
) -> Result<ActionPayload, BridgeError> {
    match result {
        Err(RemoteError::NotImplemented { operation }) => match policy {
            PlaceholderPolicy::Simulate { delay } => {
                tracing::warn!(
                    action = %action,
                    "{} not implemented by remote service, simulating success",
                    operation
                );
                tokio::time::sleep(delay).await;
                Ok(match action {
                    Action::LoadEntitlements => ActionPayload::Entitlements(Vec::new()),
                    _ => ActionPayload::Completed,
                })
            }
            PlaceholderPolicy::Reject => {
                Err(failed(action, RemoteError::NotImplemented { operation }))
            }
        },
        other => other.map_err(|e| failed(action, e)),
    }
}
