//! Single-shot outcome delivery.
//!
//! Both handlers consume the callback, so delivering two outcomes for one
//! request cannot be expressed. [`Completion`] covers the other half: if it
//! is dropped without an outcome (a panicking remote call, a cancelled
//! runtime) it reports [`BridgeError::OutcomeDropped`] instead of going
//! silent.
//!
//! Outcomes may be delivered on any runtime worker thread.

use crate::contract::action::{Action, ActionRequest, BillingOffer};
use crate::contract::bridge::CamContract;
use crate::errors::BridgeError;
use std::fmt;
use tokio::sync::oneshot;

/// Data carried by a successful outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPayload {
    /// The action completed with nothing to report.
    Completed,
    /// The purchasable-item catalog.
    Entitlements(Vec<BillingOffer>),
}

/// A failed action: the fixed presentation message plus the typed cause.
#[derive(Debug, Clone)]
pub struct ActionFailure {
    action: Action,
    error: BridgeError,
}

impl ActionFailure {
    /// Create a failure for `action` caused by `error`.
    pub fn new(action: Action, error: BridgeError) -> Self {
        Self { action, error }
    }

    /// The action that failed.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Human-readable reason, fixed per action.
    pub fn reason(&self) -> &'static str {
        self.action.failure_message()
    }

    /// Stable machine-readable code of the cause.
    pub fn code(&self) -> &'static str {
        self.error.code()
    }

    /// The typed cause.
    pub fn error(&self) -> &BridgeError {
        &self.error
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Outcome handlers supplied by the caller for one request.
pub trait OutcomeCallback: Send {
    /// The action succeeded.
    fn on_success(self: Box<Self>, payload: ActionPayload);

    /// The action failed.
    fn on_failure(self: Box<Self>, failure: ActionFailure);
}

/// Owns a request's callback until exactly one outcome is delivered.
pub struct Completion {
    action: Action,
    callback: Option<Box<dyn OutcomeCallback>>,
}

impl Completion {
    /// Wrap `callback` for a request performing `action`.
    pub fn new(action: Action, callback: Box<dyn OutcomeCallback>) -> Self {
        Self {
            action,
            callback: Some(callback),
        }
    }

    /// Deliver `outcome`, consuming the completion.
    pub fn complete(mut self, outcome: Result<ActionPayload, BridgeError>) {
        if let Some(callback) = self.callback.take() {
            deliver(self.action, callback, outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            tracing::error!(action = %self.action, "request dropped without an outcome");
            callback.on_failure(ActionFailure::new(
                self.action,
                BridgeError::OutcomeDropped {
                    action: self.action,
                },
            ));
        }
    }
}

fn deliver(
    action: Action,
    callback: Box<dyn OutcomeCallback>,
    outcome: Result<ActionPayload, BridgeError>,
) {
    match outcome {
        Ok(payload) => {
            tracing::debug!(action = %action, "action succeeded");
            callback.on_success(payload);
        }
        Err(error) => {
            tracing::warn!(action = %action, code = error.code(), error = %error, "action failed");
            callback.on_failure(ActionFailure::new(action, error));
        }
    }
}

/// Callback that forwards its outcome into a oneshot channel.
pub struct ChannelCallback {
    sender: oneshot::Sender<Result<ActionPayload, ActionFailure>>,
}

impl ChannelCallback {
    /// Create a callback and the receiver its outcome will arrive on.
    pub fn new() -> (Self, oneshot::Receiver<Result<ActionPayload, ActionFailure>>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }
}

impl OutcomeCallback for ChannelCallback {
    fn on_success(self: Box<Self>, payload: ActionPayload) {
        // Receiver gone means the caller stopped waiting.
        let _ = self.sender.send(Ok(payload));
    }

    fn on_failure(self: Box<Self>, failure: ActionFailure) {
        let _ = self.sender.send(Err(failure));
    }
}

/// Perform `request` and await its outcome.
pub async fn perform_and_wait(
    contract: &dyn CamContract,
    request: ActionRequest,
) -> Result<ActionPayload, ActionFailure> {
    let action = request.action();
    let (callback, receiver) = ChannelCallback::new();
    contract.perform(request, Box::new(callback));
    receiver.await.unwrap_or_else(|_| {
        Err(ActionFailure::new(
            action,
            BridgeError::OutcomeDropped { action },
        ))
    })
}
