//! # Accessbridge
//!
//! **Content Access Manager contract bridge for a remote account and payment service.**
//!
//! A Content Access Manager (CAM) flow controller drives login, sign-up,
//! storefront and purchase screens, and delegates every business action to
//! a contract implementation. Accessbridge is that implementation: it
//! forwards each action to a [`RemoteService`] and turns the asynchronous
//! result into exactly one success or failure callback.
//!
//! ## Features
//!
//! - **Exactly-once outcomes**: callbacks are single-shot, and a request that
//!   is dropped mid-flight still reports a failure
//! - **Typed failures**: each failure carries a fixed per-action message for
//!   display plus the underlying error and a stable code
//! - **Async, non-blocking**: `perform` returns immediately, outcomes arrive on
//!   runtime worker threads
//! - **HTTP account client**: sign-in, registration, password reset, purchase
//!   validation and sign-out over rustls
//! - **Persisted session**: tokens survive restarts, with an integrity digest
//!   and expiry check on load
//!
//! ## Quickstart
//!
//! ```no_run
//! use accessbridge::{
//!     perform_and_wait, AccountClient, ActionRequest, AuthFields, BridgeConfig,
//!     ContentAccessService, RemoteConfig, SessionConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), accessbridge::BridgeError> {
//! let remote = Arc::new(AccountClient::new(&RemoteConfig::new("your-client-id"))?);
//! let service = ContentAccessService::new(remote, BridgeConfig::default(), SessionConfig::new())?;
//! let contract = service.contract();
//!
//! let fields = AuthFields::new()
//!     .with("email", "user@example.com")
//!     .with("password", "secret");
//! match perform_and_wait(contract.as_ref(), ActionRequest::Authenticate(fields)).await {
//!     Ok(_) => println!("signed in"),
//!     Err(failure) => println!("{} ({})", failure, failure.code()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Placeholder actions
//!
//! Federated identity and catalog loading are not offered by the HTTP
//! client. By default the bridge simulates success for them after 1.25 s so
//! a flow can be exercised end to end. This is a development mock and must
//! not be shipped as an authentication path; set
//! [`PlaceholderPolicy::Reject`] or supply a [`RemoteService`] that
//! implements them.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Wire layer
pub mod protocol;

// Session layer
pub mod session;

// Remote boundary and client
pub mod client;
pub mod remote;

// Contract layer
pub mod contract;

// Host service
pub mod service;

#[cfg(any(test, feature = "test-seams"))]
pub mod testing;

// Re-exports for public API
pub use client::http::AccountClient;
pub use clock::{Clock, SystemClock};
pub use config::{BridgeConfig, Environment, PlaceholderPolicy, RemoteConfig, SessionConfig};
pub use contract::action::{
    Action, ActionRequest, AuthFields, BillingOffer, CamFlow, FederatedIdentity, PurchaseRecord,
};
pub use contract::bridge::{AccessBridge, CamContract};
pub use contract::callback::{
    perform_and_wait, ActionFailure, ActionPayload, ChannelCallback, OutcomeCallback,
};
pub use errors::{BridgeError, RemoteError};
pub use protocol::models::{Account, PurchaseReceipt};
pub use remote::RemoteService;
pub use service::ContentAccessService;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
