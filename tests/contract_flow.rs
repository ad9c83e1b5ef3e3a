//! Drives the contract through the public API with a hand-written remote.

use accessbridge::{
    perform_and_wait, Account, Action, ActionFailure, ActionPayload, ActionRequest, AuthFields,
    BridgeConfig, CamFlow, ContentAccessService, FederatedIdentity, OutcomeCallback,
    PlaceholderPolicy, PurchaseReceipt, PurchaseRecord, RemoteError, RemoteService, SessionConfig,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

/// Accepts one password; federated login is implemented and always rejects.
#[derive(Default)]
struct PasswordRemote {
    signed_in: AtomicBool,
    sign_outs: AtomicUsize,
    validated: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl RemoteService for PasswordRemote {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, RemoteError> {
        if password != "correct horse" {
            return Err(RemoteError::Rejected {
                status: 401,
                code: Some(401),
                message: "Invalid credentials".to_string(),
            });
        }
        self.signed_in.store(true, Ordering::SeqCst);
        Ok(Account {
            id: 5,
            email: email.to_string(),
            full_name: None,
            username: None,
        })
    }

    async fn register(
        &self,
        _full_name: &str,
        _email: &str,
        _password: &str,
        _password_confirmation: &str,
    ) -> Result<Account, RemoteError> {
        Err(RemoteError::Transport("connection refused".to_string()))
    }

    async fn request_password_reset(&self, _email: &str) -> Result<String, RemoteError> {
        Ok("sent".to_string())
    }

    async fn validate_purchase(
        &self,
        order_id: &str,
        sku: &str,
    ) -> Result<PurchaseReceipt, RemoteError> {
        self.validated
            .lock()
            .unwrap()
            .push((order_id.to_string(), sku.to_string()));
        Ok(PurchaseReceipt {
            message: None,
            item_id: Some(1),
            access_fee_id: None,
        })
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.signed_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }

    async fn federated_login(&self, _identity: &FederatedIdentity) -> Result<(), RemoteError> {
        Err(RemoteError::Rejected {
            status: 403,
            code: None,
            message: "token rejected".to_string(),
        })
    }
}

fn service(remote: Arc<PasswordRemote>) -> ContentAccessService<PasswordRemote> {
    let config = BridgeConfig {
        placeholder_policy: PlaceholderPolicy::Reject,
        ..BridgeConfig::default()
    };
    ContentAccessService::new(remote, config, SessionConfig::new()).unwrap()
}

fn login(password: &str) -> ActionRequest {
    ActionRequest::Authenticate(
        AuthFields::new()
            .with("email", "user@test.test")
            .with("password", password),
    )
}

#[tokio::test]
async fn sign_in_purchase_sign_out() {
    let remote = Arc::new(PasswordRemote::default());
    let service = service(Arc::clone(&remote));
    let contract = service.contract();

    assert_eq!(contract.current_flow(), CamFlow::AuthAndStorefront);
    assert!(!contract.is_session_active());

    let failure = perform_and_wait(contract.as_ref(), login("wrong"))
        .await
        .unwrap_err();
    assert_eq!(failure.reason(), "Sign In Failed");
    assert!(!contract.is_session_active());

    perform_and_wait(contract.as_ref(), login("correct horse"))
        .await
        .unwrap();
    assert!(contract.is_session_active());

    let purchases = vec![
        PurchaseRecord::new("GPA.100", "premium.monthly"),
        PurchaseRecord::new("GPA.200", "premium.yearly"),
    ];
    perform_and_wait(contract.as_ref(), ActionRequest::ValidatePurchase(purchases))
        .await
        .unwrap();
    assert_eq!(
        *remote.validated.lock().unwrap(),
        vec![("GPA.100".to_string(), "premium.monthly".to_string())]
    );

    perform_and_wait(contract.as_ref(), ActionRequest::SignOut { confirmed: false })
        .await
        .unwrap();
    assert_eq!(remote.sign_outs.load(Ordering::SeqCst), 0);
    assert!(contract.is_session_active());

    perform_and_wait(contract.as_ref(), ActionRequest::SignOut { confirmed: true })
        .await
        .unwrap();
    assert_eq!(remote.sign_outs.load(Ordering::SeqCst), 1);
    assert!(!contract.is_session_active());

    contract.on_flow_finished();
}

#[tokio::test]
async fn transport_errors_keep_their_type() {
    let service = service(Arc::new(PasswordRemote::default()));
    let contract = service.contract();

    let failure = perform_and_wait(contract.as_ref(), ActionRequest::Register(AuthFields::new()))
        .await
        .unwrap_err();
    assert_eq!(failure.reason(), "Sign Up Failed");
    assert_eq!(failure.code(), "REMOTE_TRANSPORT");
    assert_eq!(failure.action(), Action::Register);
}

#[tokio::test]
async fn implemented_federated_login_is_not_simulated() {
    let service = service(Arc::new(PasswordRemote::default()));
    let contract = service.contract();
    let identity = FederatedIdentity {
        email: "user@test.test".to_string(),
        token: "expired".to_string(),
    };

    let failure = perform_and_wait(contract.as_ref(), ActionRequest::FederatedLogin(identity))
        .await
        .unwrap_err();
    assert_eq!(failure.reason(), "Federated Sign In Failed");
    assert_eq!(failure.code(), "REMOTE_REJECTED");
}

#[tokio::test]
async fn unimplemented_catalog_rejected_by_policy() {
    let service = service(Arc::new(PasswordRemote::default()));
    let failure = perform_and_wait(service.contract().as_ref(), ActionRequest::LoadEntitlements)
        .await
        .unwrap_err();
    assert_eq!(failure.reason(), "Loading Entitlements Failed");
    assert_eq!(failure.code(), "NOT_IMPLEMENTED");
}

struct ThreadRecorder {
    thread: Arc<Mutex<Option<ThreadId>>>,
    done: tokio::sync::oneshot::Sender<bool>,
}

impl OutcomeCallback for ThreadRecorder {
    fn on_success(self: Box<Self>, _payload: ActionPayload) {
        *self.thread.lock().unwrap() = Some(std::thread::current().id());
        let _ = self.done.send(true);
    }

    fn on_failure(self: Box<Self>, _failure: ActionFailure) {
        *self.thread.lock().unwrap() = Some(std::thread::current().id());
        let _ = self.done.send(false);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_password_outcome_arrives_from_runtime() {
    let service = service(Arc::new(PasswordRemote::default()));
    let contract = service.contract();
    let thread = Arc::new(Mutex::new(None));
    let (done, outcome) = tokio::sync::oneshot::channel();

    let fields = AuthFields::new().with("email", "user@test.test");
    contract.perform(
        ActionRequest::ResetPassword(fields),
        Box::new(ThreadRecorder {
            thread: Arc::clone(&thread),
            done,
        }),
    );

    assert!(outcome.await.unwrap());
    assert!(thread.lock().unwrap().is_some());
}
