//! Reqwest-based HTTP client for the account service.
//!
//! Implements [`RemoteService`] and owns the ambient session: tokens from
//! authenticate/register are kept in memory and, when a [`SessionStore`] is
//! attached, persisted so a restart resumes the signed-in state.

use crate::clock::{Clock, SystemClock};
use crate::config::RemoteConfig;
use crate::errors::RemoteError;
use crate::protocol::models::{
    parse_body, rejection, Account, AuthResponse, MessageResponse, PurchaseReceipt,
};
use crate::protocol::token::{from_unix, jwt_expiry};
use crate::remote::RemoteService;
use crate::session::record::{SessionRecord, SessionRejection};
use crate::session::store::SessionStore;
use crate::BridgeError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use std::sync::{Arc, RwLock};

/// HTTP client for the account and payment API.
pub struct AccountClient {
    client: Client,
    base_url: String,
    client_id: String,
    referrer: String,
    user_agent: String,
    clock: Arc<dyn Clock>,
    store: Option<SessionStore>,
    session: RwLock<Option<SessionRecord>>,
}

impl AccountClient {
    /// Create a client with a persisted session under the config's namespace.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - HTTP client creation fails
    /// - The session directory cannot be created
    pub fn new(config: &RemoteConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        let store = SessionStore::new(&config.session_namespace)
            .map_err(|e| BridgeError::ConfigError(e.to_string()))?;
        Self::build(config, Some(store), Arc::new(SystemClock))
    }

    /// Create a client that keeps the session in memory only.
    pub fn in_memory(config: &RemoteConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        Self::build(config, None, Arc::new(SystemClock))
    }

    /// Create a client with an explicit store and clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn with_parts(
        config: &RemoteConfig,
        store: Option<SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        Self::build(config, store, clock)
    }

    fn build(
        config: &RemoteConfig,
        store: Option<SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BridgeError::ConfigError(format!("Failed to create client: {}", e)))?;

        let session = match &store {
            Some(store) => restore_session(store, clock.as_ref()),
            None => None,
        };

        Ok(Self {
            client,
            base_url: config.effective_base_url().to_string(),
            client_id: config.client_id.clone(),
            referrer: config.referrer.clone().unwrap_or_default(),
            user_agent: build_user_agent(config),
            clock,
            store,
            session: RwLock::new(session),
        })
    }

    /// Get the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The signed-in account, if any.
    pub fn current_account(&self) -> Option<Account> {
        self.read_session().map(|s| s.account)
    }

    fn read_session(&self) -> Option<SessionRecord> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn write_session(&self, record: Option<SessionRecord>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = record;
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
    }

    fn bearer(&self) -> Result<String, RemoteError> {
        self.read_session()
            .filter(|s| !s.is_expired(self.clock.as_ref()))
            .map(|s| format!("Bearer {}", s.access_token))
            .ok_or(RemoteError::NoSession)
    }

    /// Send a request and return the body of a success response.
    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to read body: {}", e)))?
            .to_vec();

        if !status.is_success() {
            return Err(rejection(status.as_u16(), &body));
        }
        Ok(body)
    }

    /// Install the session from an authenticate/register response.
    fn establish(&self, response: AuthResponse) -> Account {
        let expires_at = response
            .expires
            .and_then(from_unix)
            .or_else(|| jwt_expiry(&response.access_token));

        let record = SessionRecord::new(
            response.access_token,
            response.refresh_token,
            expires_at,
            response.account.clone(),
            self.clock.as_ref(),
        );

        if let Some(store) = &self.store {
            // The in-memory session still works when persistence fails.
            if let Err(e) = store.save(&record) {
                tracing::warn!(error = %e, "failed to persist session");
            }
        }
        self.write_session(Some(record));
        tracing::info!(account_id = response.account.id, "session established");
        response.account
    }

    fn end_session(&self) {
        self.write_session(None);
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "failed to clear persisted session");
            }
        }
    }
}

#[async_trait]
impl RemoteService for AccountClient {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, RemoteError> {
        tracing::debug!("authenticating account");
        let form = [
            ("username", email),
            ("password", password),
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
        ];
        let body = self
            .send(
                self.request(reqwest::Method::POST, "/accounts/authenticate")
                    .form(&form),
            )
            .await?;
        let response: AuthResponse = parse_body(&body)?;
        Ok(self.establish(response))
    }

    async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<Account, RemoteError> {
        tracing::debug!("registering account");
        let form = [
            ("full_name", full_name),
            ("username", email),
            ("password", password),
            ("password_confirmation", password_confirmation),
            ("type", "consumer"),
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("referrer", self.referrer.as_str()),
        ];
        let body = self
            .send(self.request(reqwest::Method::POST, "/accounts").form(&form))
            .await?;
        let response: AuthResponse = parse_body(&body)?;
        Ok(self.establish(response))
    }

    async fn request_password_reset(&self, email: &str) -> Result<String, RemoteError> {
        let form = [("email", email), ("merchant_uuid", self.client_id.as_str())];
        let body = self
            .send(
                self.request(reqwest::Method::POST, "/accounts/forgot-password")
                    .form(&form),
            )
            .await?;
        // Some deployments answer with an empty body.
        if body.is_empty() {
            return Ok(String::new());
        }
        let response: MessageResponse = parse_body(&body)?;
        Ok(response.message.unwrap_or_default())
    }

    async fn validate_purchase(
        &self,
        order_id: &str,
        sku: &str,
    ) -> Result<PurchaseReceipt, RemoteError> {
        let bearer = self.bearer()?;
        let form = [("receipt", order_id), ("product_name", sku)];
        let body = self
            .send(
                self.request(reqwest::Method::POST, "/v2/external-payments/validate")
                    .header(AUTHORIZATION, bearer)
                    .form(&form),
            )
            .await?;
        if body.is_empty() {
            return Ok(PurchaseReceipt {
                message: None,
                item_id: None,
                access_fee_id: None,
            });
        }
        parse_body(&body)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        let bearer = self.bearer();
        // The local session ends whatever the service says.
        self.end_session();
        let bearer = bearer?;
        self.send(
            self.request(reqwest::Method::DELETE, "/accounts/logout")
                .header(AUTHORIZATION, bearer),
        )
        .await?;
        tracing::info!("session terminated");
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.read_session()
            .is_some_and(|s| !s.is_expired(self.clock.as_ref()))
    }
}

/// Load and verify a persisted session, discarding it when unusable.
fn restore_session(store: &SessionStore, clock: &dyn Clock) -> Option<SessionRecord> {
    let record = match store.load() {
        Ok(record) => record?,
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable session");
            let _ = store.clear();
            return None;
        }
    };

    match record.verify(clock) {
        Ok(()) => {
            tracing::debug!(account_id = record.account.id, "restored persisted session");
            Some(record)
        }
        Err(SessionRejection::Expired) => {
            tracing::info!("persisted session expired");
            let _ = store.clear();
            None
        }
        Err(SessionRejection::Tampered) => {
            tracing::warn!("persisted session failed integrity check");
            let _ = store.clear();
            None
        }
    }
}

/// Build a User-Agent string from config.
///
/// Format: `<product> accessbridge/<version>`
pub fn build_user_agent(config: &RemoteConfig) -> String {
    format!(
        "{} accessbridge/{}",
        config.user_agent_product,
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use mockito::Matcher;
    use tempfile::TempDir;

    const AUTH_BODY: &str = r#"{
        "access_token": "access-1",
        "refresh_token": "refresh-1",
        "expires": 1736949600,
        "account": {"id": 42, "email": "user@test.test", "full_name": "Test User"}
    }"#;

    fn config_for(server: &mockito::ServerGuard) -> RemoteConfig {
        let mut config = RemoteConfig::new("client-123");
        config.base_url = Some(server.url());
        config.referrer = Some("zapp-test".to_string());
        config
    }

    // 2025-01-15T12:00:00Z; AUTH_BODY expires two hours later.
    fn clock() -> Arc<MockClock> {
        Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"))
    }

    // Auth body with no `expires`, so expiry comes from the token itself.
    fn jwt_auth_body(exp: i64) -> String {
        let token = format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#).as_bytes())
        );
        format!(
            r#"{{"access_token":"{token}","account":{{"id":42,"email":"user@test.test"}}}}"#
        )
    }

    #[test]
    fn test_build_user_agent() {
        let mut config = RemoteConfig::new("client");
        config.user_agent_product = "myapp-android".to_string();
        let ua = build_user_agent(&config);
        assert_eq!(
            ua,
            format!("myapp-android accessbridge/{}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = RemoteConfig::new("");
        assert!(matches!(
            AccountClient::in_memory(&config),
            Err(BridgeError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_establishes_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/authenticate")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "user@test.test".into()),
                Matcher::UrlEncoded("password".into(), "pw".into()),
                Matcher::UrlEncoded("grant_type".into(), "password".into()),
                Matcher::UrlEncoded("client_id".into(), "client-123".into()),
            ]))
            .with_status(200)
            .with_body(AUTH_BODY)
            .create_async()
            .await;

        let client = AccountClient::with_parts(&config_for(&server), None, clock()).unwrap();
        assert!(!client.is_authenticated());

        let account = client.authenticate("user@test.test", "pw").await.unwrap();
        assert_eq!(account.id, 42);
        assert!(client.is_authenticated());
        assert_eq!(client.current_account().unwrap().email, "user@test.test");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(401)
            .with_body(r#"{"code":401,"message":"Invalid credentials"}"#)
            .create_async()
            .await;

        let client = AccountClient::with_parts(&config_for(&server), None, clock()).unwrap();
        let err = client.authenticate("user@test.test", "bad").await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { status: 401, .. }));
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_sends_confirmation_and_referrer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("full_name".into(), "Test User".into()),
                Matcher::UrlEncoded("password_confirmation".into(), "pw".into()),
                Matcher::UrlEncoded("type".into(), "consumer".into()),
                Matcher::UrlEncoded("referrer".into(), "zapp-test".into()),
            ]))
            .with_status(200)
            .with_body(AUTH_BODY)
            .create_async()
            .await;

        let client = AccountClient::with_parts(&config_for(&server), None, clock()).unwrap();
        client
            .register("Test User", "user@test.test", "pw", "pw")
            .await
            .unwrap();
        assert!(client.is_authenticated());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_password_reset_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/forgot-password")
            .match_body(Matcher::UrlEncoded("merchant_uuid".into(), "client-123".into()))
            .with_status(200)
            .with_body(r#"{"explain":"Email sent"}"#)
            .create_async()
            .await;

        let client = AccountClient::with_parts(&config_for(&server), None, clock()).unwrap();
        let message = client.request_password_reset("user@test.test").await.unwrap();
        assert_eq!(message, "Email sent");
    }

    #[tokio::test]
    async fn test_validate_purchase_requires_session() {
        let server = mockito::Server::new_async().await;
        let client = AccountClient::with_parts(&config_for(&server), None, clock()).unwrap();
        let err = client.validate_purchase("GPA.1", "sku.monthly").await.unwrap_err();
        assert!(matches!(err, RemoteError::NoSession));
    }

    #[tokio::test]
    async fn test_validate_purchase_with_bearer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(200)
            .with_body(AUTH_BODY)
            .create_async()
            .await;
        let validate = server
            .mock("POST", "/v2/external-payments/validate")
            .match_header("authorization", "Bearer access-1")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("receipt".into(), "GPA.1".into()),
                Matcher::UrlEncoded("product_name".into(), "sku.monthly".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"message":"Validated","item_id":9}"#)
            .create_async()
            .await;

        let client = AccountClient::with_parts(&config_for(&server), None, clock()).unwrap();
        client.authenticate("user@test.test", "pw").await.unwrap();
        let receipt = client.validate_purchase("GPA.1", "sku.monthly").await.unwrap();
        assert_eq!(receipt.item_id, Some(9));
        validate.assert_async().await;
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_on_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(200)
            .with_body(AUTH_BODY)
            .create_async()
            .await;
        server
            .mock("DELETE", "/accounts/logout")
            .with_status(500)
            .create_async()
            .await;

        let client = AccountClient::with_parts(&config_for(&server), None, clock()).unwrap();
        client.authenticate("user@test.test", "pw").await.unwrap();

        assert!(client.sign_out().await.is_err());
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_session_persists_across_clients() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(200)
            .with_body(AUTH_BODY)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let config = config_for(&server);

        let first = AccountClient::with_parts(&config, Some(store.clone()), clock()).unwrap();
        first.authenticate("user@test.test", "pw").await.unwrap();

        let second = AccountClient::with_parts(&config, Some(store), clock()).unwrap();
        assert!(second.is_authenticated());
        assert_eq!(second.current_account().unwrap().id, 42);
    }

    #[tokio::test]
    async fn test_expired_persisted_session_is_discarded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(200)
            .with_body(AUTH_BODY)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let config = config_for(&server);

        let first = AccountClient::with_parts(&config, Some(store.clone()), clock()).unwrap();
        first.authenticate("user@test.test", "pw").await.unwrap();

        let later = Arc::new(MockClock::from_rfc3339("2025-01-16T12:00:00Z"));
        let second = AccountClient::with_parts(&config, Some(store.clone()), later).unwrap();
        assert!(!second.is_authenticated());
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_session_lapses_when_clock_passes_expiry() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(200)
            .with_body(AUTH_BODY)
            .create_async()
            .await;
        let validate = server
            .mock("POST", "/v2/external-payments/validate")
            .expect(0)
            .create_async()
            .await;

        let clock = clock();
        let client = AccountClient::with_parts(&config_for(&server), None, clock.clone()).unwrap();
        client.authenticate("user@test.test", "pw").await.unwrap();
        assert!(client.is_authenticated());

        clock.advance(chrono::Duration::hours(3));
        assert!(!client.is_authenticated());
        let err = client.validate_purchase("GPA.1", "sku.monthly").await.unwrap_err();
        assert!(matches!(err, RemoteError::NoSession));
        validate.assert_async().await;
    }

    #[tokio::test]
    async fn test_expiry_falls_back_to_jwt_claim() {
        let mut server = mockito::Server::new_async().await;
        // 2025-01-15T10:00:00Z, before the test clock.
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(200)
            .with_body(jwt_auth_body(1736935200))
            .create_async()
            .await;

        let client = AccountClient::with_parts(&config_for(&server), None, clock()).unwrap();
        client.authenticate("user@test.test", "pw").await.unwrap();
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_jwt_expiry_applies_to_live_session() {
        let mut server = mockito::Server::new_async().await;
        // 2025-01-15T13:00:00Z, an hour after the test clock.
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(200)
            .with_body(jwt_auth_body(1736946000))
            .create_async()
            .await;

        let clock = clock();
        let client = AccountClient::with_parts(&config_for(&server), None, clock.clone()).unwrap();
        client.authenticate("user@test.test", "pw").await.unwrap();
        assert!(client.is_authenticated());

        clock.advance(chrono::Duration::minutes(61));
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_tampered_persisted_session_is_discarded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/authenticate")
            .with_status(200)
            .with_body(AUTH_BODY)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let config = config_for(&server);

        let first = AccountClient::with_parts(&config, Some(store.clone()), clock()).unwrap();
        first.authenticate("user@test.test", "pw").await.unwrap();

        let path = temp_dir.path().join("session.json");
        let mut saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        saved["access_token"] = serde_json::Value::from("forged-token");
        std::fs::write(&path, saved.to_string()).unwrap();

        let second = AccountClient::with_parts(&config, Some(store.clone()), clock()).unwrap();
        assert!(!second.is_authenticated());
        assert!(second.current_account().is_none());
        assert!(!path.exists());
        assert!(store.load().unwrap().is_none());
    }
}
