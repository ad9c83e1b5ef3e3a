//! Sign-in walkthrough against the staging account service.
//!
//! # Running
//!
//! ```bash
//! export ACCOUNT_EMAIL="user@example.com"
//! export ACCOUNT_PASSWORD="secret"
//! cargo run --example sign_in
//! ```

use accessbridge::{
    perform_and_wait, AccountClient, ActionPayload, ActionRequest, AuthFields, BridgeConfig,
    ContentAccessService, Environment, RemoteConfig, SessionConfig,
};
use std::sync::Arc;

// Merchant client ID from the account service dashboard.
const CLIENT_ID: &str = "cd3f233c-4045-47ef-bece-f7221b0bd07c";

#[tokio::main]
async fn main() {
    let email = std::env::var("ACCOUNT_EMAIL").expect("Set ACCOUNT_EMAIL environment variable");
    let password =
        std::env::var("ACCOUNT_PASSWORD").expect("Set ACCOUNT_PASSWORD environment variable");

    let mut config = RemoteConfig::new(CLIENT_ID);
    config.environment = Environment::Staging;
    config.referrer = Some("accessbridge-demo".to_string());
    config.user_agent_product = "accessbridge-demo".to_string();
    config.session_namespace = "accessbridge-demo".to_string();

    let remote = match AccountClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let service =
        match ContentAccessService::new(remote, BridgeConfig::default(), SessionConfig::new()) {
            Ok(service) => service,
            Err(e) => {
                eprintln!("Startup error: {}", e);
                std::process::exit(1);
            }
        };
    let contract = service.contract();

    if contract.is_session_active() {
        println!("✓ Resumed persisted session");
    } else {
        let fields = AuthFields::new()
            .with("email", email)
            .with("password", password);
        match perform_and_wait(contract.as_ref(), ActionRequest::Authenticate(fields)).await {
            Ok(_) => println!("✓ Signed in"),
            Err(failure) => {
                eprintln!("✗ {} [{}]: {}", failure, failure.code(), failure.error());
                std::process::exit(1);
            }
        }
    }

    // Catalog loading is simulated by default; this takes about 1.25s.
    match perform_and_wait(contract.as_ref(), ActionRequest::LoadEntitlements).await {
        Ok(ActionPayload::Entitlements(offers)) => println!("  Offers: {}", offers.len()),
        Ok(_) => {}
        Err(failure) => eprintln!("  {}", failure),
    }

    println!("  Flow: {:?}", contract.current_flow());
    println!("  Purchase required: {}", contract.requires_purchase());
    contract.on_flow_finished();
}
