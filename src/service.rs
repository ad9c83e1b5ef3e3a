//! Host-side owner of the bridge and its plugin configuration.

use crate::config::{BridgeConfig, SessionConfig};
use crate::contract::bridge::{AccessBridge, CamContract};
use crate::remote::RemoteService;
use crate::BridgeError;
use std::sync::Arc;
use tokio::sync::watch;

/// Holds the session-wide plugin configuration and the contract handed to
/// the flow controller.
///
/// Create one per content access session. The host may update the plugin
/// configuration at any time; the contract sees the latest values.
pub struct ContentAccessService<R: ?Sized> {
    plugin_config: watch::Sender<SessionConfig>,
    bridge: Arc<AccessBridge<R>>,
}

impl<R: RemoteService + ?Sized + 'static> ContentAccessService<R> {
    /// Create a service on the current tokio runtime.
    ///
    /// # Errors
    /// Returns `Runtime` when called outside a tokio runtime.
    pub fn new(
        remote: Arc<R>,
        config: BridgeConfig,
        plugin_config: SessionConfig,
    ) -> Result<Self, BridgeError> {
        let (plugin_config, receiver) = watch::channel(plugin_config);
        let bridge = AccessBridge::new(remote, config, receiver)?;
        tracing::debug!(flow = ?bridge.current_flow(), "content access service ready");
        Ok(Self {
            plugin_config,
            bridge: Arc::new(bridge),
        })
    }

    /// Replace the plugin configuration.
    pub fn set_plugin_config(&self, config: SessionConfig) {
        self.plugin_config.send_replace(config);
    }

    /// Set one plugin configuration value.
    pub fn update_plugin_config(&self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.plugin_config.send_modify(|config| {
            config.insert(key, value);
        });
    }

    /// Current plugin configuration.
    pub fn plugin_config(&self) -> SessionConfig {
        self.plugin_config.borrow().clone()
    }

    /// The contract to hand to the flow controller.
    pub fn contract(&self) -> Arc<dyn CamContract> {
        self.bridge.clone()
    }

    /// The concrete bridge, for host-side calls such as `logout`.
    pub fn bridge(&self) -> &AccessBridge<R> {
        &self.bridge
    }
}
