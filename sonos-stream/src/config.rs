//! Configuration types for the sonos-stream crate
//!
//! [`SonosConfig`] controls the discovery socket, the callback server and the
//! GENA subscription defaults used by the [`Sonos`](crate::Sonos) handle.

use std::net::SocketAddr;
use std::time::Duration;

use sonos_discovery::DiscoveryConfig;

use crate::error::SonosError;

/// Timeout requested when subscription options leave it unset (24 hours)
pub const DEFAULT_SUBSCRIPTION_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Configuration for the [`Sonos`](crate::Sonos) handle
#[derive(Debug, Clone)]
pub struct SonosConfig {
    /// SSDP search settings
    pub discovery: DiscoveryConfig,

    /// Local address of the callback server
    /// Default: 0.0.0.0 on an ephemeral port
    pub callback_addr: SocketAddr,

    /// Timeout for description fetches and GENA requests
    /// Default: 10 seconds
    pub http_timeout: Duration,

    /// `TIMEOUT` requested when subscription options leave it unset
    /// Default: 24 hours
    pub default_subscription_timeout: Duration,

    /// How long a first notification (`SEQ: 0`) waits for its subscription
    /// to be recorded before falling back to a no-op handler
    /// Default: 1 second
    pub first_event_grace: Duration,
}

impl Default for SonosConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            callback_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            http_timeout: Duration::from_secs(10),
            default_subscription_timeout: DEFAULT_SUBSCRIPTION_TIMEOUT,
            first_event_grace: Duration::from_secs(1),
        }
    }
}

impl SonosConfig {
    /// Create a SonosConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind everything to 127.0.0.1, for talking to devices on this host
    pub fn loopback() -> Self {
        let localhost = SocketAddr::from(([127, 0, 0, 1], 0));
        Self {
            discovery: DiscoveryConfig {
                bind_addr: localhost,
                ..Default::default()
            },
            callback_addr: localhost,
            ..Default::default()
        }
    }

    /// Request 30 minute subscriptions, as the Sonos controller apps do
    pub fn short_subscriptions() -> Self {
        Self {
            default_subscription_timeout: Duration::from_secs(1800),
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), SonosError> {
        self.discovery
            .validate()
            .map_err(|e| SonosError::Configuration(e.to_string()))?;

        if self.http_timeout.is_zero() {
            return Err(SonosError::Configuration(
                "HTTP timeout must be greater than 0".to_string(),
            ));
        }

        if self.default_subscription_timeout.as_secs() == 0 {
            return Err(SonosError::Configuration(
                "Subscription timeout must be at least one second".to_string(),
            ));
        }

        if self.first_event_grace > self.http_timeout {
            return Err(SonosError::Configuration(
                "First event grace must not exceed the HTTP timeout".to_string(),
            ));
        }

        Ok(())
    }
}
