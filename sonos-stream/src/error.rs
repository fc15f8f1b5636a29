//! Error types for the sonos-stream crate.

use callback_server::CallbackServerError;
use sonos_discovery::DiscoveryError;

/// Errors from GENA subscription exchanges.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The options are incomplete or name a service that cannot be evented.
    /// Raised before any request is sent.
    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    /// The device answered with a non-success status
    #[error("Subscription rejected with HTTP {status}: {body}")]
    SubscriptionRejected {
        /// HTTP status code
        status: u16,
        /// Response body as sent by the device
        body: String,
    },

    /// The request could not be delivered or the response not read
    #[error("Transport error: {0}")]
    Transport(String),

    /// The device accepted the request but the response is unusable
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Errors surfaced by the [`Sonos`](crate::Sonos) handle.
#[derive(Debug, thiserror::Error)]
pub enum SonosError {
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error("Callback server error: {0}")]
    CallbackServer(#[from] CallbackServerError),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SonosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SubscriptionError::SubscriptionRejected {
            status: 412,
            body: "Precondition Failed".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Subscription rejected with HTTP 412: Precondition Failed"
        );

        let error: SonosError = DiscoveryError::Timeout.into();
        assert_eq!(error.to_string(), "Discovery error: Operation timed out");

        let error: SonosError = SubscriptionError::InvalidSubscription("no service".into()).into();
        assert_eq!(error.to_string(), "Invalid subscription: no service");
    }
}
