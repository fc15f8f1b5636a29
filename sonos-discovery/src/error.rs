//! Error types for the discovery system.

use std::fmt;

/// Error type for discovery operations.
///
/// Represents the failure modes of searching for, resolving and registering
/// zone players.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Network-related errors (socket creation, HTTP requests, etc.)
    NetworkError(String),
    /// Parsing errors (XML, SSDP response, etc.)
    ParseError(String),
    /// No matching device was found before the deadline or cancellation
    Timeout,
    /// Invalid device data or non-Sonos device detected
    InvalidDevice(String),
    /// The device is not the coordinator of any group
    NotCoordinator(String),
    /// A device with this serial number is already in the registry
    AlreadyRegistered(String),
    /// Discovery settings are unusable
    InvalidConfig(String),
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DiscoveryError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DiscoveryError::Timeout => write!(f, "Operation timed out"),
            DiscoveryError::InvalidDevice(msg) => write!(f, "Invalid device: {}", msg),
            DiscoveryError::NotCoordinator(serial) => {
                write!(f, "Zone player {} is not a group coordinator", serial)
            }
            DiscoveryError::AlreadyRegistered(serial) => {
                write!(f, "Zone player {} is already registered", serial)
            }
            DiscoveryError::InvalidConfig(msg) => write!(f, "Invalid discovery config: {}", msg),
        }
    }
}

impl std::error::Error for DiscoveryError {}

impl From<sonos_api::ApiError> for DiscoveryError {
    fn from(e: sonos_api::ApiError) -> Self {
        DiscoveryError::ParseError(e.to_string())
    }
}

impl From<soap_client::SoapError> for DiscoveryError {
    fn from(e: soap_client::SoapError) -> Self {
        DiscoveryError::NetworkError(e.to_string())
    }
}

/// Convenience Result type alias for discovery operations.
///
/// Equivalent to `std::result::Result<T, DiscoveryError>`.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
