use thiserror::Error;

use crate::Service;

/// Errors raised while resolving service endpoints or decoding events
#[derive(Debug, Error)]
pub enum ApiError {
    /// Response or event parsing error
    ///
    /// Covers malformed property sets as well as nested LastChange and
    /// topology documents that do not match their expected structure.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A service path could not be joined onto the device location
    #[error("Invalid endpoint for {service:?}: {message}")]
    InvalidEndpoint { service: Service, message: String },

    /// The event carries a state variable no decoding rule exists for
    #[error("Unknown event {variable} from {service:?}")]
    UnknownEvent { service: Service, variable: String },
}

/// Type alias for Results using ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
