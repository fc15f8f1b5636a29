//! Error types for the SOAP client

use thiserror::Error;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Network or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// UPnP fault returned by the device
    #[error("SOAP fault {code}: {description}")]
    Fault { code: u16, description: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display() {
        let error = SoapError::Fault {
            code: 401,
            description: "Invalid Action".to_string(),
        };
        assert_eq!(error.to_string(), "SOAP fault 401: Invalid Action");
    }
}
