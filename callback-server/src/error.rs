use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while running the callback server
#[derive(Debug, Error)]
pub enum CallbackServerError {
    #[error("Failed to bind callback server to {addr}: {reason}")]
    Bind { addr: SocketAddr, reason: String },

    #[error("Callback server task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, CallbackServerError>;
