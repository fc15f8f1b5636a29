//! Generic UPnP callback server for receiving event notifications.
//!
//! This crate provides a lightweight HTTP server for UPnP `NOTIFY` requests.
//! It has no knowledge of device-specific protocols: every inbound request is
//! turned into a [`Notification`] and handed to a [`NotifyHandler`], whose
//! returned status code becomes the response.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use callback_server::{CallbackServer, Notification, NotifyHandler, StatusCode};
//!
//! struct Print;
//!
//! #[async_trait]
//! impl NotifyHandler for Print {
//!     async fn handle(&self, notification: Notification) -> StatusCode {
//!         println!("{:?} {}", notification.sid, notification.body_text());
//!         StatusCode::OK
//!     }
//! }
//!
//! # async fn run() -> callback_server::Result<()> {
//! let server = CallbackServer::bind("0.0.0.0:0".parse().unwrap(), Arc::new(Print)).await?;
//! println!("listening on port {}", server.port());
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod server;

pub use error::{CallbackServerError, Result};
pub use server::{CallbackServer, Notification, NotifyHandler};
pub use bytes::Bytes;
pub use warp::http::{Method, StatusCode};
