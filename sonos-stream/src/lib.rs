//! Event streaming and subscription management for Sonos devices
//!
//! This crate ties the pieces of the SDK together behind one [`Sonos`] handle:
//!
//! - SSDP discovery of group coordinators (`sonos-discovery`)
//! - GENA subscriptions through [`SubscriptionManager`]
//! - An embedded callback server whose [`NotificationRouter`] turns each
//!   `NOTIFY` into typed [`Event`]s for the subscription's handler
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use sonos_stream::{Service, Sonos, SonosConfig, SubscriptionOptions};
//!
//! # async fn run() -> sonos_stream::Result<()> {
//! let sonos = Sonos::new(SonosConfig::default()).await?;
//! let kitchen = sonos.find_room("Kitchen", Duration::from_secs(5)).await?;
//!
//! let options = SubscriptionOptions::new(kitchen, Service::RenderingControl)
//!     .with_handler(|event| println!("{:?}", event));
//! let sid = sonos.subscribe(&options).await?;
//!
//! tokio::time::sleep(Duration::from_secs(60)).await;
//! sonos.unsubscribe(&options.with_sid(sid)).await?;
//! sonos.shutdown().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod router;
pub mod sonos;
pub mod subscription;

pub use config::{SonosConfig, DEFAULT_SUBSCRIPTION_TIMEOUT};
pub use error::{Result, SonosError, SubscriptionError};
pub use logging::{init_logging, init_logging_from_env, LoggingMode};
pub use router::NotificationRouter;
pub use sonos::Sonos;
pub use subscription::{
    EventHandler, SubscriptionManager, SubscriptionOptions, SubscriptionRecord, SubscriptionTarget,
};

pub use sonos_api::{Event, Service};
pub use sonos_discovery::ZonePlayer;
