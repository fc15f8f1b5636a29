//! Sonos device discovery library
//!
//! Finds zone players on the local network with SSDP, resolves each response
//! into a [`ZonePlayer`], keeps only group coordinators, and reports every
//! coordinator exactly once per [`Discovery`] instance.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sonos_discovery::{Discovery, DiscoveryConfig, HttpResolver};
//!
//! # async fn run() -> sonos_discovery::Result<()> {
//! let resolver = Arc::new(HttpResolver::new(Duration::from_secs(5))?);
//! let discovery = Discovery::bind(DiscoveryConfig::default(), resolver).await?;
//!
//! let kitchen = discovery.find_room("Kitchen", Duration::from_secs(5)).await?;
//! println!("{} at {}", kitchen.room_name(), kitchen.location());
//!
//! discovery.close();
//! # Ok(())
//! # }
//! ```

mod error;
pub mod device;
pub mod discovery;
pub mod registry;
pub mod resolver;
pub mod ssdp;

pub use device::{location_for_ip, DeviceDescription, ZonePlayer, SONOS_PORT};
pub use discovery::{Discovery, DiscoveryConfig};
pub use error::{DiscoveryError, Result};
pub use registry::DeviceRegistry;
pub use resolver::{DeviceResolver, HttpResolver};
pub use ssdp::{build_search_request, parse_ssdp_response, SsdpResponse};
