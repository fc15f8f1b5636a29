//! Sonos UPnP service catalogue and event decoding
//!
//! This crate knows the fifteen services a zone player exposes, where each of
//! them lives on the device, and how to turn the body of a GENA `NOTIFY`
//! request into typed [`Event`] values.
//!
//! # Parsing and dispatching a notification
//!
//! ```rust
//! use sonos_api::{dispatch, Service, ServiceEndpoint, UpnpService};
//! use url::Url;
//!
//! let location = Url::parse("http://192.168.1.100:1400/xml/device_description.xml").unwrap();
//! let endpoint = ServiceEndpoint::resolve(Service::GroupRenderingControl, &location).unwrap();
//!
//! let body = br#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
//!   <e:property><GroupVolume>32</GroupVolume></e:property>
//! </e:propertyset>"#;
//!
//! for property in endpoint.parse_event(body).unwrap() {
//!     dispatch(property, &|event| println!("{:?}", event));
//! }
//! ```

pub mod error;
pub mod events;
pub mod service;

pub use error::{ApiError, Result};
pub use events::{dispatch, Event, Property, PropertySet, StateVariable};
pub use service::{Endpoints, Service, ServiceEndpoint, ServiceInfo, UpnpService};
