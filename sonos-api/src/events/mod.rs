//! Typed events decoded from GENA notifications
//!
//! A notification body is first split into raw [`Property`] values by
//! [`PropertySet::parse`]. Each property is then turned into an [`Event`]:
//!
//! | Service             | Variable                  | Event                                |
//! |---------------------|---------------------------|--------------------------------------|
//! | AVTransport         | `LastChange`              | [`Event::AVTransportLastChange`]     |
//! | RenderingControl    | `LastChange`              | [`Event::RenderingControlLastChange`]|
//! | Queue               | `LastChange`              | [`Event::QueueLastChange`]           |
//! | ZoneGroupTopology   | `ZoneGroupState`          | [`Event::ZoneGroupState`]            |
//! | ZoneGroupTopology   | `AvailableSoftwareUpdate` | [`Event::AvailableSoftwareUpdate`]   |
//! | any                 | a known scalar variable   | [`Event::StateVariable`]             |
//!
//! Anything else is an [`ApiError::UnknownEvent`].

pub mod didl;
pub mod last_change;
pub mod property;
pub mod topology;
pub mod xml_utils;

use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::Service;

pub use didl::{DidlItem, DidlLite, DidlResource};
pub use last_change::{AVTransportLastChange, QueueLastChange, RenderingControlLastChange};
pub use property::{Property, PropertySet};
pub use topology::{AvailableSoftwareUpdate, ZoneGroupState};

/// One decoded state change
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AVTransportLastChange(AVTransportLastChange),
    RenderingControlLastChange(RenderingControlLastChange),
    QueueLastChange(QueueLastChange),
    ZoneGroupState(ZoneGroupState),
    AvailableSoftwareUpdate(AvailableSoftwareUpdate),
    /// Scalar variable passed through as text
    StateVariable(StateVariable),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariable {
    pub service: Service,
    pub name: String,
    pub value: String,
}

impl StateVariable {
    /// `"1"` and `"true"` are true, `"0"` and `"false"` are false.
    pub fn as_bool(&self) -> Option<bool> {
        match self.value.as_str() {
            "1" => Some(true),
            "0" => Some(false),
            v if v.eq_ignore_ascii_case("true") => Some(true),
            v if v.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.value.trim().parse().ok()
    }
}

impl Event {
    /// Apply the decoding rule for the property's service and variable name.
    pub fn decode(property: Property) -> Result<Event> {
        let Property {
            service,
            name,
            value,
        } = property;

        let event = match (service, name.as_str()) {
            (Service::AVTransport, "LastChange") => {
                Event::AVTransportLastChange(AVTransportLastChange::from_xml(&value)?)
            }
            (Service::RenderingControl, "LastChange") => {
                Event::RenderingControlLastChange(RenderingControlLastChange::from_xml(&value)?)
            }
            (Service::Queue, "LastChange") => {
                Event::QueueLastChange(QueueLastChange::from_xml(&value)?)
            }
            (Service::ZoneGroupTopology, "ZoneGroupState") => {
                Event::ZoneGroupState(ZoneGroupState::from_xml(&value)?)
            }
            (Service::ZoneGroupTopology, "AvailableSoftwareUpdate") => {
                Event::AvailableSoftwareUpdate(AvailableSoftwareUpdate::from_xml(&value)?)
            }
            (service, variable) if service.evented_variables().contains(&variable) => {
                Event::StateVariable(StateVariable {
                    service,
                    name: variable.to_string(),
                    value,
                })
            }
            (service, variable) => {
                return Err(ApiError::UnknownEvent {
                    service,
                    variable: variable.to_string(),
                })
            }
        };

        Ok(event)
    }

    /// Service the event was reported by.
    pub fn service(&self) -> Service {
        match self {
            Event::AVTransportLastChange(_) => Service::AVTransport,
            Event::RenderingControlLastChange(_) => Service::RenderingControl,
            Event::QueueLastChange(_) => Service::Queue,
            Event::ZoneGroupState(_) | Event::AvailableSoftwareUpdate(_) => {
                Service::ZoneGroupTopology
            }
            Event::StateVariable(var) => var.service,
        }
    }
}

/// Decode `property` and hand the result to `handler`.
///
/// Decoding failures and unknown variables are logged and dropped; the handler
/// is called at most once.
pub fn dispatch<F>(property: Property, handler: &F)
where
    F: Fn(Event) + ?Sized,
{
    let service = property.service;
    let name = property.name.clone();

    match Event::decode(property) {
        Ok(event) => handler(event),
        Err(e @ ApiError::UnknownEvent { .. }) => {
            debug!(?service, variable = %name, "Dropping event: {}", e);
        }
        Err(e) => {
            warn!(?service, variable = %name, "Failed to decode event: {}", e);
        }
    }
}
