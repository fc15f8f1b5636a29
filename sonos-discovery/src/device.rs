//! Device description parsing and the resolved [`ZonePlayer`] handle.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Deserialize;
use sonos_api::events::ZoneGroupState;
use sonos_api::{Service, ServiceEndpoint};
use url::Url;

use crate::error::{DiscoveryError, Result};

/// Port every zone player serves its description and services on
pub const SONOS_PORT: u16 = 1400;

/// UPnP device description root element.
#[derive(Debug, Deserialize)]
pub struct Root {
    pub device: DeviceDescription,
}

/// Device description parsed from `device_description.xml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_description: Option<String>,
    pub model_name: String,
    pub model_number: Option<String>,
    #[serde(rename = "serialNum")]
    pub serial_number: Option<String>,
    #[serde(rename = "UDN")]
    pub udn: String,
    pub room_name: Option<String>,
    pub display_name: Option<String>,
    pub software_version: Option<String>,
    pub hardware_version: Option<String>,
    #[serde(rename = "MACAddress")]
    pub mac_address: Option<String>,
}

impl DeviceDescription {
    /// Parse device description from XML.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::ParseError` if the XML is malformed or missing required fields.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root: Root = quick_xml::de::from_str(xml)
            .map_err(|e| DiscoveryError::ParseError(format!("Failed to parse device XML: {}", e)))?;

        Ok(root.device)
    }

    /// Check if this device is a Sonos device.
    ///
    /// Validates by checking manufacturer name and device type.
    pub fn is_sonos_device(&self) -> bool {
        self.manufacturer.to_lowercase().contains("sonos")
            || self.device_type.contains("ZonePlayer")
    }
}

/// Description URL of the zone player at `ip`.
pub fn location_for_ip(ip: IpAddr) -> Result<Url> {
    let host = match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    };
    Url::parse(&format!(
        "http://{}:{}/xml/device_description.xml",
        host, SONOS_PORT
    ))
    .map_err(|e| DiscoveryError::ParseError(format!("Invalid device location: {}", e)))
}

/// A resolved zone player.
///
/// Identity is the serial number. The handle is immutable once built and is
/// shared as `Arc<ZonePlayer>` between the registry and callers.
#[derive(Debug, Clone)]
pub struct ZonePlayer {
    description: DeviceDescription,
    location: Url,
    services: BTreeMap<Service, ServiceEndpoint>,
}

impl ZonePlayer {
    /// Build a handle from a parsed description and the URL it was fetched from.
    ///
    /// Fails with `InvalidDevice` when the description carries no serial number.
    pub fn new(description: DeviceDescription, location: Url) -> Result<Self> {
        if description
            .serial_number
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
        {
            return Err(DiscoveryError::InvalidDevice(format!(
                "{} has no serial number",
                description.udn
            )));
        }

        let services = Service::ALL
            .into_iter()
            .map(|service| -> Result<(Service, ServiceEndpoint)> {
                Ok((service, ServiceEndpoint::resolve(service, &location)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            description,
            location,
            services,
        })
    }

    pub fn from_xml(xml: &str, location: Url) -> Result<Self> {
        Self::new(DeviceDescription::from_xml(xml)?, location)
    }

    pub fn description(&self) -> &DeviceDescription {
        &self.description
    }

    pub fn serial_number(&self) -> &str {
        self.description.serial_number.as_deref().unwrap_or_default()
    }

    /// Root device UDN, e.g. `uuid:RINCON_000E58CDCA4001400`
    pub fn udn(&self) -> &str {
        &self.description.udn
    }

    /// UDN without the `uuid:` prefix
    pub fn uuid(&self) -> &str {
        self.description
            .udn
            .strip_prefix("uuid:")
            .unwrap_or(&self.description.udn)
    }

    pub fn room_name(&self) -> &str {
        self.description.room_name.as_deref().unwrap_or_default()
    }

    pub fn model_name(&self) -> &str {
        &self.description.model_name
    }

    pub fn model_description(&self) -> &str {
        self.description.model_description.as_deref().unwrap_or_default()
    }

    pub fn software_version(&self) -> &str {
        self.description.software_version.as_deref().unwrap_or_default()
    }

    pub fn hardware_version(&self) -> &str {
        self.description.hardware_version.as_deref().unwrap_or_default()
    }

    pub fn mac_address(&self) -> &str {
        self.description.mac_address.as_deref().unwrap_or_default()
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn service(&self, service: Service) -> Option<&ServiceEndpoint> {
        self.services.get(&service)
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceEndpoint> {
        self.services.values()
    }

    /// The service whose event URL path equals `path`.
    pub fn service_for_event_path(&self, path: &str) -> Option<&ServiceEndpoint> {
        self.services().find(|endpoint| endpoint.event_path() == path)
    }

    pub fn is_coordinator_in(&self, state: &ZoneGroupState) -> bool {
        state.is_coordinator(self.udn())
    }
}
