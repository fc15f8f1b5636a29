//! Turning an SSDP `LOCATION` into a [`ZonePlayer`].

use std::time::Duration;

use async_trait::async_trait;
use soap_client::SoapClient;
use sonos_api::events::ZoneGroupState;
use sonos_api::{Service, UpnpService};
use tracing::debug;
use url::Url;

use crate::device::{DeviceDescription, ZonePlayer};
use crate::error::{DiscoveryError, Result};

/// Resolves discovery responses into device handles.
///
/// The discovery engine only needs these two capabilities, which keeps it
/// testable against fake devices.
#[async_trait]
pub trait DeviceResolver: Send + Sync {
    /// Fetch and parse the device description at `location`.
    async fn resolve(&self, location: &Url) -> Result<ZonePlayer>;

    /// Whether `player` currently coordinates a group.
    async fn is_coordinator(&self, player: &ZonePlayer) -> Result<bool>;
}

/// Resolver that talks to real devices over HTTP.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    http: reqwest::Client,
    soap: SoapClient,
}

impl HttpResolver {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DiscoveryError::NetworkError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            soap: SoapClient::with_timeouts(timeout, timeout),
        })
    }

    /// Query `ZoneGroupTopology#GetZoneGroupState` on `player`.
    pub async fn zone_group_state(&self, player: &ZonePlayer) -> Result<ZoneGroupState> {
        let endpoint = player.service(Service::ZoneGroupTopology).ok_or_else(|| {
            DiscoveryError::InvalidDevice(format!(
                "{} has no ZoneGroupTopology service",
                player.serial_number()
            ))
        })?;
        let control_url = endpoint.endpoints().control.to_string();
        let service_uri = Service::ZoneGroupTopology.info().service_uri;
        let soap = self.soap.clone();

        let response = tokio::task::spawn_blocking(move || {
            soap.call(&control_url, service_uri, "GetZoneGroupState", "")
        })
        .await
        .map_err(|e| DiscoveryError::NetworkError(format!("SOAP task failed: {}", e)))??;

        let state_xml = soap_client::child_text(&response, "ZoneGroupState").ok_or_else(|| {
            DiscoveryError::ParseError("Missing ZoneGroupState in response".to_string())
        })?;

        Ok(ZoneGroupState::from_xml(&state_xml)?)
    }
}

#[async_trait]
impl DeviceResolver for HttpResolver {
    async fn resolve(&self, location: &Url) -> Result<ZonePlayer> {
        debug!(%location, "Fetching device description");

        let xml = self
            .http
            .get(location.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| DiscoveryError::NetworkError(e.to_string()))?
            .text()
            .await
            .map_err(|e| DiscoveryError::NetworkError(e.to_string()))?;

        let description = DeviceDescription::from_xml(&xml)?;
        if !description.is_sonos_device() {
            return Err(DiscoveryError::InvalidDevice(format!(
                "{} ({}) is not a Sonos device",
                description.friendly_name, description.manufacturer
            )));
        }

        ZonePlayer::new(description, location.clone())
    }

    async fn is_coordinator(&self, player: &ZonePlayer) -> Result<bool> {
        let state = self.zone_group_state(player).await?;
        Ok(player.is_coordinator_in(&state))
    }
}
