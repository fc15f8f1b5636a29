//! A zone player whose event endpoints are served by mockito

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sonos_discovery::{DeviceResolver, DiscoveryError, Result, ZonePlayer};
use sonos_stream::{Sonos, SonosConfig};
use url::Url;

pub const SERIAL: &str = "00-11-22-33-44-55:0";
pub const AVT_EVENT_PATH: &str = "/MediaRenderer/AVTransport/Event";

const KITCHEN_XML: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
    <device>
        <deviceType>urn:schemas-upnp-org:device:ZonePlayer:1</deviceType>
        <friendlyName>127.0.0.1 - Sonos One</friendlyName>
        <manufacturer>Sonos, Inc.</manufacturer>
        <modelName>Sonos One</modelName>
        <UDN>uuid:RINCON_000E58CDCA4001400</UDN>
        <serialNum>00-11-22-33-44-55:0</serialNum>
        <roomName>Kitchen</roomName>
    </device>
</root>"#;

/// Treats every player as a coordinator and never fetches anything
pub struct AlwaysCoordinator;

#[async_trait]
impl DeviceResolver for AlwaysCoordinator {
    async fn resolve(&self, location: &Url) -> Result<ZonePlayer> {
        Err(DiscoveryError::NetworkError(format!("no device at {}", location)))
    }

    async fn is_coordinator(&self, _player: &ZonePlayer) -> Result<bool> {
        Ok(true)
    }
}

/// A loopback handle with the Kitchen player, located on `device`, registered.
pub async fn sonos_with_kitchen(
    device: &mockito::ServerGuard,
    grace: Duration,
) -> (Sonos, Arc<ZonePlayer>) {
    let config = SonosConfig {
        first_event_grace: grace,
        ..SonosConfig::loopback()
    };
    let sonos = Sonos::with_resolver(config, Arc::new(AlwaysCoordinator))
        .await
        .unwrap();

    let location = Url::parse(&format!("{}/xml/device_description.xml", device.url())).unwrap();
    let player = sonos
        .register(ZonePlayer::from_xml(KITCHEN_XML, location).unwrap())
        .await
        .unwrap();

    (sonos, player)
}

/// Property set carrying one AVTransport LastChange with the given state.
pub fn last_change_body(transport_state: &str) -> String {
    let inner = format!(
        r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/"><InstanceID val="0"><TransportState val="{}"/><CurrentPlayMode val="NORMAL"/></InstanceID></Event>"#,
        transport_state
    );
    let escaped = inner
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    format!(
        r#"<?xml version="1.0"?><e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"><e:property><LastChange>{}</LastChange></e:property></e:propertyset>"#,
        escaped
    )
}

/// Deliver a NOTIFY the way a zone player does and return the status code.
pub async fn notify(port: u16, path: &str, sn: &str, sid: &str, seq: u32, body: String) -> u16 {
    let url = format!("http://127.0.0.1:{}{}?sn={}", port, path, sn);
    reqwest::Client::new()
        .request(reqwest::Method::from_bytes(b"NOTIFY").unwrap(), url)
        .header("NT", "upnp:event")
        .header("NTS", "upnp:propchange")
        .header("SID", sid)
        .header("SEQ", seq.to_string())
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .body(body)
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}
