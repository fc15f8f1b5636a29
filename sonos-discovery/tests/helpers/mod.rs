//! Fake zone players for discovery integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sonos_discovery::{DeviceResolver, DiscoveryConfig, DiscoveryError, Result, ZonePlayer};
use tokio::net::UdpSocket;
use url::Url;

/// Description XML of a zone player
pub fn description_xml(serial: &str, rincon: &str, room: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
    <device>
        <deviceType>urn:schemas-upnp-org:device:ZonePlayer:1</deviceType>
        <friendlyName>{room}</friendlyName>
        <manufacturer>Sonos, Inc.</manufacturer>
        <modelName>Sonos One</modelName>
        <modelDescription>Sonos One Audio Player</modelDescription>
        <UDN>uuid:{rincon}</UDN>
        <serialNum>{serial}</serialNum>
        <softwareVersion>57.2-54070</softwareVersion>
        <hardwareVersion>1.20.1.6-1.2</hardwareVersion>
        <roomName>{room}</roomName>
    </device>
</root>"#
    )
}

pub fn location(ip: &str) -> Url {
    Url::parse(&format!("http://{}:1400/xml/device_description.xml", ip)).unwrap()
}

/// A unicast M-SEARCH response advertising `location`
pub fn ssdp_response(location: &Url, usn_suffix: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         CACHE-CONTROL: max-age = 1800\r\n\
         EXT:\r\n\
         LOCATION: {}\r\n\
         SERVER: Linux UPnP/1.0 Sonos/70.3-88200 (ZPS9)\r\n\
         ST: urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
         USN: uuid:RINCON_{}::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
         X-RINCON-HOUSEHOLD: Sonos_test\r\n\r\n",
        location, usn_suffix
    )
}

/// Resolver backed by in-memory descriptions instead of HTTP
#[derive(Default)]
pub struct FakeResolver {
    descriptions: HashMap<Url, String>,
    coordinators: HashSet<String>,
    pub resolves: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a device at `ip`; `coordinator` decides the topology answer.
    pub fn with_device(mut self, ip: &str, serial: &str, room: &str, coordinator: bool) -> Self {
        let rincon = format!("RINCON_{}", serial.replace(['-', ':'], ""));
        self.descriptions
            .insert(location(ip), description_xml(serial, &rincon, room));
        if coordinator {
            self.coordinators.insert(serial.to_string());
        }
        self
    }

    pub fn player(&self, ip: &str) -> ZonePlayer {
        let location = location(ip);
        ZonePlayer::from_xml(&self.descriptions[&location], location).unwrap()
    }
}

#[async_trait]
impl DeviceResolver for FakeResolver {
    async fn resolve(&self, location: &Url) -> Result<ZonePlayer> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        let xml = self
            .descriptions
            .get(location)
            .ok_or_else(|| DiscoveryError::NetworkError(format!("no device at {}", location)))?;
        ZonePlayer::from_xml(xml, location.clone())
    }

    async fn is_coordinator(&self, player: &ZonePlayer) -> Result<bool> {
        Ok(self.coordinators.contains(player.serial_number()))
    }
}

/// UDP socket on loopback that answers M-SEARCH requests with canned datagrams
pub struct FakeDevice {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeDevice {
    /// Answer every M-SEARCH.
    pub async fn spawn(responses: Vec<String>) -> Self {
        Self::spawn_ignoring_first(0, responses).await
    }

    /// Stay silent for the first `ignored` M-SEARCH requests, then answer.
    pub async fn spawn_ignoring_first(ignored: usize, responses: Vec<String>) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            while let Ok((len, from)) = socket.recv_from(&mut buf).await {
                let text = String::from_utf8_lossy(&buf[..len]).to_string();
                if !text.starts_with("M-SEARCH") {
                    continue;
                }
                let count = {
                    let mut seen = seen.lock().unwrap();
                    seen.push(text);
                    seen.len()
                };
                if count <= ignored {
                    continue;
                }
                for response in &responses {
                    let _ = socket.send_to(response.as_bytes(), from).await;
                }
            }
        });

        Self { addr, requests }
    }

    pub fn config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            search_targets: vec![self.addr],
            ..Default::default()
        }
    }
}

/// Poll `condition` until it holds or `limit` elapses.
pub async fn wait_for<F: Fn() -> bool>(condition: F, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
