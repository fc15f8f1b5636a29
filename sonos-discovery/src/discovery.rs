//! The discovery engine.
//!
//! One UDP socket is bound when the engine is created, together with a single
//! reader task that owns every receive on it. While at least one search is
//! live the reader:
//! 1. Parses each response and resolves its `LOCATION` into a [`ZonePlayer`],
//!    keeping only group coordinators
//! 2. Stores coordinators in the [`DeviceRegistry`]; only the insert that adds
//!    a serial number publishes it
//! 3. Publishes new coordinators to every live search, each of which forwards
//!    them to its own callback until its token fires
//!
//! A search subscribes to the reader, sends the `M-SEARCH` to every configured
//! target and returns.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::device::ZonePlayer;
use crate::error::{DiscoveryError, Result};
use crate::registry::DeviceRegistry;
use crate::resolver::DeviceResolver;
use crate::ssdp::{self, parse_ssdp_response};

/// Discovery engine settings
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Local address of the search socket
    pub bind_addr: SocketAddr,
    /// Where `M-SEARCH` datagrams are sent
    pub search_targets: Vec<SocketAddr>,
    /// `ST` header value
    pub search_target: String,
    /// `MX` header value in seconds
    pub mx: u8,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            search_targets: vec![ssdp::MULTICAST_ADDR, ssdp::BROADCAST_ADDR],
            search_target: ssdp::ZONE_PLAYER_TARGET.to_string(),
            mx: 1,
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.search_targets.is_empty() {
            return Err(DiscoveryError::InvalidConfig(
                "at least one search target address is required".to_string(),
            ));
        }
        if self.search_target.trim().is_empty() {
            return Err(DiscoveryError::InvalidConfig(
                "search target URN must not be empty".to_string(),
            ));
        }
        if self.mx == 0 || self.mx > 5 {
            return Err(DiscoveryError::InvalidConfig(
                "MX must be between 1 and 5 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

// Sonos responses are well under 1 KiB.
const RECV_BUFFER_SIZE: usize = 2048;
// New coordinators buffered per search before it starts lagging.
const FOUND_CHANNEL_CAPACITY: usize = 64;

/// Background SSDP discovery of group coordinators.
pub struct Discovery {
    socket: Arc<UdpSocket>,
    registry: Arc<DeviceRegistry>,
    resolver: Arc<dyn DeviceResolver>,
    config: DiscoveryConfig,
    found: broadcast::Sender<Arc<ZonePlayer>>,
    active_searches: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl Discovery {
    /// Bind the search socket and start its reader.
    pub async fn bind(config: DiscoveryConfig, resolver: Arc<dyn DeviceResolver>) -> Result<Self> {
        config.validate()?;

        let socket = UdpSocket::bind(config.bind_addr).await.map_err(|e| {
            DiscoveryError::NetworkError(format!("Failed to bind UDP socket: {}", e))
        })?;
        socket.set_broadcast(true).map_err(|e| {
            DiscoveryError::NetworkError(format!("Failed to enable broadcast: {}", e))
        })?;

        debug!(local_addr = ?socket.local_addr().ok(), "Discovery socket bound");

        let (found, _) = broadcast::channel(FOUND_CHANNEL_CAPACITY);
        let discovery = Self {
            socket: Arc::new(socket),
            registry: Arc::new(DeviceRegistry::new()),
            resolver,
            config,
            found,
            active_searches: Arc::new(AtomicUsize::new(0)),
            shutdown: CancellationToken::new(),
        };
        discovery.spawn_reader();
        Ok(discovery)
    }

    pub fn registry(&self) -> Arc<DeviceRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| DiscoveryError::NetworkError(e.to_string()))
    }

    /// The only task receiving on the socket. Responses that arrive while no
    /// search is live are dropped.
    fn spawn_reader(&self) {
        let socket = Arc::clone(&self.socket);
        let registry = Arc::clone(&self.registry);
        let resolver = Arc::clone(&self.resolver);
        let found = self.found.clone();
        let active_searches = Arc::clone(&self.active_searches);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                let (len, from) = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    received = socket.recv_from(&mut buf) => match received {
                        Ok(received) => received,
                        Err(e) => {
                            debug!("SSDP receive failed: {}", e);
                            continue;
                        }
                    },
                };

                if active_searches.load(Ordering::SeqCst) == 0 {
                    debug!(%from, "Dropping SSDP datagram outside any search");
                    continue;
                }
                let Some(location) = location_of(&buf[..len]) else {
                    debug!(%from, "Ignoring unparseable SSDP datagram");
                    continue;
                };
                if registry.contains_location(&location) {
                    continue;
                }

                tokio::spawn(resolve_and_store(
                    Arc::clone(&resolver),
                    Arc::clone(&registry),
                    found.clone(),
                    location,
                    shutdown.clone(),
                ));
            }
            debug!("SSDP reader stopped");
        });
    }

    /// Open one search scope on the engine's reader.
    ///
    /// `on_found` is called once per coordinator newly registered while the
    /// scope is live, whichever search's request it answered. The task exits
    /// when `token` is cancelled or the engine is closed.
    pub fn listen<F>(&self, token: CancellationToken, on_found: F) -> JoinHandle<()>
    where
        F: Fn(Arc<ZonePlayer>) + Send + Sync + 'static,
    {
        let mut found = self.found.subscribe();
        let scope = SearchScope::enter(&self.active_searches);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let _scope = scope;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = shutdown.cancelled() => break,
                    received = found.recv() => match received {
                        Ok(player) => on_found(player),
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "Search fell behind; coordinators were not reported");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("Search scope closed");
        })
    }

    /// Send one `M-SEARCH` to every configured target.
    pub async fn send_search(&self) -> Result<()> {
        let request = ssdp::build_search_request(&self.config.search_target, self.config.mx);
        for target in &self.config.search_targets {
            self.socket
                .send_to(request.as_bytes(), target)
                .await
                .map_err(|e| {
                    DiscoveryError::NetworkError(format!("Failed to send M-SEARCH to {}: {}", target, e))
                })?;
        }
        debug!(targets = self.config.search_targets.len(), "M-SEARCH sent");
        Ok(())
    }

    /// Start a search scoped to `token` and return once the request is sent.
    pub async fn search<F>(&self, token: CancellationToken, on_found: F) -> Result<()>
    where
        F: Fn(Arc<ZonePlayer>) + Send + Sync + 'static,
    {
        if token.is_cancelled() {
            return Ok(());
        }
        self.listen(token, on_found);
        self.send_search().await
    }

    /// Find the coordinator of `room` within `deadline`.
    ///
    /// The search started here keeps running until the deadline even after a
    /// match is returned.
    pub async fn find_room(&self, room: &str, deadline: Duration) -> Result<Arc<ZonePlayer>> {
        let scope = self.shutdown.child_token();
        let timer = scope.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => timer.cancel(),
                _ = timer.cancelled() => {}
            }
        });

        self.find_room_until(scope, room).await
    }

    /// Find the coordinator of `room`, giving up with `Timeout` when `token`
    /// is cancelled.
    pub async fn find_room_until(&self, token: CancellationToken, room: &str) -> Result<Arc<ZonePlayer>> {
        if let Some(player) = self.registry.find_room(room) {
            return Ok(player);
        }

        let (tx, mut rx) = mpsc::channel(1);
        let wanted = room.to_string();
        self.listen(token.clone(), move |player: Arc<ZonePlayer>| {
            if player.room_name() == wanted {
                let _ = tx.try_send(player);
            }
        });

        // Stored by another search before this scope subscribed.
        if let Some(player) = self.registry.find_room(room) {
            return Ok(player);
        }
        if !token.is_cancelled() {
            self.send_search().await?;
        }

        tokio::select! {
            _ = token.cancelled() => {
                info!(room, "Room not found before deadline");
                Err(DiscoveryError::Timeout)
            }
            _ = self.shutdown.cancelled() => Err(DiscoveryError::Timeout),
            Some(player) = rx.recv() => Ok(player),
        }
    }

    /// Add a player found by other means, e.g. from a known IP address.
    pub async fn register(&self, player: ZonePlayer) -> Result<Arc<ZonePlayer>> {
        if !self.resolver.is_coordinator(&player).await? {
            return Err(DiscoveryError::NotCoordinator(player.serial_number().to_string()));
        }

        let (stored, loaded) = self.registry.load_or_store(Arc::new(player));
        if loaded {
            return Err(DiscoveryError::AlreadyRegistered(stored.serial_number().to_string()));
        }
        info!(serial = stored.serial_number(), room = stored.room_name(), "Registered zone player");
        Ok(stored)
    }

    /// Stop the reader and every search. The socket is released once the last
    /// task exits.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn location_of(datagram: &[u8]) -> Option<Url> {
    let text = std::str::from_utf8(datagram).ok()?;
    let response = parse_ssdp_response(text)?;
    Url::parse(&response.location).ok()
}

/// Counts a live search for as long as it is held.
struct SearchScope(Arc<AtomicUsize>);

impl SearchScope {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(active))
    }
}

impl Drop for SearchScope {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn resolve_and_store(
    resolver: Arc<dyn DeviceResolver>,
    registry: Arc<DeviceRegistry>,
    found: broadcast::Sender<Arc<ZonePlayer>>,
    location: Url,
    shutdown: CancellationToken,
) {
    let player = match resolver.resolve(&location).await {
        Ok(player) => player,
        Err(e) => {
            debug!(%location, "Skipping device: {}", e);
            return;
        }
    };

    match resolver.is_coordinator(&player).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(serial = player.serial_number(), "Skipping non-coordinator");
            return;
        }
        Err(e) => {
            warn!(serial = player.serial_number(), "Coordinator check failed: {}", e);
            return;
        }
    }

    if shutdown.is_cancelled() {
        return;
    }

    let (player, loaded) = registry.load_or_store(Arc::new(player));
    if !loaded {
        info!(
            serial = player.serial_number(),
            room = player.room_name(),
            %location,
            "Found zone player"
        );
        // No live search means nobody is waiting on it.
        let _ = found.send(player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mx, 1);
        assert_eq!(config.search_target, ssdp::ZONE_PLAYER_TARGET);
        assert_eq!(
            config.search_targets,
            vec![ssdp::MULTICAST_ADDR, ssdp::BROADCAST_ADDR]
        );
        assert_eq!(
            config.search_targets,
            vec![
                "239.255.255.250:1900".parse::<SocketAddr>().unwrap(),
                "255.255.255.255:1900".parse::<SocketAddr>().unwrap(),
            ]
        );
    }

    #[test]
    fn test_invalid_configs() {
        let no_targets = DiscoveryConfig {
            search_targets: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(no_targets.validate(), Err(DiscoveryError::InvalidConfig(_))));

        let zero_mx = DiscoveryConfig {
            mx: 0,
            ..Default::default()
        };
        assert!(zero_mx.validate().is_err());

        let blank_target = DiscoveryConfig {
            search_target: " ".to_string(),
            ..Default::default()
        };
        assert!(blank_target.validate().is_err());
    }

    #[test]
    fn test_location_of() {
        let datagram = b"HTTP/1.1 200 OK\r\nLOCATION: http://10.0.0.5:1400/xml/device_description.xml\r\n\r\n";
        assert_eq!(
            location_of(datagram).unwrap().as_str(),
            "http://10.0.0.5:1400/xml/device_description.xml"
        );

        assert!(location_of(b"HTTP/1.1 200 OK\r\nLOCATION: not a url\r\n\r\n").is_none());
        assert!(location_of(&[0xff, 0xfe, 0x00]).is_none());
    }
}
