//! The top-level handle tying discovery, subscriptions and the callback
//! server together.

use std::sync::Arc;
use std::time::Duration;

use callback_server::CallbackServer;
use sonos_discovery::{DeviceRegistry, DeviceResolver, Discovery, HttpResolver, ZonePlayer};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::SonosConfig;
use crate::error::Result;
use crate::router::NotificationRouter;
use crate::subscription::{SubscriptionManager, SubscriptionOptions};

/// Owns the discovery socket, the callback server and the subscription map.
///
/// Both sockets stay open until [`Sonos::close`] or [`Sonos::shutdown`];
/// cancelling a single search does not close them.
pub struct Sonos {
    discovery: Discovery,
    subscriptions: Arc<SubscriptionManager>,
    server: CallbackServer,
}

impl Sonos {
    /// Bind the discovery socket and start the callback server.
    pub async fn new(config: SonosConfig) -> Result<Self> {
        let resolver = Arc::new(HttpResolver::new(config.http_timeout)?);
        Self::with_resolver(config, resolver).await
    }

    /// Like [`Sonos::new`] with a custom way of resolving SSDP responses.
    pub async fn with_resolver(config: SonosConfig, resolver: Arc<dyn DeviceResolver>) -> Result<Self> {
        config.validate()?;

        let discovery = Discovery::bind(config.discovery.clone(), resolver).await?;
        let subscriptions = Arc::new(SubscriptionManager::new(
            config.http_timeout,
            config.default_subscription_timeout,
        )?);
        let router = NotificationRouter::new(
            discovery.registry(),
            Arc::clone(&subscriptions),
            config.first_event_grace,
        );
        let server = CallbackServer::bind(config.callback_addr, Arc::new(router)).await?;

        info!(
            discovery_addr = ?discovery.local_addr().ok(),
            callback_port = server.port(),
            "Sonos handle ready"
        );

        Ok(Self {
            discovery,
            subscriptions,
            server,
        })
    }

    /// Search until `token` is cancelled, calling `on_found` once per new coordinator.
    pub async fn search<F>(&self, token: CancellationToken, on_found: F) -> Result<()>
    where
        F: Fn(Arc<ZonePlayer>) + Send + Sync + 'static,
    {
        Ok(self.discovery.search(token, on_found).await?)
    }

    pub async fn find_room(&self, room: &str, deadline: Duration) -> Result<Arc<ZonePlayer>> {
        Ok(self.discovery.find_room(room, deadline).await?)
    }

    pub async fn find_room_until(&self, token: CancellationToken, room: &str) -> Result<Arc<ZonePlayer>> {
        Ok(self.discovery.find_room_until(token, room).await?)
    }

    /// Add a coordinator found without SSDP.
    pub async fn register(&self, player: ZonePlayer) -> Result<Arc<ZonePlayer>> {
        Ok(self.discovery.register(player).await?)
    }

    /// Subscribe and return the SID; the handler starts receiving events.
    pub async fn subscribe(&self, options: &SubscriptionOptions) -> Result<String> {
        Ok(self
            .subscriptions
            .subscribe(options, self.server.port())
            .await?)
    }

    /// Renew and return the timeout granted by the device.
    pub async fn renew(&self, options: &SubscriptionOptions) -> Result<Duration> {
        Ok(self.subscriptions.renew(options).await?)
    }

    pub async fn unsubscribe(&self, options: &SubscriptionOptions) -> Result<()> {
        Ok(self.subscriptions.unsubscribe(options).await?)
    }

    pub fn registry(&self) -> Arc<DeviceRegistry> {
        self.discovery.registry()
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn callback_port(&self) -> u16 {
        self.server.port()
    }

    /// Stop discovery and signal the callback server to stop.
    pub fn close(&self) {
        self.discovery.close();
        self.server.close();
        info!("Sonos handle closed");
    }

    pub fn is_closed(&self) -> bool {
        self.discovery.is_closed()
    }

    /// Close and wait for the callback server to finish in-flight requests.
    pub async fn shutdown(self) -> Result<()> {
        self.discovery.close();
        self.server.shutdown().await?;
        Ok(())
    }
}
