//! Routing of inbound `NOTIFY` requests to subscription handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callback_server::{Notification, NotifyHandler, StatusCode};
use sonos_api::{dispatch, Property, UpnpService};
use sonos_discovery::DeviceRegistry;
use tracing::{debug, warn};

use crate::subscription::{noop_handler, EventHandler, SubscriptionManager};

/// Resolves each notification to a zone player, a service and a handler.
///
/// Any method other than `NOTIFY` is answered with 405. A request is answered
/// with 404 when its `sn` query parameter is missing or names a player that
/// is not in the registry. Every other request is
/// answered with 200 once its body has been parsed, whatever happened to the
/// individual events, so devices never retry a delivery.
pub struct NotificationRouter {
    registry: Arc<DeviceRegistry>,
    subscriptions: Arc<SubscriptionManager>,
    first_event_grace: Duration,
}

impl NotificationRouter {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        subscriptions: Arc<SubscriptionManager>,
        first_event_grace: Duration,
    ) -> Self {
        Self {
            registry,
            subscriptions,
            first_event_grace,
        }
    }

    /// Handler registered for `sid`.
    ///
    /// The first notification of a subscription (`SEQ: 0`) can arrive before
    /// the `SUBSCRIBE` response has been processed, so it gets one more lookup
    /// after the grace delay. Unmatched notifications get a no-op handler.
    async fn handler_for(&self, sid: Option<&str>, seq: Option<u32>) -> EventHandler {
        let Some(sid) = sid else {
            debug!("Notification without SID");
            return noop_handler();
        };

        if let Some(handler) = self.subscriptions.handler_for(sid) {
            return handler;
        }

        if seq == Some(0) {
            debug!(sid, grace_ms = self.first_event_grace.as_millis() as u64, "Waiting for first subscription record");
            tokio::time::sleep(self.first_event_grace).await;
            if let Some(handler) = self.subscriptions.handler_for(sid) {
                return handler;
            }
        }

        warn!(sid, ?seq, "No handler registered for subscription");
        noop_handler()
    }
}

#[async_trait]
impl NotifyHandler for NotificationRouter {
    async fn handle(&self, notification: Notification) -> StatusCode {
        if !notification.is_notify() {
            debug!(method = %notification.method, "Ignoring non-NOTIFY request");
            return StatusCode::METHOD_NOT_ALLOWED;
        }

        let Some(serial) = notification.query_param("sn") else {
            debug!(path = %notification.path, "Notification without serial number");
            return StatusCode::NOT_FOUND;
        };
        let Some(player) = self.registry.get(serial) else {
            debug!(serial, "Notification for unknown zone player");
            return StatusCode::NOT_FOUND;
        };

        let properties: Vec<Property> = match player.service_for_event_path(&notification.path) {
            Some(endpoint) => match endpoint.parse_event(&notification.body) {
                Ok(set) => set.into_iter().collect(),
                Err(e) => {
                    warn!(serial, service = endpoint.service().name(), "Dropping malformed notification: {}", e);
                    Vec::new()
                }
            },
            None => {
                debug!(serial, path = %notification.path, "No service for event path");
                Vec::new()
            }
        };

        let handler = self
            .handler_for(notification.sid.as_deref(), notification.seq_number())
            .await;

        for property in properties {
            dispatch(property, &*handler);
        }

        StatusCode::OK
    }
}
