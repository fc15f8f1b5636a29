use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sonos_api::{Event, Service, UpnpService};
use sonos_discovery::ZonePlayer;
use url::Url;

use super::EventHandler;
use crate::config::DEFAULT_SUBSCRIPTION_TIMEOUT;
use crate::error::SubscriptionError;

/// Request-time description of a subscription.
///
/// # Example
///
/// ```rust,ignore
/// let options = SubscriptionOptions::new(player, Service::AVTransport)
///     .with_handler(|event| println!("{:?}", event))
///     .with_timeout(Duration::from_secs(1800));
/// let sid = sonos.subscribe(&options).await?;
///
/// // Renew and unsubscribe use the same options plus the SID
/// sonos.renew(&options.clone().with_sid(sid)).await?;
/// ```
#[derive(Clone, Default)]
pub struct SubscriptionOptions {
    player: Option<Arc<ZonePlayer>>,
    service: Option<Service>,
    handler: Option<EventHandler>,
    timeout: Option<Duration>,
    sid: Option<String>,
}

/// Validated options with the event URL resolved and the timeout filled in
#[derive(Clone)]
pub struct SubscriptionTarget {
    pub player: Arc<ZonePlayer>,
    pub service: Service,
    pub event_url: Url,
    pub timeout: Duration,
    pub handler: Option<EventHandler>,
    pub sid: Option<String>,
}

impl SubscriptionOptions {
    pub fn new(player: Arc<ZonePlayer>, service: Service) -> Self {
        Self::default().with_player(player).with_service(service)
    }

    pub fn with_player(mut self, player: Arc<ZonePlayer>) -> Self {
        self.player = Some(player);
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Share an existing handler, e.g. one handler across several services.
    pub fn with_shared_handler(mut self, handler: EventHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// SID of an existing subscription, required by renew and unsubscribe.
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn service(&self) -> Option<Service> {
        self.service
    }

    /// Validate with the 24 hour default timeout.
    pub fn validate(&self) -> Result<SubscriptionTarget, SubscriptionError> {
        self.validate_with_default(DEFAULT_SUBSCRIPTION_TIMEOUT)
    }

    /// Check the options without touching the network.
    ///
    /// Fails when the player or service is missing, the service cannot be
    /// evented, or the player does not expose it.
    pub fn validate_with_default(
        &self,
        default_timeout: Duration,
    ) -> Result<SubscriptionTarget, SubscriptionError> {
        let player = self.player.clone().ok_or_else(|| {
            SubscriptionError::InvalidSubscription("no zone player given".to_string())
        })?;
        let service = self
            .service
            .ok_or_else(|| SubscriptionError::InvalidSubscription("no service given".to_string()))?;

        if !service.supports_events() {
            return Err(SubscriptionError::InvalidSubscription(format!(
                "{} does not support event subscriptions",
                service.name()
            )));
        }

        let endpoint = player.service(service).ok_or_else(|| {
            SubscriptionError::InvalidSubscription(format!(
                "{} does not expose {}",
                player.serial_number(),
                service.name()
            ))
        })?;

        let timeout = self.timeout.unwrap_or(default_timeout);
        if timeout.as_secs() == 0 {
            return Err(SubscriptionError::InvalidSubscription(
                "timeout must be at least one second".to_string(),
            ));
        }

        Ok(SubscriptionTarget {
            event_url: endpoint.endpoints().event.clone(),
            player,
            service,
            timeout,
            handler: self.handler.clone(),
            sid: self.sid.clone(),
        })
    }
}

impl fmt::Debug for SubscriptionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionOptions")
            .field("player", &self.player.as_ref().map(|p| p.serial_number()))
            .field("service", &self.service)
            .field("handler", &self.handler.is_some())
            .field("timeout", &self.timeout)
            .field("sid", &self.sid)
            .finish()
    }
}

impl fmt::Debug for SubscriptionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionTarget")
            .field("player", &self.player.serial_number())
            .field("service", &self.service)
            .field("event_url", &self.event_url.as_str())
            .field("timeout", &self.timeout)
            .field("sid", &self.sid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::tests::kitchen;
    use rstest::rstest;

    #[test]
    fn test_default_timeout_applied() {
        let target = SubscriptionOptions::new(kitchen(), Service::AVTransport)
            .validate()
            .unwrap();

        assert_eq!(target.timeout, Duration::from_secs(86_400));
        assert_eq!(
            target.event_url.as_str(),
            "http://10.0.0.5:1400/MediaRenderer/AVTransport/Event"
        );
        assert!(target.handler.is_none());
        assert!(target.sid.is_none());
    }

    #[test]
    fn test_explicit_timeout_and_sid() {
        let target = SubscriptionOptions::new(kitchen(), Service::ZoneGroupTopology)
            .with_timeout(Duration::from_secs(600))
            .with_sid("uuid:abc")
            .with_handler(|_| {})
            .validate_with_default(Duration::from_secs(1800))
            .unwrap();

        assert_eq!(target.timeout, Duration::from_secs(600));
        assert_eq!(target.sid.as_deref(), Some("uuid:abc"));
        assert!(target.handler.is_some());
    }

    #[rstest]
    #[case::no_player(SubscriptionOptions::default().with_service(Service::AVTransport))]
    #[case::no_service(SubscriptionOptions::default().with_player(kitchen()))]
    #[case::qplay(SubscriptionOptions::new(kitchen(), Service::QPlay))]
    #[case::zero_timeout(
        SubscriptionOptions::new(kitchen(), Service::Queue).with_timeout(Duration::ZERO)
    )]
    fn test_invalid_options(#[case] options: SubscriptionOptions) {
        assert!(matches!(
            options.validate(),
            Err(SubscriptionError::InvalidSubscription(_))
        ));
    }

    #[test]
    fn test_debug_hides_handler() {
        let options = SubscriptionOptions::new(kitchen(), Service::AVTransport).with_handler(|_| {});
        let debug = format!("{:?}", options);
        assert!(debug.contains("00-11-22-33-44-55:0"));
        assert!(debug.contains("handler: true"));
    }
}
