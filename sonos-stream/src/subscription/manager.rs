//! GENA subscribe, renew and unsubscribe.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use dashmap::DashMap;
use reqwest::{Method, Response};
use sonos_api::Service;
use sonos_discovery::SONOS_PORT;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use url::Url;

use super::options::{SubscriptionOptions, SubscriptionTarget};
use super::EventHandler;
use crate::error::SubscriptionError;

/// One live subscription, keyed by its SID
#[derive(Clone)]
pub struct SubscriptionRecord {
    pub sid: String,
    pub serial_number: String,
    pub service: Service,
    pub event_url: Url,
    /// Timeout granted by the device on the last subscribe or renew
    pub timeout: Duration,
    pub(crate) handler: EventHandler,
}

impl SubscriptionRecord {
    pub fn handler(&self) -> EventHandler {
        self.handler.clone()
    }
}

impl fmt::Debug for SubscriptionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRecord")
            .field("sid", &self.sid)
            .field("serial_number", &self.serial_number)
            .field("service", &self.service)
            .field("event_url", &self.event_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Performs GENA exchanges and owns the SID to handler map.
///
/// None of the operations retry; that is left to the caller.
pub struct SubscriptionManager {
    http: reqwest::Client,
    records: DashMap<String, SubscriptionRecord>,
    default_timeout: Duration,
    request_timeout: Duration,
}

impl SubscriptionManager {
    pub fn new(request_timeout: Duration, default_timeout: Duration) -> Result<Self, SubscriptionError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                SubscriptionError::Transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            records: DashMap::new(),
            default_timeout,
            request_timeout,
        })
    }

    /// Subscribe and record the handler under the SID the device returns.
    ///
    /// The callback URL points at `callback_port` on the local address the
    /// device's event host is reached from, with the device serial number in
    /// the `sn` query parameter.
    pub async fn subscribe(
        &self,
        options: &SubscriptionOptions,
        callback_port: u16,
    ) -> Result<String, SubscriptionError> {
        let target = options.validate_with_default(self.default_timeout)?;
        let handler = target.handler.clone().ok_or_else(|| {
            SubscriptionError::InvalidSubscription("subscribe requires a handler".to_string())
        })?;

        let local_ip = self.local_ip_towards(&target.event_url).await?;
        let callback = callback_url(local_ip, callback_port, &target)?;

        let response = self
            .http
            .request(gena_method("SUBSCRIBE")?, target.event_url.clone())
            .header("CALLBACK", format!("<{}>", callback))
            .header("NT", "upnp:event")
            .header("TIMEOUT", timeout_header(target.timeout))
            .send()
            .await
            .map_err(|e| SubscriptionError::Transport(format!("SUBSCRIBE request failed: {}", e)))?;
        let response = reject_unless_success(response).await?;

        let sid = header(&response, "sid").ok_or_else(|| {
            SubscriptionError::Protocol("SUBSCRIBE response carried no SID header".to_string())
        })?;
        let timeout = granted_timeout(&response).unwrap_or(target.timeout);

        self.insert(SubscriptionRecord {
            sid: sid.clone(),
            serial_number: target.player.serial_number().to_string(),
            service: target.service,
            event_url: target.event_url,
            timeout,
            handler,
        });

        info!(
            %sid,
            service = target.service.name(),
            room = target.player.room_name(),
            %callback,
            timeout_secs = timeout.as_secs(),
            "Subscribed"
        );
        Ok(sid)
    }

    /// Renew the subscription named by the options' SID.
    ///
    /// The handler mapping is left untouched; the stored timeout is refreshed
    /// to the one granted. A device that already dropped the subscription
    /// answers with an error status, reported as `SubscriptionRejected`.
    pub async fn renew(&self, options: &SubscriptionOptions) -> Result<Duration, SubscriptionError> {
        let target = options.validate_with_default(self.default_timeout)?;
        let sid = required_sid(&target)?;

        let response = self
            .http
            .request(gena_method("SUBSCRIBE")?, target.event_url.clone())
            .header("SID", sid)
            .header("TIMEOUT", timeout_header(target.timeout))
            .send()
            .await
            .map_err(|e| SubscriptionError::Transport(format!("Renewal request failed: {}", e)))?;
        let response = reject_unless_success(response).await?;

        let timeout = granted_timeout(&response).unwrap_or(target.timeout);
        match self.records.get_mut(sid) {
            Some(mut record) => record.timeout = timeout,
            None => debug!(sid, "Renewed a subscription this manager does not track"),
        }

        debug!(sid, timeout_secs = timeout.as_secs(), "Renewed subscription");
        Ok(timeout)
    }

    /// Cancel the subscription named by the options' SID and drop its record.
    pub async fn unsubscribe(&self, options: &SubscriptionOptions) -> Result<(), SubscriptionError> {
        let target = options.validate_with_default(self.default_timeout)?;
        let sid = required_sid(&target)?;

        let response = self
            .http
            .request(gena_method("UNSUBSCRIBE")?, target.event_url.clone())
            .header("SID", sid)
            .send()
            .await
            .map_err(|e| SubscriptionError::Transport(format!("UNSUBSCRIBE request failed: {}", e)))?;
        reject_unless_success(response).await?;

        self.records.remove(sid);
        info!(sid, service = target.service.name(), "Unsubscribed");
        Ok(())
    }

    pub fn handler_for(&self, sid: &str) -> Option<EventHandler> {
        self.records.get(sid).map(|record| record.handler())
    }

    pub fn record(&self, sid: &str) -> Option<SubscriptionRecord> {
        self.records.get(sid).map(|record| record.clone())
    }

    /// Drop a record without contacting the device, e.g. after it expired.
    pub fn forget(&self, sid: &str) -> bool {
        self.records.remove(sid).is_some()
    }

    pub fn sids(&self) -> Vec<String> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn insert(&self, record: SubscriptionRecord) {
        if let Some(previous) = self.records.insert(record.sid.clone(), record) {
            warn!(sid = %previous.sid, "Replaced an existing subscription record");
        }
    }

    /// Local address used to reach the event host, learned by connecting to it.
    async fn local_ip_towards(&self, event_url: &Url) -> Result<IpAddr, SubscriptionError> {
        let host = event_url.host_str().ok_or_else(|| {
            SubscriptionError::InvalidSubscription(format!("event URL {} has no host", event_url))
        })?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = event_url.port_or_known_default().unwrap_or(SONOS_PORT);

        let stream = tokio::time::timeout(self.request_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SubscriptionError::Transport(format!("Timed out connecting to {}:{}", host, port)))?
            .map_err(|e| SubscriptionError::Transport(format!("Failed to connect to {}:{}: {}", host, port, e)))?;

        stream
            .local_addr()
            .map(|addr| addr.ip())
            .map_err(|e| SubscriptionError::Transport(e.to_string()))
    }
}

fn callback_url(
    local_ip: IpAddr,
    port: u16,
    target: &SubscriptionTarget,
) -> Result<Url, SubscriptionError> {
    let mut url = Url::parse(&format!("http://{}/", SocketAddr::new(local_ip, port)))
        .map_err(|e| SubscriptionError::Transport(format!("Invalid callback address: {}", e)))?;
    url.set_path(target.event_url.path());
    url.query_pairs_mut()
        .append_pair("sn", target.player.serial_number());
    Ok(url)
}

fn gena_method(name: &str) -> Result<Method, SubscriptionError> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| SubscriptionError::Transport(format!("Invalid method {}: {}", name, e)))
}

fn required_sid(target: &SubscriptionTarget) -> Result<&str, SubscriptionError> {
    target.sid.as_deref().ok_or_else(|| {
        SubscriptionError::InvalidSubscription("a SID is required for this operation".to_string())
    })
}

fn timeout_header(timeout: Duration) -> String {
    format!("Second-{}", timeout.as_secs())
}

/// Parse a `TIMEOUT: Second-N` response header.
fn parse_timeout(value: &str) -> Option<Duration> {
    value
        .trim()
        .strip_prefix("Second-")
        .and_then(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn granted_timeout(response: &Response) -> Option<Duration> {
    header(response, "timeout").and_then(|value| parse_timeout(&value))
}

fn header(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

async fn reject_unless_success(response: Response) -> Result<Response, SubscriptionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), %body, "GENA request rejected");
    Err(SubscriptionError::SubscriptionRejected {
        status: status.as_u16(),
        body,
    })
}
