//! GENA subscriptions.
//!
//! [`SubscriptionOptions`] describe what to subscribe to and
//! [`SubscriptionManager`] performs the `SUBSCRIBE` / `UNSUBSCRIBE` exchanges
//! and keeps the SID to handler mapping the notification router reads.

use std::sync::Arc;

use sonos_api::Event;

mod manager;
mod options;

pub use manager::{SubscriptionManager, SubscriptionRecord};
pub use options::{SubscriptionOptions, SubscriptionTarget};

/// Callback receiving the decoded events of one subscription.
///
/// Notifications are handled concurrently, so a handler may run on several
/// tasks at once and see events out of order.
pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// Handler used when a notification cannot be matched to a subscription
pub(crate) fn noop_handler() -> EventHandler {
    Arc::new(|_event| {})
}
