//! Event processing and display module.
//!
//! Events arrive from the subscription handlers over an mpsc channel, tagged
//! with the room they came from. This module keeps per-kind statistics and
//! renders each event as a timestamped, optionally colored line.

use chrono::{DateTime, Local};
use sonos_api::events::{
    AVTransportLastChange, QueueLastChange, RenderingControlLastChange, ZoneGroupState,
};
use sonos_api::{Event, Service};
use tracing::{debug, info};

/// An event together with the room whose subscription produced it
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub room: String,
    pub event: Event,
}

/// Configuration for event processing
#[derive(Debug, Clone)]
pub struct EventProcessingConfig {
    /// Whether to display raw event data for debugging
    pub show_raw_data: bool,
    /// Whether to use colored output (if terminal supports it)
    pub use_colors: bool,
    /// Whether to log events to the tracing system
    pub enable_logging: bool,
}

impl Default for EventProcessingConfig {
    fn default() -> Self {
        Self {
            show_raw_data: false,
            use_colors: true,
            enable_logging: true,
        }
    }
}

/// Statistics about processed events
#[derive(Debug, Default, Clone)]
pub struct EventStats {
    pub total_events: u64,
    pub av_transport_events: u64,
    pub rendering_control_events: u64,
    pub queue_events: u64,
    pub topology_events: u64,
    pub state_variables: u64,
    pub renewals: u64,
    pub renewal_failures: u64,
}

impl EventStats {
    /// Count an event under its kind.
    pub fn update(&mut self, event: &Event) {
        self.total_events += 1;

        match event {
            Event::AVTransportLastChange(_) => self.av_transport_events += 1,
            Event::RenderingControlLastChange(_) => self.rendering_control_events += 1,
            Event::QueueLastChange(_) => self.queue_events += 1,
            Event::ZoneGroupState(_) | Event::AvailableSoftwareUpdate(_) => {
                self.topology_events += 1
            }
            Event::StateVariable(_) => self.state_variables += 1,
        }
    }

    pub fn record_renewal(&mut self, succeeded: bool) {
        if succeeded {
            self.renewals += 1;
        } else {
            self.renewal_failures += 1;
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Events: {} total, {} transport, {} rendering, {} topology, {} renewals ({} failed)",
            self.total_events,
            self.av_transport_events,
            self.rendering_control_events,
            self.topology_events,
            self.renewals,
            self.renewal_failures
        )
    }
}

/// Consumes events from the subscription handlers and prints them.
pub struct EventStreamConsumer {
    config: EventProcessingConfig,
    stats: EventStats,
    formatter: EventFormatter,
}

impl EventStreamConsumer {
    pub fn new() -> Self {
        Self::with_config(EventProcessingConfig::default())
    }

    pub fn with_config(config: EventProcessingConfig) -> Self {
        Self {
            formatter: EventFormatter::new(config.clone()),
            config,
            stats: EventStats::default(),
        }
    }

    /// Count, log and print one event.
    pub fn process_event(&mut self, received: &ReceivedEvent) {
        self.stats.update(&received.event);

        if self.config.enable_logging {
            debug!(
                room = %received.room,
                service = received.event.service().name(),
                "Event received"
            );
        }

        println!("{}", self.formatter.format_event(received));

        if self.config.show_raw_data {
            println!("  Raw event data: {:?}", received.event);
        }
    }

    pub fn record_renewal(&mut self, service: Service, result: Result<std::time::Duration, String>) {
        match result {
            Ok(granted) => {
                self.stats.record_renewal(true);
                println!(
                    "{}",
                    self.formatter.format_with_color(
                        &format!(
                            "[{}] RENEWED: {} for {}s",
                            self.formatter.format_timestamp(),
                            service.name(),
                            granted.as_secs()
                        ),
                        "\x1b[34m",
                    )
                );
            }
            Err(error) => {
                self.stats.record_renewal(false);
                println!(
                    "{}",
                    self.formatter.format_with_color(
                        &format!(
                            "[{}] RENEW_FAILED: {} - {}",
                            self.formatter.format_timestamp(),
                            service.name(),
                            error
                        ),
                        "\x1b[31m",
                    )
                );
            }
        }
    }

    /// Print final statistics when shutting down.
    pub fn print_final_stats(&self) {
        println!("\n=== Event Processing Statistics ===");
        println!("Total events processed: {}", self.stats.total_events);
        println!("AVTransport events: {}", self.stats.av_transport_events);
        println!("RenderingControl events: {}", self.stats.rendering_control_events);
        println!("Queue events: {}", self.stats.queue_events);
        println!("Topology events: {}", self.stats.topology_events);
        println!("State variables: {}", self.stats.state_variables);
        println!("Renewals: {}", self.stats.renewals);
        println!("Failed renewals: {}", self.stats.renewal_failures);

        info!("Event processing completed: {}", self.stats.summary());
    }

    pub fn stats(&self) -> &EventStats {
        &self.stats
    }

    pub fn config(&self) -> &EventProcessingConfig {
        &self.config
    }
}

impl Default for EventStreamConsumer {
    fn default() -> Self {
        Self::new()
    }
}

/// Event formatter for creating human-readable event displays.
pub struct EventFormatter {
    config: EventProcessingConfig,
}

impl EventFormatter {
    pub fn new(config: EventProcessingConfig) -> Self {
        Self { config }
    }

    /// One timestamped line naming the room and service, followed by the
    /// event's details.
    pub fn format_event(&self, received: &ReceivedEvent) -> String {
        let (details, color) = match &received.event {
            Event::AVTransportLastChange(change) => (format_transport(change), "\x1b[36m"),
            Event::RenderingControlLastChange(change) => (format_rendering(change), "\x1b[32m"),
            Event::QueueLastChange(change) => (format_queue(change), "\x1b[35m"),
            Event::ZoneGroupState(state) => (format_topology(state), "\x1b[33m"),
            Event::AvailableSoftwareUpdate(update) => (
                format!("Software update available: {} ({})", update.version, update.update_type),
                "\x1b[33m",
            ),
            Event::StateVariable(var) => (format!("{} = {}", var.name, var.value), "\x1b[37m"),
        };

        self.format_with_color(
            &format!(
                "[{}] {} - {}: {}",
                self.format_timestamp(),
                received.room,
                received.event.service().name(),
                details
            ),
            color,
        )
    }

    fn format_with_color(&self, text: &str, color_code: &str) -> String {
        if self.config.use_colors {
            format!("{}{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn format_timestamp(&self) -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

fn format_transport(change: &AVTransportLastChange) -> String {
    let mut lines = change.to_string();
    // Display ends every field with a newline
    if lines.ends_with('\n') {
        lines.pop();
    }
    format!("\n  {}", lines.replace('\n', "\n  "))
}

fn format_rendering(change: &RenderingControlLastChange) -> String {
    let mut parts = Vec::new();
    if let Some(volume) = change.volume("Master") {
        parts.push(format!("volume {}", volume));
    }
    if let Some(muted) = change.mute("Master") {
        parts.push(if muted { "muted".to_string() } else { "unmuted".to_string() });
    }
    if parts.is_empty() {
        "rendering state changed".to_string()
    } else {
        parts.join(", ")
    }
}

fn format_queue(change: &QueueLastChange) -> String {
    let updates: Vec<String> = change
        .queues
        .iter()
        .map(|queue| {
            let update_id = queue.update_id.as_ref().map_or("?", |v| v.val.as_str());
            format!("queue {} update {}", queue.id, update_id)
        })
        .collect();
    updates.join(", ")
}

fn format_topology(state: &ZoneGroupState) -> String {
    let coordinators: Vec<&str> = state
        .coordinators()
        .map(|member| member.zone_name.as_str())
        .collect();
    format!(
        "{} group(s), coordinators: {}",
        state.groups().len(),
        coordinators.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonos_api::StateVariable;

    const PLAYING: &str = r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/"><InstanceID val="0"><TransportState val="PLAYING"/><CurrentPlayMode val="SHUFFLE"/></InstanceID></Event>"#;
    const VOLUME: &str = r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/RCS/"><InstanceID val="0"><Volume channel="Master" val="23"/><Mute channel="Master" val="1"/></InstanceID></Event>"#;

    fn plain() -> EventFormatter {
        EventFormatter::new(EventProcessingConfig {
            use_colors: false,
            ..Default::default()
        })
    }

    fn kitchen(event: Event) -> ReceivedEvent {
        ReceivedEvent {
            room: "Kitchen".to_string(),
            event,
        }
    }

    #[test]
    fn test_event_stats_update() {
        let mut stats = EventStats::default();
        stats.update(&Event::AVTransportLastChange(
            AVTransportLastChange::from_xml(PLAYING).unwrap(),
        ));
        stats.update(&Event::StateVariable(StateVariable {
            service: Service::DeviceProperties,
            name: "ZoneName".to_string(),
            value: "Kitchen".to_string(),
        }));
        stats.record_renewal(true);
        stats.record_renewal(false);

        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.av_transport_events, 1);
        assert_eq!(stats.state_variables, 1);
        assert_eq!(
            stats.summary(),
            "Events: 2 total, 1 transport, 0 rendering, 0 topology, 1 renewals (1 failed)"
        );
    }

    #[test]
    fn test_format_transport_event() {
        let event = kitchen(Event::AVTransportLastChange(
            AVTransportLastChange::from_xml(PLAYING).unwrap(),
        ));
        let formatted = plain().format_event(&event);

        assert!(formatted.contains("] Kitchen - AVTransport: \n  TransportState: PLAYING"));
        assert!(formatted.contains("\n  CurrentPlayMode: SHUFFLE"));
        assert!(!formatted.ends_with('\n'));
    }

    #[test]
    fn test_format_rendering_event() {
        let event = kitchen(Event::RenderingControlLastChange(
            RenderingControlLastChange::from_xml(VOLUME).unwrap(),
        ));
        let formatted = plain().format_event(&event);
        assert!(formatted.ends_with("Kitchen - RenderingControl: volume 23, muted"));
    }

    #[test]
    fn test_format_state_variable() {
        let event = kitchen(Event::StateVariable(StateVariable {
            service: Service::GroupRenderingControl,
            name: "GroupVolume".to_string(),
            value: "32".to_string(),
        }));
        let formatted = plain().format_event(&event);
        assert!(formatted.ends_with("GroupRenderingControl: GroupVolume = 32"));
    }

    #[test]
    fn test_colors() {
        let colored = EventFormatter::new(EventProcessingConfig::default());
        let text = colored.format_with_color("test message", "\x1b[32m");
        assert_eq!(text, "\x1b[32mtest message\x1b[0m");

        assert_eq!(plain().format_with_color("test message", "\x1b[32m"), "test message");
    }

    #[test]
    fn test_consumer_counts_processed_events() {
        let mut consumer = EventStreamConsumer::with_config(EventProcessingConfig {
            use_colors: false,
            enable_logging: false,
            ..Default::default()
        });
        consumer.process_event(&kitchen(Event::RenderingControlLastChange(
            RenderingControlLastChange::from_xml(VOLUME).unwrap(),
        )));
        consumer.record_renewal(Service::RenderingControl, Err("412".to_string()));

        assert_eq!(consumer.stats().rendering_control_events, 1);
        assert_eq!(consumer.stats().renewal_failures, 1);
        assert!(!consumer.config().show_raw_data);
    }
}
