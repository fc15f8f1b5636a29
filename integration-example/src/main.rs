use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub mod device_selection;
pub mod event_processing;

use device_selection::DeviceSelector;
use event_processing::{EventProcessingConfig, EventStreamConsumer, ReceivedEvent};
use sonos_api::Service;
use sonos_discovery::ZonePlayer;
use sonos_stream::{init_logging, LoggingMode, Sonos, SonosConfig, SubscriptionOptions};

/// Sonos SDK Integration Example
///
/// Demonstrates the complete Sonos SDK workflow by discovering group
/// coordinators, selecting a room, subscribing to its services, and printing
/// the events it sends until interrupted.
#[derive(Parser, Debug)]
#[command(name = "integration-example")]
#[command(about = "Sonos SDK Integration Example - Complete workflow demonstration")]
#[command(version = "0.1.0")]
pub struct Args {
    /// Room to subscribe to
    #[arg(short, long, default_value = "Living Room")]
    pub target_room: String,

    /// Discovery timeout in seconds
    #[arg(short = 'd', long, default_value = "3")]
    pub discovery_timeout: u64,

    /// Callback server port (0 picks a free port)
    #[arg(long, default_value = "0")]
    pub callback_port: u16,

    /// Subscription timeout in seconds
    #[arg(short = 's', long, default_value = "1800")]
    pub subscription_timeout: u64,

    /// Services to subscribe to
    #[arg(long, value_delimiter = ',', default_values = ["AVTransport", "RenderingControl"])]
    pub services: Vec<String>,

    /// Show raw event data for debugging
    #[arg(long)]
    pub show_raw_data: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_colors: bool,

    /// Use first available room if the target is not found
    #[arg(long)]
    pub use_first_available: bool,

    /// List discovered coordinators and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Logging mode (silent, development, debug)
    #[arg(long, default_value = "development")]
    pub log_mode: String,

    /// Print the supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Args {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.discovery_timeout == 0 {
            return Err(anyhow::anyhow!("Discovery timeout must be positive"));
        }

        if self.subscription_timeout == 0 {
            return Err(anyhow::anyhow!("Subscription timeout must be positive"));
        }

        if self.services.is_empty() {
            return Err(anyhow::anyhow!("At least one service is required"));
        }

        match self.log_mode.to_lowercase().as_str() {
            "silent" | "development" | "dev" | "debug" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log mode '{}'. Valid modes: silent, development, debug",
                    self.log_mode
                ));
            }
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments and environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub target_room: String,
    pub discovery_timeout: Duration,
    pub callback_port: u16,
    pub subscription_timeout: Duration,
    pub services: Vec<Service>,
    pub show_raw_data: bool,
    pub use_colors: bool,
    pub use_first_available: bool,
    pub list_devices: bool,
    pub log_mode: LoggingMode,
    pub env_help: bool,
}

impl TryFrom<Args> for Config {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        args.validate()?;

        let services = args
            .services
            .iter()
            .map(|name| parse_service(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            target_room: args.target_room,
            discovery_timeout: Duration::from_secs(args.discovery_timeout),
            callback_port: args.callback_port,
            subscription_timeout: Duration::from_secs(args.subscription_timeout),
            services,
            show_raw_data: args.show_raw_data,
            use_colors: !args.no_colors,
            use_first_available: args.use_first_available,
            list_devices: args.list_devices,
            log_mode: LoggingMode::from_name(&args.log_mode),
            env_help: args.env_help,
        })
    }
}

impl Config {
    /// Create configuration from command line arguments and environment variables
    pub fn from_env() -> Result<Self> {
        let mut args = Args::parse();

        if let Ok(room) = std::env::var("SONOS_TARGET_ROOM") {
            args.target_room = room;
        }

        if let Ok(timeout) = std::env::var("SONOS_DISCOVERY_TIMEOUT") {
            args.discovery_timeout = timeout
                .parse()
                .context("Invalid SONOS_DISCOVERY_TIMEOUT environment variable")?;
        }

        if let Ok(port) = std::env::var("SONOS_CALLBACK_PORT") {
            args.callback_port = port
                .parse()
                .context("Invalid SONOS_CALLBACK_PORT environment variable")?;
        }

        if let Ok(sub_timeout) = std::env::var("SONOS_SUBSCRIPTION_TIMEOUT") {
            args.subscription_timeout = sub_timeout
                .parse()
                .context("Invalid SONOS_SUBSCRIPTION_TIMEOUT environment variable")?;
        }

        if let Ok(services) = std::env::var("SONOS_SERVICES") {
            args.services = services.split(',').map(str::to_string).collect();
        }

        if let Ok(mode) = std::env::var("SONOS_LOG_MODE") {
            args.log_mode = mode;
        }

        if std::env::var("SONOS_SHOW_RAW_DATA").is_ok() {
            args.show_raw_data = true;
        }

        if std::env::var("SONOS_NO_COLORS").is_ok() {
            args.no_colors = true;
        }

        if std::env::var("SONOS_USE_FIRST_AVAILABLE").is_ok() {
            args.use_first_available = true;
        }

        if std::env::var("SONOS_LIST_DEVICES").is_ok() {
            args.list_devices = true;
        }

        Config::try_from(args)
    }

    /// Settings for the SDK handle
    pub fn sonos_config(&self) -> SonosConfig {
        SonosConfig {
            callback_addr: SocketAddr::from(([0, 0, 0, 0], self.callback_port)),
            default_subscription_timeout: self.subscription_timeout,
            ..SonosConfig::default()
        }
    }

    /// Renew at half the requested timeout
    pub fn renew_interval(&self) -> Duration {
        (self.subscription_timeout / 2).max(Duration::from_secs(1))
    }

    pub fn print_summary(&self) {
        let services: Vec<&str> = self.services.iter().map(Service::name).collect();

        info!("Configuration:");
        info!("  Target room: {}", self.target_room);
        info!("  Discovery timeout: {}s", self.discovery_timeout.as_secs());
        info!("  Callback port: {}", self.callback_port);
        info!("  Subscription timeout: {}s", self.subscription_timeout.as_secs());
        info!("  Services: {}", services.join(", "));
        info!("  Show raw data: {}", self.show_raw_data);
        info!("  Use colors: {}", self.use_colors);
        info!("  Use first available: {}", self.use_first_available);
        info!("  List devices only: {}", self.list_devices);
    }
}

/// Match a service by name, ignoring case.
fn parse_service(name: &str) -> Result<Service> {
    let name = name.trim();
    Service::ALL
        .into_iter()
        .find(|service| service.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            let known: Vec<&str> = Service::ALL.iter().map(Service::name).collect();
            anyhow::anyhow!("Unknown service '{}'. Known services: {}", name, known.join(", "))
        })
}

fn print_banner() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Sonos SDK Integration Example                ║");
    println!("║                                                              ║");
    println!("║  Demonstrates complete Sonos SDK workflow:                   ║");
    println!("║  • Coordinator discovery via SSDP                            ║");
    println!("║  • Room selection                                            ║");
    println!("║  • GENA subscriptions with renewal                           ║");
    println!("║  • Real-time event consumption                               ║");
    println!("║                                                              ║");
    println!("║  Press Ctrl+C to stop the example                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn print_env_help() {
    println!("Environment Variables:");
    println!("  SONOS_TARGET_ROOM           Room to subscribe to (default: 'Living Room')");
    println!("  SONOS_DISCOVERY_TIMEOUT     Discovery timeout in seconds (default: 3)");
    println!("  SONOS_CALLBACK_PORT         Callback server port (default: 0, any free port)");
    println!("  SONOS_SUBSCRIPTION_TIMEOUT  Subscription timeout in seconds (default: 1800)");
    println!("  SONOS_SERVICES              Comma separated services (default: AVTransport,RenderingControl)");
    println!("  SONOS_LOG_MODE              silent, development or debug (default: development)");
    println!("  SONOS_LOG_LEVEL             Tracing filter directives, overrides RUST_LOG");
    println!("  SONOS_SHOW_RAW_DATA         Show raw event data (set to enable)");
    println!("  SONOS_NO_COLORS             Disable colored output (set to enable)");
    println!("  SONOS_USE_FIRST_AVAILABLE   Use first room if target not found (set to enable)");
    println!("  SONOS_LIST_DEVICES          List devices and exit (set to enable)");
    println!();
}

/// Orchestrates discovery, selection, subscription and event processing,
/// then unsubscribes and shuts the handle down.
async fn run_integration_workflow(config: Config) -> Result<()> {
    info!("Starting integration workflow");

    info!("Phase 1: Starting SDK handle...");
    let sonos = Sonos::new(config.sonos_config())
        .await
        .context("Failed to start the Sonos handle")?;
    info!("Callback server listening on port {}", sonos.callback_port());

    if config.list_devices {
        let players = discover_all(&sonos, config.discovery_timeout).await?;
        println!("\n{}", DeviceSelector::list_devices(&players));
        sonos.shutdown().await?;
        return Ok(());
    }

    info!("Phase 2: Selecting target room...");
    let target = select_target_room(&sonos, &config)
        .await
        .context("Failed during room selection phase")?;
    info!(
        "Selected room: '{}' at {} ({})",
        target.room_name(),
        target.location(),
        target.serial_number()
    );

    info!("Phase 3: Establishing subscriptions...");
    let (tx, rx) = mpsc::unbounded_channel();
    let subscriptions = establish_subscriptions(&sonos, &target, &config, tx).await;
    if subscriptions.is_empty() {
        sonos.shutdown().await?;
        return Err(anyhow::anyhow!("No subscription could be established"));
    }

    info!("Phase 4: Starting event stream consumption...");
    let mut subscriptions = subscriptions;
    consume_event_stream(&sonos, &mut subscriptions, rx, &config).await;

    info!("Phase 5: Cleaning up resources...");
    cleanup_subscriptions(&sonos, &subscriptions).await;
    sonos
        .shutdown()
        .await
        .context("Failed to shut down the Sonos handle")?;

    info!("Integration workflow completed successfully");
    Ok(())
}

/// Search for the full discovery timeout and return every coordinator seen.
async fn discover_all(sonos: &Sonos, timeout: Duration) -> Result<Vec<Arc<ZonePlayer>>> {
    info!("Discovering coordinators for {}s...", timeout.as_secs());

    let token = CancellationToken::new();
    let deadline = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        deadline.cancel();
    });

    sonos
        .search(token, |player| {
            info!(
                "Found coordinator: '{}' at {} [{}]",
                player.room_name(),
                player.location(),
                player.model_name()
            );
        })
        .await
        .context("Discovery failed")?;

    Ok(sonos.registry().players())
}

async fn select_target_room(sonos: &Sonos, config: &Config) -> Result<Arc<ZonePlayer>> {
    if !config.use_first_available {
        info!("Looking for room: '{}'", config.target_room);
        match sonos
            .find_room(&config.target_room, config.discovery_timeout)
            .await
        {
            Ok(player) => return Ok(player),
            Err(e) => warn!("Room '{}' not found directly: {}", config.target_room, e),
        }
    }

    let players = if sonos.registry().is_empty() {
        discover_all(sonos, config.discovery_timeout).await?
    } else {
        sonos.registry().players()
    };

    let selected = if config.use_first_available {
        DeviceSelector::first_available(&players)
    } else {
        DeviceSelector::find_with_fallback(&config.target_room, &players)
    };

    selected.map_err(|e| {
        error!("Room selection failed: {}", e);
        anyhow::anyhow!("Room selection failed: {}", e)
    })
}

/// Subscribe to every configured service, returning the options of those
/// that succeeded with their SID filled in.
async fn establish_subscriptions(
    sonos: &Sonos,
    target: &Arc<ZonePlayer>,
    config: &Config,
    tx: mpsc::UnboundedSender<ReceivedEvent>,
) -> Vec<SubscriptionOptions> {
    let mut established = Vec::new();

    for &service in &config.services {
        let room = target.room_name().to_string();
        let tx = tx.clone();
        let options = SubscriptionOptions::new(Arc::clone(target), service)
            .with_timeout(config.subscription_timeout)
            .with_handler(move |event| {
                // The receiver is gone once the consumer has stopped
                let _ = tx.send(ReceivedEvent {
                    room: room.clone(),
                    event,
                });
            });

        match sonos.subscribe(&options).await {
            Ok(sid) => {
                info!("Subscribed to {} ({})", service.name(), sid);
                established.push(options.with_sid(sid));
            }
            Err(e) => warn!("Failed to subscribe to {}: {}", service.name(), e),
        }
    }

    established
}

/// Print events until Ctrl+C, renewing every subscription at half its timeout.
async fn consume_event_stream(
    sonos: &Sonos,
    subscriptions: &mut Vec<SubscriptionOptions>,
    mut rx: mpsc::UnboundedReceiver<ReceivedEvent>,
    config: &Config,
) {
    let mut consumer = EventStreamConsumer::with_config(EventProcessingConfig {
        show_raw_data: config.show_raw_data,
        use_colors: config.use_colors,
        enable_logging: true,
    });

    let period = config.renew_interval();
    let mut renew = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    let mut shutdown_signal = Box::pin(tokio::signal::ctrl_c());

    println!("\n=== Event Stream Started ===");
    println!("Listening for events... (Press Ctrl+C to stop)");
    println!();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(received) => consumer.process_event(&received),
                None => {
                    info!("Event stream closed, shutting down consumer");
                    break;
                }
            },
            _ = renew.tick() => {
                let mut lapsed = Vec::new();
                for (index, options) in subscriptions.iter().enumerate() {
                    let Some(service) = options.service() else { continue };
                    match sonos.renew(options).await {
                        Ok(granted) => consumer.record_renewal(service, Ok(granted)),
                        Err(e) => {
                            consumer.record_renewal(service, Err(e.to_string()));
                            lapsed.push(index);
                        }
                    }
                }
                for index in lapsed.into_iter().rev() {
                    let options = subscriptions.remove(index);
                    if let Some(sid) = options.sid() {
                        sonos.subscriptions().forget(sid);
                    }
                }
                if subscriptions.is_empty() {
                    warn!("Every subscription has lapsed, stopping");
                    break;
                }
            }
            _ = &mut shutdown_signal => {
                info!("Received shutdown signal, stopping event consumer");
                break;
            }
        }
    }

    consumer.print_final_stats();
}

async fn cleanup_subscriptions(sonos: &Sonos, subscriptions: &[SubscriptionOptions]) {
    for options in subscriptions {
        if let Err(e) = sonos.unsubscribe(options).await {
            warn!("Failed to unsubscribe {:?}: {}", options.sid(), e);
        }
    }
    info!("Resource cleanup completed");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to parse configuration")?;

    if config.env_help {
        print_env_help();
        return Ok(());
    }

    init_logging(config.log_mode).context("Failed to initialize logging")?;

    print_banner();
    config.print_summary();

    info!("Starting Sonos SDK Integration Example");

    if let Err(e) = run_integration_workflow(config).await {
        error!("Integration example failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["integration-example"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::try_from(args(&[])).unwrap();

        assert_eq!(config.target_room, "Living Room");
        assert_eq!(config.services, vec![Service::AVTransport, Service::RenderingControl]);
        assert_eq!(config.subscription_timeout, Duration::from_secs(1800));
        assert_eq!(config.renew_interval(), Duration::from_secs(900));
        assert_eq!(config.log_mode, LoggingMode::Development);
        assert!(config.use_colors);

        let sonos_config = config.sonos_config();
        assert_eq!(sonos_config.callback_addr.port(), 0);
        assert_eq!(sonos_config.default_subscription_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_services_list() {
        let config =
            Config::try_from(args(&["--services", "zonegrouptopology,Queue", "--no-colors"])).unwrap();
        assert_eq!(config.services, vec![Service::ZoneGroupTopology, Service::Queue]);
        assert!(!config.use_colors);
    }

    #[rstest]
    #[case(&["--discovery-timeout", "0"], "Discovery timeout")]
    #[case(&["--subscription-timeout", "0"], "Subscription timeout")]
    #[case(&["--log-mode", "loud"], "Invalid log mode")]
    #[case(&["--services", "Radio"], "Unknown service 'Radio'")]
    fn test_invalid_arguments(#[case] extra: &[&str], #[case] message: &str) {
        let err = Config::try_from(args(extra)).unwrap_err();
        assert!(err.to_string().contains(message), "{}", err);
    }

    #[test]
    fn test_short_timeout_renews_every_second() {
        let config = Config::try_from(args(&["-s", "1"])).unwrap();
        assert_eq!(config.renew_interval(), Duration::from_secs(1));
    }
}
