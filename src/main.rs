use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vvm_monitor::config::{Config, StopConfig};
use vvm_monitor::departures::{validate_stop_id, StopValidation};
use vvm_monitor::efa::{EfaClient, DEFAULT_COORD_RADIUS_M, UNKNOWN_STOP_NAME, VVM_BASE_URL};
use vvm_monitor::monitor::StopMonitor;

/// VVM departure monitor
#[derive(Parser)]
#[command(name = "vvm-monitor")]
#[command(version, about = "Departure monitor for the VVM public transport network", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Find stops by a free-text keyword
    Search {
        /// Name or part of a stop name
        keyword: String,
    },

    /// Find stops around a WGS84 coordinate
    Nearby {
        /// Latitude in decimal degrees
        #[arg(allow_negative_numbers = true)]
        latitude: f64,

        /// Longitude in decimal degrees
        #[arg(allow_negative_numbers = true)]
        longitude: f64,

        /// Search radius in meters
        #[arg(default_value_t = DEFAULT_COORD_RADIUS_M)]
        radius_m: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match cli.command {
        Some(Command::Search { keyword }) => search(&keyword).await,
        Some(Command::Nearby {
            latitude,
            longitude,
            radius_m,
        }) => nearby(latitude, longitude, radius_m).await,
        None => watch(&cli.config).await,
    }
}

async fn search(keyword: &str) {
    let client = EfaClient::new().expect("Failed to build HTTP client");

    let matches = client.search_stops(keyword).await;
    if matches.is_empty() {
        println!("No stops found for '{}'", keyword);
        return;
    }
    for stop in matches {
        println!("{}  {}", stop.id, stop.name);
    }
}

async fn nearby(latitude: f64, longitude: f64, radius_m: u32) {
    let client = EfaClient::new().expect("Failed to build HTTP client");

    let matches = client.stops_near(latitude, longitude, radius_m).await;
    if matches.is_empty() {
        println!("No stops within {} m", radius_m);
        return;
    }
    for stop in matches {
        println!("{}  {}", stop.id, stop.name);
    }
}

async fn watch(config_path: &Path) {
    // Load config
    let config = Config::load(config_path).expect("Failed to load config");
    tracing::info!(stops = config.stops.len(), "Loaded configuration");

    let base_url = config.base_url.as_deref().unwrap_or(VVM_BASE_URL);
    let client = EfaClient::with_base_url(base_url).expect("Failed to build HTTP client");

    // Validate configured stops and set up their monitors
    let mut monitors = Vec::new();
    for stop in &config.stops {
        if let Some(monitor) = build_monitor(&client, stop).await {
            monitors.push(monitor);
        }
    }
    if monitors.is_empty() {
        tracing::error!("No valid stops configured, exiting");
        std::process::exit(1);
    }

    tracing::info!(
        monitors = monitors.len(),
        interval_secs = config.poll_interval_secs,
        "Starting departure watch"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    loop {
        interval.tick().await;

        // One in-flight request per stop; distinct stops poll concurrently.
        join_all(monitors.iter_mut().map(StopMonitor::poll)).await;

        for monitor in &monitors {
            if monitor.is_stale() {
                tracing::warn!(
                    stop = %monitor.stop_name(),
                    error = monitor.last_error().unwrap_or("unknown"),
                    "Stale departure data"
                );
            } else {
                tracing::info!(
                    stop = %monitor.stop_name(),
                    nearest = %monitor.nearest().summary,
                    upcoming = monitor.departures().len(),
                    "Departures"
                );
            }
        }
    }
}

/// Validate one configured stop and construct its monitor. Invalid stop
/// ids are skipped with an error log.
async fn build_monitor(client: &EfaClient, stop: &StopConfig) -> Option<StopMonitor> {
    let resolved = match validate_stop_id(client, &stop.stop_id).await {
        StopValidation::Valid { stop_name } => stop_name,
        StopValidation::Invalid { code, message } => {
            tracing::error!(
                stop_id = %stop.stop_id,
                code = ?code,
                message = ?message,
                "Skipping invalid stop id"
            );
            return None;
        }
    };

    let name = stop
        .name
        .clone()
        .or(resolved)
        .unwrap_or_else(|| UNKNOWN_STOP_NAME.to_string());

    let mut monitor = StopMonitor::new(
        client.clone(),
        stop.stop_id.clone(),
        name,
        stop.time_window_minutes,
    );
    let filters = monitor.filters_mut();
    filters.set_vehicle_types(stop.vehicle_types.clone());
    filters.set_line_numbers(&stop.line_numbers);
    filters.set_directions(&stop.directions);

    tracing::info!(
        stop_id = %monitor.stop_id(),
        name = %monitor.stop_name(),
        window_minutes = monitor.time_window_minutes(),
        "Monitoring stop"
    );

    Some(monitor)
}
