use std::path::PathBuf;

use clap::{Parser, Subcommand};
use moto_routes::client::HttpRoutingClient;
use moto_routes::config::{ClientConfig, SyncConfig};
use moto_routes::engine::RouteSync;
use moto_routes::export;
use moto_routes::import::{self, ImportOptions};
use moto_routes::model::{City, RoutesRequest};
use moto_routes::stats::RouteStats;
use moto_routes::sync::RoundOutcome;
use moto_routes::telemetry::{TelemetryLog, TelemetryReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "moto-routes", version, about = "E-motorcycle route planning tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a vehicles request file and write the computed routes
    Route {
        /// Vehicles request (`{ options, vehicles }`) as exported by the dashboard
        #[arg(long = "in")]
        input: PathBuf,
        /// Routes FeatureCollection output
        #[arg(long)]
        geojson: Option<PathBuf>,
        /// Directory receiving one `route_<id>.csv` per vehicle
        #[arg(long)]
        csv_dir: Option<PathBuf>,
        /// Override the service area (med, bog, amva)
        #[arg(long)]
        city: Option<City>,
        /// Ask the backend to account for traffic
        #[arg(long)]
        traffic: bool,
        /// Backend base URL, defaults to $MOTO_API_URL
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Normalise a route file into a GeoJSON FeatureCollection
    Convert {
        #[arg(long = "in")]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Keep altitude and further coordinate dimensions
        #[arg(long)]
        keep3d: bool,
    },
    /// Print the replay report of a telemetry log
    Telemetry {
        #[arg(long = "in")]
        input: PathBuf,
        /// Keep every N-th row
        #[arg(long, default_value_t = 1)]
        downsample: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Cli::parse().command {
        Command::Route {
            input,
            geojson,
            csv_dir,
            city,
            traffic,
            api_url,
        } => {
            let text = tokio::fs::read_to_string(&input).await?;
            let mut request: RoutesRequest = serde_json::from_str(&text)?;
            if let Some(city) = city {
                request.options.city = city;
            }
            request.options.traffic |= traffic;

            let mut config = ClientConfig::from_env();
            if let Some(url) = api_url {
                config = ClientConfig {
                    timeout_secs: config.timeout_secs,
                    ..ClientConfig::new(url)
                };
            }
            let client = HttpRoutingClient::new(config)?;
            let sync = RouteSync::new(
                client,
                SyncConfig {
                    initial_options: request.options.clone(),
                    ..SyncConfig::default()
                },
            );
            sync.on_change(&request.to_vehicles());

            match sync.compute_now().await? {
                RoundOutcome::Applied { vehicle_ids, .. } => {
                    info!(vehicles = vehicle_ids.len(), "routes computed")
                }
                other => {
                    sync.dispose();
                    return Err(format!("no routes computed ({:?})", other).into());
                }
            }

            let routes = sync.routes();
            for route in routes.values() {
                let stats = RouteStats::from_route(route);
                println!(
                    "{}: {:.2} km, {:.1} min, avg power {}",
                    stats.vehicle_id,
                    stats.distance_km,
                    stats.duration_min,
                    stats
                        .average_power_kw
                        .map(|p| format!("{:.2} kW", p))
                        .unwrap_or_else(|| "n/a".to_string()),
                );
            }
            let total = sync.total_summary();
            println!("total: {:.2} km, {:.1} min", total.distance_km, total.duration_min);

            if let Some(path) = geojson {
                let fc = export::routes_feature_collection(&routes, &sync.selected_alternatives());
                tokio::fs::write(&path, serde_json::to_string_pretty(&fc)?).await?;
                info!(path = %path.display(), "wrote routes");
            }
            if let Some(dir) = csv_dir {
                tokio::fs::create_dir_all(&dir).await?;
                for route in routes.values() {
                    if let Some(csv) = export::route_csv(route) {
                        let path = dir.join(export::route_csv_file_name(&route.vehicle_id));
                        tokio::fs::write(&path, csv).await?;
                        info!(path = %path.display(), "wrote route csv");
                    }
                }
            }
            sync.dispose();
        }
        Command::Convert { input, out, keep3d } => {
            let fc = import::read_route_file(&input, ImportOptions { keep_3d: keep3d })?;
            tokio::fs::write(&out, serde_json::to_string_pretty(&fc)?).await?;
            info!(features = fc.features.len(), path = %out.display(), "converted");
        }
        Command::Telemetry { input, downsample } => {
            let log = TelemetryLog::read(&input)?;
            let report = TelemetryReport::compute(&log, downsample);
            println!("distance: {:.3} km", report.total_km);
            println!("time: {:.2} min", report.total_time_min);
            println!("energy: {:.4} kWh", report.total_energy_kwh);
            println!("samples: {}", report.power.len());
        }
    }
    Ok(())
}
