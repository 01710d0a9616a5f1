#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Drives the map widget from the command line.
//!
//! Each run fills the form from flags, places the selection, submits once
//! and writes the resulting map overlays as a `GeoJSON` feature collection.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use giot_vis_app::{AppController, WidgetConfig};
use giot_vis_client::QueryClient;
use giot_vis_query::{FormFields, UNSELECTED};
use giot_vis_query_models::{LatLng, RegionMode};
use giot_vis_render::MemorySurface;

#[derive(Parser)]
#[command(name = "giot_vis_cli", about = "GreenIoT statistics map")]
struct Cli {
    /// Configuration file (defaults to `GIOT_VIS_CONFIG` or the built-in one)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print what the statistics service reports about itself
    Info,
    /// Query statistics at one or more points
    Points {
        /// Point as `LAT,LNG`; repeat for more points
        #[arg(long = "point", required = true, value_parser = parse_lat_lng)]
        points: Vec<LatLng>,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Query a heatmap over a rectangle
    Rect {
        /// North-east corner as `LAT,LNG`
        #[arg(long, value_parser = parse_lat_lng)]
        north_east: LatLng,
        /// South-west corner as `LAT,LNG`
        #[arg(long, value_parser = parse_lat_lng)]
        south_west: LatLng,
        #[command(flatten)]
        form: FormArgs,
    },
}

#[derive(Args)]
struct FormArgs {
    /// Start of the time range, e.g. "2017-03-01 00:00:00"
    #[arg(long, default_value = "")]
    from: String,
    /// End of the time range
    #[arg(long, default_value = "")]
    to: String,
    /// Dataset name, e.g. "CO2"
    #[arg(long, default_value = UNSELECTED)]
    dataset: String,
    /// `cMean`, `cStdDev`, `cMax` or `cMin` (point queries only)
    #[arg(long, default_value = UNSELECTED)]
    operation: String,
    /// `cTenMinutes`, `cHour`, `cDayOfWeek`, `cWeek`, `cMonth` or `cYear`
    #[arg(long, default_value = UNSELECTED)]
    interval: String,
    /// Where to write the `GeoJSON` result (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

impl FormArgs {
    fn fields(&self, mode: RegionMode) -> FormFields {
        FormFields {
            from_date: self.from.clone(),
            to_date: self.to.clone(),
            reg_type: mode.to_string(),
            data_type: self.dataset.clone(),
            operation: self.operation.clone(),
            interval: self.interval.clone(),
        }
    }
}

/// Parses `LAT,LNG`.
fn parse_lat_lng(value: &str) -> Result<LatLng, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{value}'"))?;

    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lng}': {e}"))?;

    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {lat} out of range"));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("longitude {lng} out of range"));
    }

    Ok(LatLng::new(lat, lng))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => WidgetConfig::load(path)?,
        None => WidgetConfig::from_env()?,
    };
    let client = QueryClient::new(config.service.clone())?;

    match cli.command {
        Commands::Info => {
            let info = client.info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Points { points, form } => {
            let mut app = AppController::new(
                config,
                form.fields(RegionMode::Point),
                MemorySurface::new(),
                client,
            )?;
            for point in points {
                app.on_map_click(point)?;
            }
            run(app, form.output.as_deref()).await?;
        }
        Commands::Rect {
            north_east,
            south_west,
            form,
        } => {
            let mut app = AppController::new(
                config,
                form.fields(RegionMode::Rect),
                MemorySurface::new(),
                client,
            )?;
            app.on_rectangle_complete(north_east, south_west)?;
            run(app, form.output.as_deref()).await?;
        }
    }

    Ok(())
}

async fn run(
    mut app: AppController<MemorySurface, QueryClient>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = app.submit().await {
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }
    println!("Success!");

    let center = app.config().map.center;
    let zoom = app.config().map.zoom;

    let mut collection = app.into_surface().to_feature_collection();
    let mut view = serde_json::Map::new();
    view.insert("center".to_string(), serde_json::json!(center));
    view.insert("zoom".to_string(), zoom.into());
    collection.foreign_members = Some(view);

    let json = serde_json::to_string_pretty(&collection)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!("Wrote map to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
