//! Face anchor demo: runs the tracker against a scripted scene and reports
//! what the renderer was asked to do.

use anyhow::Result;
use clap::Parser;
use face_anchor::app::TrackerApp;
use face_anchor::config::{Config, EXAMPLE_CONFIG};
use face_anchor::registry::TrackingMode;
use log::{info, warn};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// How long to run the scripted scene, in seconds
    #[arg(short, long, default_value = "10")]
    duration_secs: u64,

    /// Track one face per label instead of a single slot
    #[arg(long)]
    multi: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_example_config: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_example_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Face anchor tracker");

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    if args.multi {
        config.registry.mode = TrackingMode::Multi;
    }

    let mut app = TrackerApp::new(&config)?;
    let summary = app.run_demo(Duration::from_secs(args.duration_secs)).await?;
    app.shutdown()?;

    info!(
        "Anchors created: {}, moved: {}, hidden: {}, removed: {}, visible at end: {}",
        summary.created, summary.moved, summary.hidden, summary.removed, summary.tracked_at_end
    );
    Ok(())
}
