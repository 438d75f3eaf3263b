use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use iss_track::catalog::{TleLoader, TleSource};
use iss_track::config::Config;
use iss_track::tracker::{DisplayUpdate, TickReport, TrackingController};

#[derive(Parser)]
#[command(name = "iss-track")]
#[command(about = "Track a satellite's sky position and orbit trail from TLE data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracking loop until interrupted
    Track {
        #[arg(short, long)]
        config: Option<String>,
        /// Override the configured TLE source (URL or file path)
        #[arg(long)]
        source: Option<String>,
        /// Print display updates as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Load a TLE catalog and list its bodies
    Catalog { source: String },
    /// Seed once and print the orbit trail as JSON
    Trail {
        #[arg(short, long)]
        config: Option<String>,
        #[arg(long)]
        source: Option<String>,
        /// Seed instant (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track {
            config,
            source,
            json,
        } => track(config.as_deref(), source, json).await,
        Commands::Catalog { source } => catalog(&source).await,
        Commands::Trail { config, source, at } => trail(config.as_deref(), source, at).await,
    }
}

fn load_config(path: Option<&str>, source: Option<String>) -> Option<Config> {
    let mut config = match Config::load(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return None;
        }
    };
    if let Some(source) = source {
        config.tle_source = source;
    }
    Some(config)
}

fn new_loader() -> Option<TleLoader> {
    match TleLoader::new() {
        Ok(loader) => Some(loader),
        Err(e) => {
            eprintln!("{}", e);
            None
        }
    }
}

async fn track(path: Option<&str>, source: Option<String>, json: bool) -> ExitCode {
    let Some(config) = load_config(path, source) else {
        return ExitCode::FAILURE;
    };
    let (tle_source, frame, interval, settings) = match (
        config.source(),
        config.local_frame(),
        config.tick_interval(),
        config.tracker_settings(),
    ) {
        (Ok(s), Ok(f), Ok(i), Ok(t)) => (s, f, i, t),
        (Err(e), _, _, _) | (_, Err(e), _, _) | (_, _, Err(e), _) | (_, _, _, Err(e)) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let Some(mut loader) = new_loader() else {
        return ExitCode::FAILURE;
    };

    let mut controller = TrackingController::new(settings, frame);
    let handle = loader.load(
        tle_source,
        Some(Box::new(|loaded: u64, total: Option<u64>| match total {
            Some(total) => log::debug!("loading: {} of {}...", loaded, total),
            None => log::debug!("loading: {} bytes...", loaded),
        })),
    );
    controller.await_catalog(handle);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_printed: Option<DisplayUpdate> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = controller.tick(Utc::now(), None);
                if last_printed.as_ref() != Some(&report.display) || report.trail_changed {
                    publish(&report, &controller, json);
                    last_printed = Some(report.display);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping tracker");
                break;
            }
        }
    }

    ExitCode::SUCCESS
}

fn publish(report: &TickReport, controller: &TrackingController, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => log::error!("Failed to serialize display update: {}", e),
        }
        return;
    }

    let body = &controller.settings().body;
    match &report.display {
        DisplayUpdate::AwaitingData => println!("Waiting for TLE data for {}", body),
        DisplayUpdate::Tracking {
            time, fix, range_m, ..
        } => println!(
            "{} {} location: {:.6}, {:.6}  height: {:.0} m  range: {:.0} m  [{}]",
            time.format("%H:%M:%S"),
            body,
            fix.longitude_deg,
            fix.latitude_deg,
            fix.height_m,
            range_m,
            report.phase
        ),
    }
}

async fn catalog(source: &str) -> ExitCode {
    let source: TleSource = match source.parse() {
        Ok(s) => s,
        Err(e) => match e {},
    };
    let Some(mut loader) = new_loader() else {
        return ExitCode::FAILURE;
    };

    match loader.load(source, None).wait().await {
        Ok(catalog) => {
            println!("{} bodies", catalog.len());
            for name in catalog.names() {
                if let Some(set) = catalog.get(name) {
                    println!("  {:>6}  {}", set.norad_id(), name);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Load error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn trail(path: Option<&str>, source: Option<String>, at: Option<String>) -> ExitCode {
    let Some(config) = load_config(path, source) else {
        return ExitCode::FAILURE;
    };
    let at = match at.as_deref().map(DateTime::parse_from_rfc3339).transpose() {
        Ok(t) => t.map(|t| t.with_timezone(&Utc)).unwrap_or_else(Utc::now),
        Err(e) => {
            eprintln!("Invalid --at time: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let (tle_source, frame, settings) =
        match (config.source(), config.local_frame(), config.tracker_settings()) {
            (Ok(s), Ok(f), Ok(t)) => (s, f, t),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                eprintln!("Config error: {}", e);
                return ExitCode::FAILURE;
            }
        };
    let Some(mut loader) = new_loader() else {
        return ExitCode::FAILURE;
    };

    let catalog = match loader.load(tle_source, None).wait().await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Load error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut controller = TrackingController::new(settings, frame);
    controller.set_catalog(catalog);
    controller.tick(at, None);

    if !controller.trail().is_initialized() {
        eprintln!("{} could not be tracked", config.body);
        return ExitCode::FAILURE;
    }

    let points: Vec<_> = controller.trail().points().collect();
    match serde_json::to_string_pretty(&points) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
