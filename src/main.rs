//! Gesture stream host: runs the causal filters over recorded or piped
//! sensor frames.

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::{Context, Result};
use clap::Parser;
use gesture_stream::{
    app::StreamApp,
    config::Config,
    debounce::DebouncePolicy,
    labels::GestureLabels,
};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file with one frame per line (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Debounce policy (event, change, hold); overrides the config file
    #[arg(short, long)]
    policy: Option<String>,

    /// Comma-separated class names, index 0 first
    #[arg(short, long)]
    labels: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Gesture Stream");

    let config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {config_path}");
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {e}. Using defaults.");
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    config.validate().context("Invalid configuration")?;

    let policy: DebouncePolicy = args
        .policy
        .as_deref()
        .unwrap_or(config.prediction.policy.as_str())
        .parse()?;

    let labels = match &args.labels {
        Some(list) => GestureLabels::from_csv(list),
        None => GestureLabels::new(config.labels.iter().cloned()),
    };

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            info!("Reading frames from: {path}");
            let file = File::open(path).with_context(|| format!("Failed to open input file {path}"))?;
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Reading frames from stdin");
            Box::new(io::stdin().lock())
        }
    };

    let mut app = StreamApp::new(&config, policy, labels)?;
    app.run(reader)?;

    Ok(())
}
