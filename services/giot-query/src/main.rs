//! GIoT query tool
//!
//! Answers GIoT data requests from a sensor fixture and prints the JSON reply.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use giot_query::AppState;

/// GIoT sensor-data query tool
#[derive(Parser, Debug)]
#[command(name = "giot-query")]
#[command(about = "Answer GIoT sensor-data requests from a sensor fixture")]
struct Args {
    /// Coverage description (YAML)
    #[arg(long, default_value = "config/coverage.yaml", env = "GIOT_COVERAGE")]
    coverage: PathBuf,

    /// Sensor fixture (YAML or JSON)
    #[arg(long, default_value = "config/sensors.yaml", env = "GIOT_SENSORS")]
    sensors: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "GIOT_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the server information reply
    Info,
    /// Answer a data request read from a file, or stdin when omitted
    Query {
        /// Request file (JSON)
        request: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    // Logs go to stderr so stdout carries only the reply
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let state = AppState::load(&args.coverage, &args.sensors)?;

    let output = match &args.command {
        Command::Info => {
            let info = state.info();
            if args.pretty {
                serde_json::to_string_pretty(&info)?
            } else {
                serde_json::to_string(&info)?
            }
        }
        Command::Query { request } => {
            let json = read_request(request.as_ref())?;
            let reply = state.query(&json).await;
            info!(
                status = %reply.status,
                replies = reply.replies.len(),
                "Request processed"
            );
            if args.pretty {
                reply.to_json_pretty()?
            } else {
                reply.to_json()?
            }
        }
    };

    println!("{}", output);
    Ok(())
}

fn read_request(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request: {:?}", path)),
        None => {
            let mut json = String::new();
            std::io::stdin()
                .read_to_string(&mut json)
                .context("Failed to read request from stdin")?;
            Ok(json)
        }
    }
}
