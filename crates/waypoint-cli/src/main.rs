//! waypoint: operator CLI for the live traveler location channel.
//!
//! `watch` runs the subscriber role and prints the tracked travelers;
//! `publish` runs the publisher role over positions read as JSON lines.

mod commands;
mod display;
mod input;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use waypoint_common::WaypointError;
use waypoint_live::AuthToken;

#[derive(Parser)]
#[command(name = "waypoint", version, about = "Live traveler location channel client")]
struct Args {
    /// Config file (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `channel.endpoint`.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Bearer token presented at handshake.
    #[arg(long, env = "WAYPOINT_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Log level for waypoint crates; overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Subscribe and print every traveler position as it changes.
    Watch,
    /// Publish positions read as JSON lines `{"lat", "lng", "timestamp"?}`.
    ///
    /// Lines without a timestamp are stamped on arrival, so replayed files
    /// should carry their own timestamps.
    Publish {
        /// Input file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(format!("waypoint={level}")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "waypoint=info".into()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "waypoint failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), WaypointError> {
    let config = waypoint_config::load_config(args.config.as_deref(), args.endpoint.as_deref())?;
    let token = args
        .token
        .clone()
        .map(AuthToken::new)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            WaypointError::Other("missing token: pass --token or set WAYPOINT_TOKEN".into())
        })?;

    match args.command {
        Command::Watch => commands::watch::run(config, token).await,
        Command::Publish { input } => commands::publish::run(config, token, &input).await,
    }
}
