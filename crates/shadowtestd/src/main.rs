use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use shadowtest_core::{ShadowConfig, ShadowDispatcher};
use shadowtestd::{serve, AppState};

#[derive(Parser)]
#[command(name = "shadowtestd")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Shadow testing HTTP service", long_about = None)]
struct Args {
    /// Address to listen on (overrides config)
    #[arg(long, env = "SHADOWTEST_BIND")]
    bind: Option<String>,

    /// Production model endpoint (overrides config; default is the mock model)
    #[arg(long)]
    primary_url: Option<String>,

    /// Candidate model endpoint (overrides config; default is the mock model)
    #[arg(long)]
    shadow_url: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    shadowtest_core::init_tracing(args.json, level);

    let mut config =
        ShadowConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.primary_url.is_some() {
        config.backends.primary_url = args.primary_url;
    }
    if args.shadow_url.is_some() {
        config.backends.shadow_url = args.shadow_url;
    }
    config.validate().context("Invalid configuration")?;
    let addr = config.bind_addr().context("Invalid bind address")?;

    let dispatcher = ShadowDispatcher::from_config(
        config.backends.primary_backend(),
        config.backends.shadow_backend(),
        &config.dispatch,
    );
    let state = AppState::new(dispatcher, config.comparator.comparator());

    info!(version = shadowtest_core::VERSION, "shadowtestd starting");
    serve(addr, state).await
}
