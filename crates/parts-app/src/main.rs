//! Main entry point for the parts-client service.
//!
//! This binary runs the order lifecycle client headless: it loads the
//! configuration, wires the configured backend, storage, and realtime
//! implementations into the engine, and runs the reconciliation loop
//! until interrupted. View layers embed the same engine through the
//! library crates instead of this binary.

use anyhow::Context;
use clap::Parser;
use parts_config::Config;
use parts_core::ClientBuilder;
use std::path::PathBuf;

/// Command-line arguments for the parts-client service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the parts-client service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the client engine with all shipped implementations
/// 5. Runs the engine until interrupted
#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));

	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started parts-client");

	// Load configuration
	let config_path = args.config.to_string_lossy().into_owned();
	let config = Config::from_file(&config_path)
		.await
		.with_context(|| format!("loading configuration from {}", config_path))?;
	tracing::info!(provider_id = %config.client.provider_id, role = %config.client.role, "Loaded configuration");

	// Build the engine with every implementation shipped in the workspace
	let engine = ClientBuilder::new(config)
		.with_default_factories()
		.build()
		.context("building client engine")?;

	// Run until interrupted
	engine.run().await.context("running client engine")?;

	tracing::info!("Stopped parts-client");
	Ok(())
}
