use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relayer_account::implementations::local::create_account;
use relayer_config::{Config, ConfigLoader};
use relayer_core::{RelayerBuilder, RelayerEngine};
use relayer_delivery::implementations::evm::alloy::create_delivery;
use relayer_orders::implementations::evm::alloy::create_order_reader;
use relayer_proof::implementations::http::create_proof_client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Parser)]
#[command(name = "relayer")]
#[command(about = "Pending order execution relayer", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Configuration file. Without one, configuration is read from the
	/// environment (RPC_READ, RPC_WRITE, PRIVATE_KEY, ...).
	#[arg(short, long, value_name = "FILE", env = "RELAYER_CONFIG")]
	config: Option<PathBuf>,

	#[arg(long, env = "RELAYER_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the relayer HTTP service
	Start,
	/// Validate the configuration without serving
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	// A missing .env file is normal in deployed environments.
	let dotenv = dotenvy::dotenv();

	// Parse after .env so clap's env fallbacks see its values
	let cli = Cli::parse();
	setup_tracing(&cli.log_level)?;

	if let Ok(path) = dotenv {
		info!("Loaded environment from {:?}", path);
	}

	match cli.command {
		Some(Commands::Start) | None => start_service(cli).await,
		Some(Commands::Validate) => validate_config(cli).await,
	}
}

async fn load_config(cli: &Cli) -> Result<Config> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = &cli.config {
		loader = loader.with_file(path);
	}

	loader.load().await.context("Failed to load configuration")
}

fn build_engine(config: Config) -> Result<RelayerEngine> {
	RelayerBuilder::new(config)
		.with_account_factory("local", create_account)
		.with_reader_factory("evm_alloy", create_order_reader)
		.with_proof_factory("http", create_proof_client)
		.with_delivery_factory("evm_alloy", create_delivery)
		.build()
		.context("Failed to build relayer engine")
}

async fn start_service(cli: Cli) -> Result<()> {
	info!("Starting relayer");

	let config = load_config(&cli).await?;
	let host = config.relayer.host.clone();
	let port = config.relayer.http_port;
	info!("Relayer name: {}", config.relayer.name);

	let engine = Arc::new(build_engine(config)?);
	info!(relayer = %engine.relayer_address(), "Relayer account ready");

	server::start_server(engine, &host, port, setup_shutdown_signal())
		.await
		.context("HTTP server failed")?;

	info!("Relayer stopped");
	Ok(())
}

async fn validate_config(cli: Cli) -> Result<()> {
	match &cli.config {
		Some(path) => info!("Validating configuration file: {:?}", path),
		None => info!("Validating configuration from environment"),
	}

	let config = load_config(&cli).await?;
	let summary = format!(
		"proof: {} ({}, {} attempts), gas: {}, port: {}",
		config.proof.provider,
		config.proof.mode,
		config.proof.max_attempts,
		config.delivery.gas,
		config.relayer.http_port
	);

	// Building the engine runs every factory's schema check
	let engine = build_engine(config)?;

	info!("Configuration is valid");
	info!("Relayer account: {}", engine.relayer_address());
	info!("{}", summary);
	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	// RUST_LOG wins over the CLI level
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
		.context("Invalid log level")?;

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			warn!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				warn!("Failed to listen for SIGTERM: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	info!("Shutdown signal received, draining connections");
}
