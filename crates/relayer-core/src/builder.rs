//! Engine construction from configuration.

use crate::engine::{EngineSettings, RelayerEngine};
use crate::RelayerError;
use relayer_account::{AccountError, AccountInterface, AccountService, EthereumWallet};
use relayer_config::Config;
use relayer_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use relayer_orders::{OrderReaderInterface, OrderReaderService, ReaderError};
use relayer_proof::{ProofError, ProofInterface, ProofService};
use relayer_types::RetryPolicy;
use std::collections::HashMap;
use tracing::info;

type AccountFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send>;
type ReaderFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn OrderReaderInterface>, ReaderError> + Send>;
type ProofFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn ProofInterface>, ProofError> + Send>;
type DeliveryFactory = Box<
	dyn Fn(&toml::Value, EthereumWallet) -> Result<Box<dyn DeliveryInterface>, DeliveryError>
		+ Send,
>;

/// Builds a [`RelayerEngine`] by looking up each section's `provider` among
/// the registered factories.
pub struct RelayerBuilder {
	/// Validated configuration the engine is built from.
	config: Config,
	/// Account factories keyed by provider name.
	account_factories: HashMap<String, AccountFactory>,
	/// Order reader factories keyed by provider name.
	reader_factories: HashMap<String, ReaderFactory>,
	/// Proof client factories keyed by provider name.
	proof_factories: HashMap<String, ProofFactory>,
	/// Delivery factories keyed by provider name. They also receive the
	/// relayer wallet.
	delivery_factories: HashMap<String, DeliveryFactory>,
}

fn unknown_provider(section: &str, name: &str) -> RelayerError {
	RelayerError::Config(format!("No {} factory registered for '{}'", section, name))
}

impl RelayerBuilder {
	/// Creates a builder with no registered factories.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			account_factories: HashMap::new(),
			reader_factories: HashMap::new(),
			proof_factories: HashMap::new(),
			delivery_factories: HashMap::new(),
		}
	}

	/// Registers an account factory under `name`, matched against
	/// `account.provider`.
	pub fn with_account_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send + 'static,
	{
		self.account_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Registers an order reader factory under `name`, matched against
	/// `reader.provider`.
	pub fn with_reader_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn OrderReaderInterface>, ReaderError>
			+ Send
			+ 'static,
	{
		self.reader_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Registers a proof client factory under `name`, matched against
	/// `proof.provider`.
	pub fn with_proof_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn ProofInterface>, ProofError> + Send + 'static,
	{
		self.proof_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Registers a delivery factory under `name`, matched against
	/// `delivery.provider`.
	pub fn with_delivery_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value, EthereumWallet) -> Result<Box<dyn DeliveryInterface>, DeliveryError>
			+ Send
			+ 'static,
	{
		self.delivery_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Instantiates every section through its registered factory and wires
	/// the engine. Fails on an unknown provider or a rejected config table.
	pub fn build(self) -> Result<RelayerEngine, RelayerError> {
		let config = &self.config;

		let account_factory = self
			.account_factories
			.get(&config.account.provider)
			.ok_or_else(|| unknown_provider("account", &config.account.provider))?;
		let account = AccountService::new(
			account_factory(&config.account.config)
				.map_err(|e| RelayerError::Config(format!("account: {}", e)))?,
		);

		let reader_factory = self
			.reader_factories
			.get(&config.reader.provider)
			.ok_or_else(|| unknown_provider("reader", &config.reader.provider))?;
		let reader = OrderReaderService::with_retry(
			reader_factory(&config.reader.config)
				.map_err(|e| RelayerError::Config(format!("reader: {}", e)))?,
			RetryPolicy::new(config.reader.max_attempts, config.reader.retry_delay()),
		);

		let proof_factory = self
			.proof_factories
			.get(&config.proof.provider)
			.ok_or_else(|| unknown_provider("proof", &config.proof.provider))?;
		let proof = ProofService::new(
			proof_factory(&config.proof.config)
				.map_err(|e| RelayerError::Config(format!("proof: {}", e)))?,
			RetryPolicy::new(config.proof.max_attempts, config.proof.retry_delay()),
		);

		// Delivery signs with the account's wallet.
		let delivery_factory = self
			.delivery_factories
			.get(&config.delivery.provider)
			.ok_or_else(|| unknown_provider("delivery", &config.delivery.provider))?;
		let delivery = DeliveryService::new(
			delivery_factory(&config.delivery.config, account.wallet())
				.map_err(|e| RelayerError::Config(format!("delivery: {}", e)))?,
			config.delivery.gas,
			config.delivery.confirmation_timeout(),
			config.delivery.poll_interval(),
		);

		let settings = EngineSettings {
			proof_mode: config.proof.mode,
			proof_key: config.proof.subject,
			order_timeout: config.engine.order_timeout(),
			batch_timeout: config.engine.batch_timeout(),
		};

		info!(
			proof_mode = %settings.proof_mode,
			proof_key = ?settings.proof_key,
			proof_attempts = config.proof.max_attempts,
			gas = %config.delivery.gas,
			"Relayer engine configured"
		);

		Ok(RelayerEngine::new(account, reader, proof, delivery, settings))
	}
}
