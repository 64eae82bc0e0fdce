//! Configuration loading from files and environment.

use crate::types::*;
use crate::ConfigError;
use regex::Regex;
use relayer_types::{GasStrategy, ProofKey, ProofMode};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

fn process_env(name: &str) -> Option<String> {
	std::env::var(name).ok()
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "RELAYER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Loads the file if one was given, otherwise builds the config from the
	/// process environment. Overrides and validation apply to both.
	pub async fn load(&self) -> Result<Config, ConfigError> {
		let mut config = match &self.file_path {
			Some(path) => self.load_from_file(path, process_env).await?,
			None => {
				info!("No configuration file given, reading environment");
				Self::from_env()?
			}
		};

		self.apply_env_overrides(&mut config, process_env)?;
		validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file<F>(&self, path: &Path, lookup: F) -> Result<Config, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		info!("Loading configuration from {:?}", path);

		let content = match tokio::fs::read_to_string(path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(path.display().to_string()));
			}
			Err(e) => return Err(e.into()),
		};

		// Substitute before parsing so placeholders work in any format
		let substituted = substitute_env_vars(&content, lookup)?;
		let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("toml");
		Self::parse(&substituted, extension)
	}

	/// Parses configuration text in the format named by `extension`.
	pub fn parse(content: &str, extension: &str) -> Result<Config, ConfigError> {
		match extension {
			"toml" => toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string())),
			"json" => {
				serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
			}
			"yaml" | "yml" => {
				serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
			}
			other => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				other
			))),
		}
	}

	/// Builds a configuration from the process environment.
	pub fn from_env() -> Result<Config, ConfigError> {
		Self::from_env_vars(process_env)
	}

	/// Builds a configuration from flat environment variables.
	///
	/// Required: `RPC_READ`, `RPC_WRITE`, `PRIVATE_KEY`, `CONTRACT_ADDRESS`,
	/// `MULTI_PROOF_API`. Everything else falls back to defaults.
	pub fn from_env_vars<F>(lookup: F) -> Result<Config, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required =
			|name: &str| lookup(name).ok_or_else(|| ConfigError::EnvVarNotFound(name.to_string()));

		// Required variables
		let rpc_read = required("RPC_READ")?;
		let rpc_write = required("RPC_WRITE")?;
		let private_key = required("PRIVATE_KEY")?;
		let contract_address = required("CONTRACT_ADDRESS")?;
		let proof_url = required("MULTI_PROOF_API")?;

		// Optional knobs
		let http_port = parse_env(&lookup, "PORT")?.unwrap_or_else(default_http_port);

		let mode: ProofMode = parse_env_enum(&lookup, "PROOF_MODE")?.unwrap_or_default();
		let subject: ProofKey = parse_env_enum(&lookup, "PROOF_SUBJECT")?.unwrap_or_default();
		let method = lookup("PROOF_METHOD").unwrap_or_else(|| "get".to_string());

		let gas = match lookup("GAS_STRATEGY").as_deref() {
			None | Some("estimated") => GasStrategy::Estimated {
				multiplier: parse_env(&lookup, "GAS_MULTIPLIER")?
					.unwrap_or(relayer_types::DEFAULT_GAS_MULTIPLIER),
			},
			Some("fixed") => GasStrategy::Fixed {
				limit: parse_env(&lookup, "GAS_LIMIT")?
					.unwrap_or(relayer_types::DEFAULT_GAS_CEILING),
			},
			Some(other) => {
				return Err(ConfigError::ValidationError(format!(
					"GAS_STRATEGY must be 'estimated' or 'fixed', got '{}'",
					other
				)));
			}
		};

		Ok(Config {
			relayer: RelayerSettings {
				http_port,
				..RelayerSettings::default()
			},
			account: AccountConfig {
				provider: default_account_provider(),
				config: table([("private_key", private_key)]),
			},
			reader: ReaderConfig {
				provider: default_evm_provider(),
				max_attempts: default_reader_attempts(),
				retry_delay_ms: default_reader_retry_delay_ms(),
				config: table([
					("rpc_url", rpc_read),
					("contract_address", contract_address.clone()),
				]),
			},
			proof: ProofConfig {
				provider: default_proof_provider(),
				mode,
				subject,
				max_attempts: parse_env(&lookup, "PROOF_MAX_ATTEMPTS")?
					.unwrap_or_else(default_proof_attempts),
				retry_delay_ms: parse_env(&lookup, "PROOF_RETRY_DELAY_MS")?
					.unwrap_or_else(default_proof_retry_delay_ms),
				config: table([("url", proof_url), ("method", method)]),
			},
			delivery: DeliveryConfig {
				provider: default_evm_provider(),
				gas,
				confirmation_timeout_secs: parse_env(&lookup, "CONFIRMATION_TIMEOUT_SECS")?
					.unwrap_or_else(default_confirmation_timeout_secs),
				poll_interval_ms: default_poll_interval_ms(),
				config: table([("rpc_url", rpc_write), ("contract_address", contract_address)]),
			},
			engine: EngineConfig::default(),
		})
	}

	fn apply_env_overrides<F>(&self, config: &mut Config, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(http_port) = lookup(&format!("{}HTTP_PORT", self.env_prefix)) {
			debug!("Overriding HTTP port from environment");
			config.relayer.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		Ok(())
	}
}

/// Replaces `${NAME}` and `${NAME:-fallback}` with environment values.
///
/// Text after a `#` that is outside a quoted string is a comment and is
/// copied through untouched.
pub fn substitute_env_vars<F>(content: &str, lookup: F) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;

	let mut result = String::with_capacity(content.len());

	for line in content.split_inclusive('\n') {
		let (code, comment) = line.split_at(comment_start(line));
		let mut last = 0;

		for cap in re.captures_iter(code) {
			let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
				continue;
			};

			let value = match (lookup(var_name.as_str()), cap.get(2)) {
				(Some(value), _) => value,
				(None, Some(fallback)) => fallback.as_str().to_string(),
				(None, None) => {
					return Err(ConfigError::EnvVarNotFound(var_name.as_str().to_string()))
				}
			};

			result.push_str(&code[last..full_match.start()]);
			result.push_str(&value);
			last = full_match.end();
		}

		result.push_str(&code[last..]);
		result.push_str(comment);
	}

	Ok(result)
}

/// Byte offset of the first `#` outside a quoted string, or the line length.
fn comment_start(line: &str) -> usize {
	let mut quote = None;
	let mut escaped = false;

	for (i, c) in line.char_indices() {
		match quote {
			// Basic strings honour backslash escapes, literal strings do not.
			Some('"') if escaped => escaped = false,
			Some('"') if c == '\\' => escaped = true,
			Some(q) if c == q => quote = None,
			Some(_) => {}
			None if c == '"' || c == '\'' => quote = Some(c),
			None if c == '#' => return i,
			None => {}
		}
	}

	line.len()
}

/// Checks cross-field constraints that serde cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

	// Server
	if config.relayer.http_port == 0 {
		return invalid("relayer.http_port must be non-zero");
	}

	for (section, provider) in [
		("account", &config.account.provider),
		("reader", &config.reader.provider),
		("proof", &config.proof.provider),
		("delivery", &config.delivery.provider),
	] {
		if provider.trim().is_empty() {
			return Err(ConfigError::ValidationError(format!(
				"{}.provider must not be empty",
				section
			)));
		}
	}

	// Retry budgets
	if config.reader.max_attempts == 0 {
		return invalid("reader.max_attempts must be at least 1");
	}

	if !(1..=100).contains(&config.proof.max_attempts) {
		return invalid("proof.max_attempts must be between 1 and 100");
	}

	// Gas sizing
	match config.delivery.gas {
		GasStrategy::Estimated { multiplier } if !multiplier.is_finite() || multiplier < 1.0 => {
			return invalid("delivery.gas.multiplier must be a finite number >= 1.0");
		}
		GasStrategy::Fixed { limit } if limit < 21_000 => {
			return invalid("delivery.gas.limit must be at least 21000");
		}
		_ => {}
	}

	// Timeouts
	if config.delivery.confirmation_timeout_secs == 0 {
		return invalid("delivery.confirmation_timeout_secs must be non-zero");
	}

	if config.delivery.poll_interval_ms == 0 {
		return invalid("delivery.poll_interval_ms must be non-zero");
	}

	if config.engine.order_timeout_secs == Some(0) || config.engine.batch_timeout_secs == Some(0) {
		return invalid("engine timeouts must be non-zero when set");
	}

	Ok(())
}

fn table<const N: usize>(entries: [(&str, String); N]) -> toml::Value {
	let mut table = toml::Table::new();
	for (key, value) in entries {
		table.insert(key.to_string(), toml::Value::String(value));
	}
	toml::Value::Table(table)
}

fn parse_env<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
	T: std::str::FromStr,
	T::Err: std::fmt::Display,
	F: Fn(&str) -> Option<String>,
{
	lookup(name)
		.map(|raw| {
			raw.trim()
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid {}: {}", name, e)))
		})
		.transpose()
}

fn parse_env_enum<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
	T: DeserializeOwned,
	F: Fn(&str) -> Option<String>,
{
	lookup(name)
		.map(|raw| {
			serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
				.map_err(|e| ConfigError::ValidationError(format!("Invalid {}: {}", name, e)))
		})
		.transpose()
}
