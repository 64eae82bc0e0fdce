//! Configuration model for the relayer.

use relayer_types::{GasStrategy, ProofKey, ProofMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete relayer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// HTTP surface and identity.
	#[serde(default)]
	pub relayer: RelayerSettings,
	/// Signing credential.
	pub account: AccountConfig,
	/// Read-only chain access for pending orders.
	pub reader: ReaderConfig,
	/// Proof oracle access and retry policy.
	pub proof: ProofConfig,
	/// Write-capable chain access and gas policy.
	pub delivery: DeliveryConfig,
	/// Batch deadlines.
	#[serde(default)]
	pub engine: EngineConfig,
}

/// Identity and HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayerSettings {
	/// Name used in startup logs.
	#[serde(default = "default_name")]
	pub name: String,
	/// Interface the HTTP server binds to.
	#[serde(default = "default_host")]
	pub host: String,
	/// Port the HTTP server listens on.
	#[serde(default = "default_http_port")]
	pub http_port: u16,
}

impl Default for RelayerSettings {
	fn default() -> Self {
		Self {
			name: default_name(),
			host: default_host(),
			http_port: default_http_port(),
		}
	}
}

/// Signing credential section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Registered account implementation, `local` by default.
	#[serde(default = "default_account_provider")]
	pub provider: String,
	/// Implementation-specific table, e.g. `private_key`.
	pub config: toml::Value,
}

/// Order book read section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReaderConfig {
	/// Registered reader implementation, `evm_alloy` by default.
	#[serde(default = "default_evm_provider")]
	pub provider: String,
	/// Read attempts per order; one means no retry.
	#[serde(default = "default_reader_attempts")]
	pub max_attempts: u32,
	/// Pause between read attempts, in milliseconds.
	#[serde(default = "default_reader_retry_delay_ms")]
	pub retry_delay_ms: u64,
	/// Implementation-specific table, e.g. `rpc_url` and `contract_address`.
	pub config: toml::Value,
}

/// Proof oracle section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProofConfig {
	/// Registered proof implementation, `http` by default.
	#[serde(default = "default_proof_provider")]
	pub provider: String,
	/// One proof per order, or one shared by the whole batch.
	#[serde(default)]
	pub mode: ProofMode,
	/// Key the oracle expects in per-order mode.
	#[serde(default)]
	pub subject: ProofKey,
	/// Oracle requests per proof before giving up, 1 to 100.
	#[serde(default = "default_proof_attempts")]
	pub max_attempts: u32,
	/// Fixed pause between oracle requests, in milliseconds.
	#[serde(default = "default_proof_retry_delay_ms")]
	pub retry_delay_ms: u64,
	/// Implementation-specific table, e.g. `url` and `method`.
	pub config: toml::Value,
}

/// Transaction submission section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Registered delivery implementation, `evm_alloy` by default.
	#[serde(default = "default_evm_provider")]
	pub provider: String,
	/// Gas limit sizing; estimated x2 by default.
	#[serde(default)]
	pub gas: GasStrategy,
	/// Longest wait for a receipt before the order is reported as an error.
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
	/// Pause between receipt polls, in milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Implementation-specific table, e.g. `rpc_url` and `contract_address`.
	pub config: toml::Value,
}

/// Orchestration deadlines. Both are off unless set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
	/// Upper bound for one order's full pipeline.
	pub order_timeout_secs: Option<u64>,
	/// Upper bound for a whole range request.
	pub batch_timeout_secs: Option<u64>,
}

impl ReaderConfig {
	/// Pause between read attempts.
	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}
}

impl ProofConfig {
	/// Pause between oracle requests.
	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}
}

impl DeliveryConfig {
	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.confirmation_timeout_secs)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

impl EngineConfig {
	pub fn order_timeout(&self) -> Option<Duration> {
		self.order_timeout_secs.map(Duration::from_secs)
	}

	pub fn batch_timeout(&self) -> Option<Duration> {
		self.batch_timeout_secs.map(Duration::from_secs)
	}
}

fn default_name() -> String {
	"order-relayer".to_string()
}

fn default_host() -> String {
	"0.0.0.0".to_string()
}

pub(crate) fn default_http_port() -> u16 {
	3000
}

pub(crate) fn default_account_provider() -> String {
	"local".to_string()
}

pub(crate) fn default_evm_provider() -> String {
	"evm_alloy".to_string()
}

pub(crate) fn default_proof_provider() -> String {
	"http".to_string()
}

pub(crate) fn default_reader_attempts() -> u32 {
	1
}

pub(crate) fn default_reader_retry_delay_ms() -> u64 {
	500
}

pub(crate) fn default_proof_attempts() -> u32 {
	5
}

pub(crate) fn default_proof_retry_delay_ms() -> u64 {
	1000
}

pub(crate) fn default_confirmation_timeout_secs() -> u64 {
	120
}

pub(crate) fn default_poll_interval_ms() -> u64 {
	1000
}
