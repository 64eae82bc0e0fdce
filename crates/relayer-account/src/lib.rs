//! Signing credential for the relayer.
//!
//! The relayer owns exactly one funded account. It is parsed once at startup
//! and handed to the delivery layer as an [`EthereumWallet`], so no component
//! reaches for ambient key material.

use relayer_types::Address;
use thiserror::Error;
use tracing::info;

pub use alloy::network::EthereumWallet;

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// A source of the relayer's signing credential.
pub trait AccountInterface: Send + Sync {
	/// Address that pays for and signs every execution transaction.
	fn address(&self) -> Address;

	/// Wallet used by the write-capable provider to sign transactions.
	fn wallet(&self) -> EthereumWallet;
}

/// Service holding the relayer's single signing account.
pub struct AccountService {
	/// The underlying account implementation.
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		info!(address = %provider.address(), "Relayer account loaded");
		Self { provider }
	}

	/// Returns the relayer address.
	pub fn address(&self) -> Address {
		self.provider.address()
	}

	/// Returns a wallet for the write-capable provider.
	pub fn wallet(&self) -> EthereumWallet {
		self.provider.wallet()
	}
}
