//! Private key held in process memory.

use crate::{AccountError, AccountInterface};
use alloy::network::EthereumWallet;
use alloy::signers::local::PrivateKeySigner;
use relayer_types::{
	validate_private_key, Address, ConfigSchema, Field, FieldType, Schema, ValidationError,
};

/// Local wallet backed by alloy's [`PrivateKeySigner`].
pub struct LocalWallet {
	/// The underlying alloy signer; also the source of the relayer address.
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Parses a hex private key, with or without the `0x` prefix.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.trim()
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

/// Configuration schema for [`LocalWallet`].
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![Field::new("private_key", FieldType::String).with_validator(validate_private_key)],
			// Optional fields
			vec![],
		);

		schema.validate(config)
	}
}

impl AccountInterface for LocalWallet {
	fn address(&self) -> Address {
		self.signer.address()
	}

	fn wallet(&self) -> EthereumWallet {
		EthereumWallet::from(self.signer.clone())
	}
}

/// Creates a local wallet from `[account.config]`.
///
/// Required: `private_key`.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidConfig(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidConfig("private_key is required".to_string()))?;

	Ok(Box::new(LocalWallet::new(private_key)?))
}
