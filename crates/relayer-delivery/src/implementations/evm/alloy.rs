//! Execution transactions over JSON-RPC using alloy.

use crate::{DeliveryError, DeliveryInterface, ExecutionCall, Receipt};
use alloy::contract::Error as ContractError;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use alloy::sol_types::decode_revert_reason;
use async_trait::async_trait;
use relayer_types::{
	validate_address, validate_http_url, ConfigSchema, Field, FieldType, Schema, ValidationError,
};
use tracing::debug;

sol! {
	/// Write side of the order book contract.
	#[sol(rpc)]
	interface IOrderExecutor {
		function executePendingOrder(uint256 orderId, bytes proof) external;
	}
}

/// Submits `executePendingOrder` through a wallet-backed provider.
///
/// Nonce, fee and chain id are filled by alloy's recommended fillers.
pub struct AlloyDelivery {
	/// Executor binding over the wallet-backed write provider.
	contract: IOrderExecutor::IOrderExecutorInstance<DynProvider>,
}

impl AlloyDelivery {
	/// Connects to the write endpoint with `wallet` as the signer.
	pub fn new(
		rpc_url: &str,
		contract_address: Address,
		wallet: EthereumWallet,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect_http(url)
			.erased();

		Ok(Self {
			contract: IOrderExecutor::new(contract_address, provider),
		})
	}

	/// ABI arguments of `executePendingOrder`.
	fn call_args(call: &ExecutionCall) -> (U256, Bytes) {
		(
			U256::from(call.order_id),
			Bytes::from(call.proof.to_bytes()),
		)
	}
}

/// Best available reason for a failed call: the decoded revert string, then
/// the node's error message, then the transport error itself.
fn revert_reason(err: &ContractError) -> String {
	if let ContractError::TransportError(rpc) = err {
		if let Some(payload) = rpc.as_error_resp() {
			return payload
				.as_revert_data()
				.and_then(|data| decode_revert_reason(&data))
				.unwrap_or_else(|| payload.message.to_string());
		}
	}
	err.to_string()
}

/// Configuration schema for [`AlloyDelivery`].
pub struct AlloyDeliverySchema;

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(validate_http_url),
				Field::new("contract_address", FieldType::String)
					.with_validator(validate_address),
			],
			// Optional fields
			vec![],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn estimate_gas(&self, call: &ExecutionCall) -> Result<u64, DeliveryError> {
		let (order_id, proof) = Self::call_args(call);

		let estimate = self
			.contract
			.executePendingOrder(order_id, proof)
			.estimate_gas()
			.await
			.map_err(|e| DeliveryError::GasEstimation {
				reason: revert_reason(&e),
			})?;

		debug!(order_id = call.order_id, estimate, "Estimated gas");
		Ok(estimate)
	}

	async fn submit(&self, call: &ExecutionCall, gas_limit: u64) -> Result<TxHash, DeliveryError> {
		let (order_id, proof) = Self::call_args(call);

		// Explicit gas skips the provider's own estimate.
		let pending = self
			.contract
			.executePendingOrder(order_id, proof)
			.gas(gas_limit)
			.send()
			.await
			.map_err(|e| DeliveryError::Submission(revert_reason(&e)))?;

		Ok(*pending.tx_hash())
	}

	async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, DeliveryError> {
		let receipt = self
			.contract
			.provider()
			.get_transaction_receipt(*tx_hash)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| Receipt {
			tx_hash: receipt.transaction_hash,
			block_number: receipt.block_number,
			success: receipt.status(),
		}))
	}
}

/// Creates the alloy delivery from `[delivery.config]` and the relayer wallet.
///
/// Required: `rpc_url`, `contract_address`.
pub fn create_delivery(
	config: &toml::Value,
	wallet: EthereumWallet,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema
		.validate(config)
		.map_err(|e| DeliveryError::InvalidConfig(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DeliveryError::InvalidConfig("rpc_url is required".to_string()))?;

	let contract_address = config
		.get("contract_address")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DeliveryError::InvalidConfig("contract_address is required".to_string()))?
		.parse::<Address>()
		.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid contract address: {}", e)))?;

	Ok(Box::new(AlloyDelivery::new(rpc_url, contract_address, wallet)?))
}
