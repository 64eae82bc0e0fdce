//! Order book reads over JSON-RPC using alloy.

use crate::{OrderReaderInterface, ReaderError};
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;
use relayer_types::{
	validate_address, validate_http_url, ConfigSchema, Field, FieldType, OrderId, OrderLookup,
	PendingOrder, Schema, ValidationError,
};
use tracing::debug;

sol! {
	/// Read side of the order book contract.
	#[sol(rpc)]
	interface IOrderBook {
		function pendingOrders(uint256 orderId) external view returns (
			address user,
			uint256 assetIndex,
			uint256 usdSize,
			uint256 leverage,
			bool isLong,
			uint256 slPrice,
			uint256 tpPrice,
			uint256 timestamp
		);
	}
}

/// Reads `pendingOrders(uint256)` from a read-only RPC endpoint.
pub struct AlloyOrderReader {
	/// Order book binding over a read-only HTTP provider.
	contract: IOrderBook::IOrderBookInstance<DynProvider>,
}

impl AlloyOrderReader {
	/// Connects to `rpc_url` without a wallet; reads never sign.
	pub fn new(rpc_url: &str, contract_address: Address) -> Result<Self, ReaderError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ReaderError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new().connect_http(url).erased();

		Ok(Self {
			contract: IOrderBook::new(contract_address, provider),
		})
	}
}

/// Narrows a `uint256` getter field, naming the field on overflow.
fn to_u64(field: &str, value: U256) -> Result<u64, ReaderError> {
	u64::try_from(value)
		.map_err(|_| ReaderError::Decode(format!("{} {} does not fit in u64", field, value)))
}

/// Converts the raw getter output into the shared order model.
pub fn decode_order(
	order_id: OrderId,
	raw: IOrderBook::pendingOrdersReturn,
) -> Result<OrderLookup, ReaderError> {
	// Deleted slots carry arbitrary leftovers; do not decode them.
	if raw.user.is_zero() {
		return Ok(OrderLookup::Absent);
	}

	Ok(PendingOrder {
		order_id,
		owner: raw.user,
		// Prices and sizes stay U256; only ids and times are narrowed
		asset_index: to_u64("assetIndex", raw.assetIndex)?,
		usd_size: raw.usdSize,
		leverage: raw.leverage,
		is_long: raw.isLong,
		stop_loss_price: raw.slPrice,
		take_profit_price: raw.tpPrice,
		timestamp: to_u64("timestamp", raw.timestamp)?,
	}
	.into())
}

/// Configuration schema for [`AlloyOrderReader`].
pub struct AlloyOrderReaderSchema;

impl ConfigSchema for AlloyOrderReaderSchema {
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
impl OrderReaderInterface for AlloyOrderReader {
	async fn read_order(&self, order_id: OrderId) -> Result<OrderLookup, ReaderError> {
		// The getter never reverts; unallocated ids come back zeroed.
		let raw = self
			.contract
			.pendingOrders(U256::from(order_id))
			.call()
			.await
			.map_err(|e| ReaderError::Network(format!("pendingOrders({}) failed: {}", order_id, e)))?;

		debug!(order_id, owner = %raw.user, "Read pending order");
		decode_order(order_id, raw)
	}
}

/// Creates the alloy order reader from `[reader.config]`.
///
/// Required: `rpc_url`, `contract_address`.
pub fn create_order_reader(
	config: &toml::Value,
) -> Result<Box<dyn OrderReaderInterface>, ReaderError> {
	AlloyOrderReaderSchema
		.validate(config)
		.map_err(|e| ReaderError::InvalidConfig(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ReaderError::InvalidConfig("rpc_url is required".to_string()))?;

	let contract_address = config
		.get("contract_address")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ReaderError::InvalidConfig("contract_address is required".to_string()))?
		.parse::<Address>()
		.map_err(|e| ReaderError::InvalidConfig(format!("Invalid contract address: {}", e)))?;

	Ok(Box::new(AlloyOrderReader::new(rpc_url, contract_address)?))
}
