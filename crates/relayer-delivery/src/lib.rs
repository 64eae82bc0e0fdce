//! Execution transaction submission.
//!
//! [`DeliveryService`] runs the pre-flight gas estimate, sizes the gas limit
//! with the configured [`GasStrategy`], submits `executePendingOrder` and
//! polls for the receipt until the confirmation timeout elapses.

use async_trait::async_trait;
use relayer_types::{OrderId, Proof};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use alloy::primitives::TxHash;
pub use relayer_types::GasStrategy;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The simulated call failed, usually because it would revert.
	#[error("{reason}")]
	GasEstimation { reason: String },
	#[error("Failed to send transaction: {0}")]
	Submission(String),
	#[error("transaction {tx_hash} reverted")]
	Reverted { tx_hash: TxHash },
	#[error("transaction {tx_hash} not confirmed within {}s", .timeout.as_secs())]
	ConfirmationTimeout { tx_hash: TxHash, timeout: Duration },
	#[error("Network error: {0}")]
	Network(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// Arguments of one `executePendingOrder(orderId, proof)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionCall {
	/// Order book key passed as `orderId`.
	pub order_id: OrderId,
	/// Normalized oracle proof, ABI-encoded as `bytes`.
	pub proof: Proof,
}

/// Inclusion receipt of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
	/// Hash of the included transaction.
	pub tx_hash: TxHash,
	/// Block the transaction was included in, when the node reports it.
	pub block_number: Option<u64>,
	/// Receipt status; `false` means the transaction reverted on chain.
	pub success: bool,
}

#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Simulates the call. A revert surfaces as [`DeliveryError::GasEstimation`]
	/// carrying the decoded reason.
	async fn estimate_gas(&self, call: &ExecutionCall) -> Result<u64, DeliveryError>;

	/// Signs and broadcasts the call with an explicit gas limit.
	async fn submit(&self, call: &ExecutionCall, gas_limit: u64) -> Result<TxHash, DeliveryError>;

	/// Returns the receipt once the transaction is included.
	async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, DeliveryError>;
}

/// Service wrapping a [`DeliveryInterface`] with gas sizing and a bounded
/// confirmation wait.
pub struct DeliveryService {
	/// The underlying chain implementation.
	delivery: Box<dyn DeliveryInterface>,
	/// How the gas limit is derived from the estimate.
	gas: GasStrategy,
	/// Longest time to wait for a receipt after submission.
	confirmation_timeout: Duration,
	/// Pause between receipt polls.
	poll_interval: Duration,
}

impl DeliveryService {
	pub fn new(
		delivery: Box<dyn DeliveryInterface>,
		gas: GasStrategy,
		confirmation_timeout: Duration,
		poll_interval: Duration,
	) -> Self {
		Self {
			delivery,
			gas,
			confirmation_timeout,
			poll_interval,
		}
	}

	/// Returns the configured gas strategy.
	pub fn gas_strategy(&self) -> GasStrategy {
		self.gas
	}

	/// Estimates, submits and waits for a successful inclusion.
	#[instrument(skip_all, fields(order_id = call.order_id))]
	pub async fn execute(&self, call: &ExecutionCall) -> Result<Receipt, DeliveryError> {
		// Pre-flight: a revert here means nothing is sent
		let estimate = self.delivery.estimate_gas(call).await?;
		let gas_limit = self.gas.gas_limit(estimate);

		if let GasStrategy::Fixed { limit } = self.gas {
			if estimate > limit {
				warn!(estimate, limit, "Gas estimate exceeds the fixed ceiling");
			}
		}
		debug!(estimate, gas_limit, strategy = %self.gas, "Sized gas limit");

		let tx_hash = self.delivery.submit(call, gas_limit).await?;
		info!(%tx_hash, gas_limit, "Submitted execution transaction");

		let receipt = self.wait_for_confirmation(&tx_hash).await?;
		// Included but reverted is still a failure
		if !receipt.success {
			return Err(DeliveryError::Reverted { tx_hash });
		}

		debug!(%tx_hash, block = ?receipt.block_number, "Transaction confirmed");
		Ok(receipt)
	}

	/// Polls for the receipt until it appears or the timeout elapses.
	///
	/// Receipt lookup errors are logged and polled through; the submitted
	/// transaction may still be mined, so only the timeout ends the wait.
	pub async fn wait_for_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, DeliveryError> {
		let poll = async {
			loop {
				match self.delivery.get_receipt(tx_hash).await {
					Ok(Some(receipt)) => return receipt,
					Ok(None) => {}
					Err(e) => warn!(%tx_hash, error = %e, "Receipt lookup failed, retrying"),
				}
				tokio::time::sleep(self.poll_interval).await;
			}
		};

		tokio::time::timeout(self.confirmation_timeout, poll)
			.await
			.map_err(|_| DeliveryError::ConfirmationTimeout {
				tx_hash: *tx_hash,
				timeout: self.confirmation_timeout,
			})
	}
}
