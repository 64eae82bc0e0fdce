//! Sequential range execution.

use crate::failure::OrderFailure;
use crate::RelayerError;
use futures::FutureExt;
use relayer_account::AccountService;
use relayer_delivery::{DeliveryService, ExecutionCall, GasStrategy};
use relayer_orders::OrderReaderService;
use relayer_proof::ProofService;
use relayer_types::{
	Address, AssetIndexEntry, AssetIndexListing, BatchResult, ExecutionOutcome, ExecutionResult,
	OrderId, OrderLookup, OrderRange, Proof, ProofKey, ProofMode,
};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

pub const BATCH_DEADLINE_REASON: &str = "batch deadline exceeded";

// Preallocation cap for very wide ranges.
const MAX_PREALLOCATED_RESULTS: u64 = 1024;

/// Knobs that shape how a batch is processed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineSettings {
	/// Whether each order gets its own proof or the batch shares one.
	pub proof_mode: ProofMode,
	/// Which order field is sent to the oracle in per-order mode.
	pub proof_key: ProofKey,
	/// Upper bound for one order's read, proof and delivery.
	pub order_timeout: Option<Duration>,
	/// Upper bound for a whole range, shared proof fetch included.
	pub batch_timeout: Option<Duration>,
}

/// Drives reader, proof client and submitter across an order range.
///
/// Orders are processed strictly one after another. Concurrent range
/// requests queue on `execution_lock`, so the signing account never has two
/// transactions in flight.
pub struct RelayerEngine {
	/// Signing account; only its address is used after construction.
	account: AccountService,
	/// Order book reads.
	reader: OrderReaderService,
	/// Oracle access with retry.
	proof: ProofService,
	/// Transaction submission and confirmation.
	delivery: DeliveryService,
	/// Batch processing knobs.
	settings: EngineSettings,
	/// Held for the whole of `execute_range`.
	execution_lock: Mutex<()>,
}

impl RelayerEngine {
	pub fn new(
		account: AccountService,
		reader: OrderReaderService,
		proof: ProofService,
		delivery: DeliveryService,
		settings: EngineSettings,
	) -> Self {
		Self {
			account,
			reader,
			proof,
			delivery,
			settings,
			execution_lock: Mutex::new(()),
		}
	}

	/// Address that signs every execution transaction.
	pub fn relayer_address(&self) -> Address {
		self.account.address()
	}

	/// Returns the batch processing settings.
	pub fn settings(&self) -> &EngineSettings {
		&self.settings
	}

	/// Returns the delivery gas strategy.
	pub fn gas_strategy(&self) -> GasStrategy {
		self.delivery.gas_strategy()
	}

	/// Processes every id in `range` and returns one result per id, in order.
	///
	/// Only a failed shared proof fetch aborts the batch; every other failure
	/// is recorded against its order.
	#[instrument(skip(self), fields(start = range.start(), end = range.end()))]
	pub async fn execute_range(&self, range: OrderRange) -> Result<BatchResult, RelayerError> {
		// Serialize ranges so the signer's nonce is never contended
		let _guard = self.execution_lock.lock().await;
		info!(orders = range.len(), mode = %self.settings.proof_mode, "Executing order range");

		// The shared proof fetch counts against the batch deadline.
		let deadline = self.settings.batch_timeout.map(|limit| Instant::now() + limit);

		let shared_proof = match self.settings.proof_mode {
			ProofMode::SharedForBatch => Some(self.fetch_shared_proof(deadline).await?),
			ProofMode::PerOrder => None,
		};

		let mut results = Vec::with_capacity(range.len().min(MAX_PREALLOCATED_RESULTS) as usize);

		for order_id in range.ids() {
			let result = match deadline {
				// Orders not started before the deadline still get a result
				Some(deadline) if Instant::now() >= deadline => {
					ExecutionResult::error(order_id, BATCH_DEADLINE_REASON)
				}
				Some(deadline) => tokio::time::timeout_at(
					deadline,
					self.process_order(order_id, shared_proof.as_ref()),
				)
				.await
				.unwrap_or_else(|_| ExecutionResult::error(order_id, BATCH_DEADLINE_REASON)),
				None => self.process_order(order_id, shared_proof.as_ref()).await,
			};
			results.push(result);
		}

		let batch = BatchResult::new(results);
		info!(
			total = batch.total,
			executed = batch.count_status("executed"),
			skipped = batch.count_status("skipped"),
			failed = batch.count_status("failed"),
			errors = batch.count_status("error"),
			"Order range finished"
		);

		Ok(batch)
	}

	/// Fetches the proof reused by every order of a shared-mode batch.
	/// Failure, or running past the batch deadline, aborts the batch.
	async fn fetch_shared_proof(&self, deadline: Option<Instant>) -> Result<Proof, RelayerError> {
		let fetch = self.proof.fetch_proof(None);

		let fetched = match deadline {
			Some(deadline) => tokio::time::timeout_at(deadline, fetch).await.map_err(|_| {
				RelayerError::UpstreamBatch(format!(
					"{} while fetching the shared proof",
					BATCH_DEADLINE_REASON
				))
			})?,
			None => fetch.await,
		};

		fetched.map_err(|e| RelayerError::UpstreamBatch(e.to_string()))
	}

	/// Lists the asset index of every live order in `range`.
	///
	/// Read-only, so it does not wait for a running execution. Orders that
	/// cannot be read are left out.
	#[instrument(skip(self), fields(start = range.start(), end = range.end()))]
	pub async fn list_asset_indexes(&self, range: OrderRange) -> AssetIndexListing {
		let mut entries = Vec::new();

		for order_id in range.ids() {
			match self.reader.read_order(order_id).await {
				Ok(OrderLookup::Present(order)) => entries.push(AssetIndexEntry {
					order_id,
					asset_index: order.asset_index,
				}),
				Ok(OrderLookup::Absent) => {}
				Err(e) => warn!(order_id, error = %e, "Skipping unreadable order"),
			}
		}

		AssetIndexListing::new(entries)
	}

	/// Runs one order to a terminal result. Never fails and never panics.
	#[instrument(skip(self, shared_proof))]
	async fn process_order(&self, order_id: OrderId, shared_proof: Option<&Proof>) -> ExecutionResult {
		// Panics stop at the order boundary
		let pipeline = AssertUnwindSafe(self.run_pipeline(order_id, shared_proof)).catch_unwind();

		let outcome = match self.settings.order_timeout {
			Some(limit) => tokio::time::timeout(limit, pipeline)
				.await
				.unwrap_or_else(|_| Ok(Err(OrderFailure::timeout(limit)))),
			None => pipeline.await,
		};

		// Timeout, classified failure or panic each map to one terminal result
		let result = match outcome {
			Ok(Ok(result)) => result,
			Ok(Err(failure)) => failure.into_result(order_id),
			Err(panic) => OrderFailure::panicked(panic).into_result(order_id),
		};

		match &result.outcome {
			ExecutionOutcome::Executed { tx_hash } => {
				info!(order_id, tx_hash = %tx_hash, "Executed order")
			}
			ExecutionOutcome::Skipped { reason } => debug!(order_id, reason = %reason, "Skipped order"),
			ExecutionOutcome::Failed { reason } | ExecutionOutcome::Error { reason } => {
				error!(order_id, status = result.status(), reason = %reason, "Order not executed")
			}
		}

		result
	}

	/// Read, proof, delivery. Errors are classified by their `From` impls.
	async fn run_pipeline(
		&self,
		order_id: OrderId,
		shared_proof: Option<&Proof>,
	) -> Result<ExecutionResult, OrderFailure> {
		let order = match self.reader.read_order(order_id).await? {
			OrderLookup::Present(order) => order,
			OrderLookup::Absent => return Ok(ExecutionResult::deleted(order_id)),
		};

		// Per-order mode asks for a fresh proof every time
		let proof = match shared_proof {
			Some(proof) => proof.clone(),
			None => {
				let subject = self.settings.proof_key.subject_for(&order);
				self.proof.fetch_proof(Some(subject)).await?
			}
		};

		let receipt = self
			.delivery
			.execute(&ExecutionCall { order_id, proof })
			.await?;

		Ok(ExecutionResult::executed(order_id, receipt.tx_hash.to_string()))
	}
}
