//! Orchestration tests against stubbed chain, oracle and submitter.

use crate::*;
use async_trait::async_trait;
use relayer_account::implementations::local::LocalWallet;
use relayer_account::AccountService;
use relayer_delivery::{
	DeliveryError, DeliveryInterface, DeliveryService, ExecutionCall, GasStrategy, Receipt, TxHash,
};
use relayer_orders::{OrderReaderInterface, OrderReaderService, ReaderError};
use relayer_proof::{ProofError, ProofInterface, ProofService};
use relayer_types::{
	Address, OrderId, OrderLookup, OrderRange, PendingOrder, ProofKey, ProofMode, ProofSubject,
	RetryPolicy, U256,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Default)]
struct Counters {
	reads: AtomicU32,
	proofs: AtomicU32,
	estimates: AtomicU32,
	submits: AtomicU32,
	receipts: AtomicU32,
}

impl Counters {
	fn get(counter: &AtomicU32) -> u32 {
		counter.load(Ordering::SeqCst)
	}
}

#[derive(Clone, Copy)]
enum Slot {
	Deleted,
	Unreadable,
	Panics,
	Hangs,
}

// Ids without a slot entry read as live orders with asset index `id * 10`.
struct StubReader {
	counters: Arc<Counters>,
	slots: HashMap<OrderId, Slot>,
}

#[async_trait]
impl OrderReaderInterface for StubReader {
	async fn read_order(&self, order_id: OrderId) -> Result<OrderLookup, ReaderError> {
		self.counters.reads.fetch_add(1, Ordering::SeqCst);
		match self.slots.get(&order_id) {
			Some(Slot::Deleted) => Ok(OrderLookup::Absent),
			Some(Slot::Unreadable) => Err(ReaderError::Network("connection reset".into())),
			Some(Slot::Panics) => panic!("corrupt slot {}", order_id),
			Some(Slot::Hangs) => std::future::pending().await,
			None => Ok(OrderLookup::Present(PendingOrder {
				order_id,
				owner: Address::repeat_byte(0x42),
				asset_index: order_id * 10,
				usd_size: U256::from(1_000u64),
				leverage: U256::from(3u64),
				is_long: true,
				stop_loss_price: U256::ZERO,
				take_profit_price: U256::ZERO,
				timestamp: 1_700_000_000,
			})),
		}
	}
}

struct StubOracle {
	counters: Arc<Counters>,
	proof: Option<String>,
	subjects: Arc<Mutex<Vec<Option<ProofSubject>>>>,
}

#[async_trait]
impl ProofInterface for StubOracle {
	async fn fetch_raw(&self, subject: Option<ProofSubject>) -> Result<String, ProofError> {
		self.counters.proofs.fetch_add(1, Ordering::SeqCst);
		self.subjects.lock().unwrap().push(subject);
		self.proof.clone().ok_or(ProofError::MissingProof)
	}
}

// Confirms every submission immediately unless the id is set to revert.
struct StubSubmitter {
	counters: Arc<Counters>,
	reverts: HashSet<OrderId>,
	submitted: Arc<Mutex<Vec<(OrderId, String)>>>,
}

fn tx_hash_for(order_id: OrderId) -> TxHash {
	TxHash::left_padding_from(&order_id.to_be_bytes())
}

#[async_trait]
impl DeliveryInterface for StubSubmitter {
	async fn estimate_gas(&self, call: &ExecutionCall) -> Result<u64, DeliveryError> {
		self.counters.estimates.fetch_add(1, Ordering::SeqCst);
		if self.reverts.contains(&call.order_id) {
			return Err(DeliveryError::GasEstimation {
				reason: "Order not triggerable".into(),
			});
		}
		Ok(150_000)
	}

	async fn submit(&self, call: &ExecutionCall, _gas_limit: u64) -> Result<TxHash, DeliveryError> {
		self.counters.submits.fetch_add(1, Ordering::SeqCst);
		self.submitted
			.lock()
			.unwrap()
			.push((call.order_id, call.proof.as_hex().to_string()));
		Ok(tx_hash_for(call.order_id))
	}

	async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, DeliveryError> {
		self.counters.receipts.fetch_add(1, Ordering::SeqCst);
		Ok(Some(Receipt {
			tx_hash: *tx_hash,
			block_number: Some(1),
			success: true,
		}))
	}
}

struct Harness {
	counters: Arc<Counters>,
	slots: HashMap<OrderId, Slot>,
	proof: Option<String>,
	reverts: HashSet<OrderId>,
	subjects: Arc<Mutex<Vec<Option<ProofSubject>>>>,
	submitted: Arc<Mutex<Vec<(OrderId, String)>>>,
	settings: EngineSettings,
}

impl Harness {
	fn new() -> Self {
		Self {
			counters: Arc::default(),
			slots: HashMap::new(),
			proof: Some("0xabcd".into()),
			reverts: HashSet::new(),
			subjects: Arc::default(),
			submitted: Arc::default(),
			settings: EngineSettings::default(),
		}
	}

	fn slot(mut self, order_id: OrderId, slot: Slot) -> Self {
		self.slots.insert(order_id, slot);
		self
	}

	fn engine(&self) -> RelayerEngine {
		let account = AccountService::new(Box::new(LocalWallet::new(KEY).unwrap()));
		let reader = OrderReaderService::new(Box::new(StubReader {
			counters: self.counters.clone(),
			slots: self.slots.clone(),
		}));
		let proof = ProofService::new(
			Box::new(StubOracle {
				counters: self.counters.clone(),
				proof: self.proof.clone(),
				subjects: self.subjects.clone(),
			}),
			RetryPolicy::new(3, Duration::from_secs(1)),
		);
		let delivery = DeliveryService::new(
			Box::new(StubSubmitter {
				counters: self.counters.clone(),
				reverts: self.reverts.clone(),
				submitted: self.submitted.clone(),
			}),
			GasStrategy::default(),
			Duration::from_secs(60),
			Duration::from_millis(100),
		);

		RelayerEngine::new(account, reader, proof, delivery, self.settings)
	}
}

fn range(start: OrderId, end: OrderId) -> OrderRange {
	OrderRange::new(start, end).unwrap()
}

#[tokio::test]
async fn test_one_result_per_id_in_order() {
	let harness = Harness::new().slot(4, Slot::Deleted);
	let batch = harness.engine().execute_range(range(3, 7)).await.unwrap();

	assert_eq!(batch.total, 5);
	assert_eq!(batch.results.len(), 5);
	for (k, result) in batch.results.iter().enumerate() {
		assert_eq!(result.order_id, 3 + k as u64);
	}
	assert_eq!(batch.count_status("executed"), 4);
	assert_eq!(batch.count_status("skipped"), 1);
}

#[tokio::test]
async fn test_single_order_range() {
	let harness = Harness::new();
	let batch = harness.engine().execute_range(range(9, 9)).await.unwrap();

	assert_eq!(batch.total, 1);
	assert_eq!(batch.results[0].order_id, 9);
	assert_eq!(batch.results[0].status(), "executed");
}

#[tokio::test]
async fn test_deleted_order_never_fetches_or_submits() {
	let harness = Harness::new().slot(1, Slot::Deleted);
	let batch = harness.engine().execute_range(range(1, 1)).await.unwrap();

	let result = &batch.results[0];
	assert_eq!(result.status(), "skipped");
	assert_eq!(result.outcome.reason(), Some("deleted"));
	assert_eq!(Counters::get(&harness.counters.proofs), 0);
	assert_eq!(Counters::get(&harness.counters.estimates), 0);
	assert_eq!(Counters::get(&harness.counters.submits), 0);
}

#[tokio::test(start_paused = true)]
async fn test_proof_exhaustion_fails_without_submission() {
	let mut harness = Harness::new();
	harness.proof = None;
	let batch = harness.engine().execute_range(range(1, 2)).await.unwrap();

	for result in &batch.results {
		assert_eq!(result.status(), "failed");
		assert!(result.outcome.reason().unwrap().contains("no proof returned"));
	}
	// Three attempts for each of the two orders
	assert_eq!(Counters::get(&harness.counters.proofs), 6);
	assert_eq!(Counters::get(&harness.counters.submits), 0);
}

#[tokio::test]
async fn test_unprefixed_proof_is_normalized_before_submission() {
	let mut harness = Harness::new();
	harness.proof = Some("ABCDEF01".into());
	harness.engine().execute_range(range(1, 3)).await.unwrap();

	let submitted = harness.submitted.lock().unwrap().clone();
	assert_eq!(submitted.len(), 3);
	assert!(submitted.iter().all(|(_, proof)| proof == "0xabcdef01"));
}

#[tokio::test]
async fn test_estimation_revert_is_error_without_wait() {
	let mut harness = Harness::new();
	harness.reverts.insert(5);
	let batch = harness.engine().execute_range(range(5, 5)).await.unwrap();

	let result = &batch.results[0];
	assert_eq!(result.status(), "error");
	assert_eq!(result.outcome.reason(), Some("Order not triggerable"));
	assert_eq!(Counters::get(&harness.counters.submits), 0);
	assert_eq!(Counters::get(&harness.counters.receipts), 0);
}

#[tokio::test]
async fn test_failure_is_isolated_from_next_order() {
	let mut harness = Harness::new();
	harness.reverts.insert(2);
	let batch = harness.engine().execute_range(range(2, 3)).await.unwrap();

	assert_eq!(batch.results[0].status(), "error");

	let next = &batch.results[1];
	assert_eq!(next.status(), "executed");
	let expected = tx_hash_for(3).to_string();
	assert_eq!(next.outcome.tx_hash(), Some(expected.as_str()));
	assert!(expected.starts_with("0x"));
}

#[tokio::test]
async fn test_read_failure_and_panic_are_recorded() {
	let harness = Harness::new()
		.slot(1, Slot::Unreadable)
		.slot(2, Slot::Panics);
	let batch = harness.engine().execute_range(range(1, 3)).await.unwrap();

	assert_eq!(batch.results[0].status(), "error");
	assert!(batch.results[0]
		.outcome
		.reason()
		.unwrap()
		.contains("connection reset"));
	// The panic message survives into the reason
	assert_eq!(batch.results[1].status(), "error");
	assert!(batch.results[1]
		.outcome
		.reason()
		.unwrap()
		.contains("corrupt slot 2"));
	assert_eq!(batch.results[2].status(), "executed");
}

#[tokio::test(start_paused = true)]
async fn test_shared_proof_failure_aborts_batch() {
	let mut harness = Harness::new();
	harness.proof = None;
	harness.settings.proof_mode = ProofMode::SharedForBatch;

	let err = harness.engine().execute_range(range(1, 10)).await.unwrap_err();

	assert!(matches!(err, RelayerError::UpstreamBatch(_)));
	assert_eq!(Counters::get(&harness.counters.reads), 0);
	assert_eq!(Counters::get(&harness.counters.submits), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shared_proof_fetch_counts_against_batch_deadline() {
	let mut harness = Harness::new();
	harness.proof = None;
	harness.settings.proof_mode = ProofMode::SharedForBatch;
	// Three attempts one second apart cannot finish inside 1.5s.
	harness.settings.batch_timeout = Some(Duration::from_millis(1500));
	let started = tokio::time::Instant::now();

	let err = harness.engine().execute_range(range(1, 3)).await.unwrap_err();

	assert!(matches!(
		&err,
		RelayerError::UpstreamBatch(reason) if reason.contains(BATCH_DEADLINE_REASON)
	));
	assert_eq!(started.elapsed(), Duration::from_millis(1500));
	assert_eq!(Counters::get(&harness.counters.proofs), 2);
	assert_eq!(Counters::get(&harness.counters.reads), 0);
}

#[tokio::test]
async fn test_shared_proof_fetched_once() {
	let mut harness = Harness::new();
	harness.settings.proof_mode = ProofMode::SharedForBatch;
	let batch = harness.engine().execute_range(range(1, 4)).await.unwrap();

	assert_eq!(batch.count_status("executed"), 4);
	assert_eq!(Counters::get(&harness.counters.proofs), 1);
	assert_eq!(*harness.subjects.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn test_proof_subject_follows_key() {
	let mut harness = Harness::new();
	harness.settings.proof_key = ProofKey::AssetIndex;
	harness.engine().execute_range(range(1, 2)).await.unwrap();

	assert_eq!(
		*harness.subjects.lock().unwrap(),
		vec![
			Some(ProofSubject::AssetIndex(10)),
			Some(ProofSubject::AssetIndex(20))
		]
	);
}

#[tokio::test(start_paused = true)]
async fn test_order_timeout_is_error() {
	let mut harness = Harness::new().slot(1, Slot::Hangs);
	harness.settings.order_timeout = Some(Duration::from_secs(5));
	let batch = harness.engine().execute_range(range(1, 2)).await.unwrap();

	assert_eq!(batch.results[0].status(), "error");
	assert_eq!(
		batch.results[0].outcome.reason(),
		Some("order processing timed out after 5s")
	);
	assert_eq!(batch.results[1].status(), "executed");
}

#[tokio::test(start_paused = true)]
async fn test_batch_deadline_marks_remaining_orders() {
	let mut harness = Harness::new().slot(2, Slot::Hangs);
	harness.settings.batch_timeout = Some(Duration::from_secs(30));
	let batch = harness.engine().execute_range(range(1, 4)).await.unwrap();

	assert_eq!(batch.total, 4);
	assert_eq!(batch.results[0].status(), "executed");
	for result in &batch.results[1..] {
		assert_eq!(result.status(), "error");
		assert_eq!(result.outcome.reason(), Some(BATCH_DEADLINE_REASON));
	}
	// Orders 3 and 4 were never read
	assert_eq!(Counters::get(&harness.counters.reads), 2);
}

#[tokio::test]
async fn test_list_asset_indexes_skips_absent_and_unreadable() {
	let harness = Harness::new()
		.slot(2, Slot::Deleted)
		.slot(3, Slot::Unreadable);
	let listing = harness.engine().list_asset_indexes(range(1, 4)).await;

	assert_eq!(listing.count, 2);
	let ids: Vec<_> = listing
		.results
		.iter()
		.map(|e| (e.order_id, e.asset_index))
		.collect();
	assert_eq!(ids, vec![(1, 10), (4, 40)]);
	assert_eq!(Counters::get(&harness.counters.proofs), 0);
}

#[tokio::test]
async fn test_concurrent_ranges_do_not_interleave() {
	let harness = Harness::new();
	let engine = Arc::new(harness.engine());

	let first = tokio::spawn({
		let engine = engine.clone();
		async move { engine.execute_range(range(1, 3)).await }
	});
	let second = tokio::spawn({
		let engine = engine.clone();
		async move { engine.execute_range(range(4, 6)).await }
	});

	let first = first.await.unwrap().unwrap();
	let second = second.await.unwrap().unwrap();
	assert_eq!(first.count_status("executed"), 3);
	assert_eq!(second.count_status("executed"), 3);

	let ids: Vec<OrderId> = harness
		.submitted
		.lock()
		.unwrap()
		.iter()
		.map(|(id, _)| *id)
		.collect();
	// Either range may win the lock, but they never interleave
	assert!(
		ids == vec![1, 2, 3, 4, 5, 6] || ids == vec![4, 5, 6, 1, 2, 3],
		"interleaved submissions: {:?}",
		ids
	);
}

#[test]
fn test_builder_with_registered_factories() {
	use relayer_account::implementations::local::create_account;
	use relayer_delivery::implementations::evm::alloy::create_delivery;
	use relayer_orders::implementations::evm::alloy::create_order_reader;
	use relayer_proof::implementations::http::create_proof_client;

	let vars: HashMap<&str, &str> = [
		("RPC_READ", "http://localhost:8545"),
		("RPC_WRITE", "http://localhost:8545"),
		("PRIVATE_KEY", KEY),
		("CONTRACT_ADDRESS", "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
		("MULTI_PROOF_API", "http://localhost:9000/proof"),
		("PROOF_MODE", "shared_for_batch"),
	]
	.into_iter()
	.collect();
	let config =
		relayer_config::ConfigLoader::from_env_vars(|name| vars.get(name).map(|v| v.to_string()))
			.unwrap();

	// Nothing registered
	let missing = RelayerBuilder::new(config.clone()).build();
	assert!(matches!(missing, Err(RelayerError::Config(_))));

	let engine = RelayerBuilder::new(config)
		.with_account_factory("local", create_account)
		.with_reader_factory("evm_alloy", create_order_reader)
		.with_proof_factory("http", create_proof_client)
		.with_delivery_factory("evm_alloy", create_delivery)
		.build()
		.unwrap();

	assert_eq!(
		engine.relayer_address(),
		"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
			.parse::<Address>()
			.unwrap()
	);
	assert_eq!(engine.settings().proof_mode, ProofMode::SharedForBatch);
	assert_eq!(engine.gas_strategy(), GasStrategy::default());
}
