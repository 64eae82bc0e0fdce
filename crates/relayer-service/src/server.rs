//! HTTP surface of the relayer.
//!
//! `GET /execute-range` runs a batch, `GET /get-asset-indexes` lists live
//! orders and `GET /health` reports the signer and active strategies. Range
//! validation failures are the only non-200 answers besides a failed shared
//! proof fetch.

use axum::{
	extract::{rejection::QueryRejection, Query, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::get,
	Router,
};
use relayer_core::{RelayerEngine, RelayerError};
use relayer_types::{OrderRange, RangeError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<RelayerEngine>,
}

/// Raw `start`/`end` query values; parsed strictly by [`OrderRange::parse`].
#[derive(Debug, Deserialize)]
pub struct RangeParams {
	/// First order id, inclusive.
	start: Option<String>,
	/// Last order id, inclusive.
	end: Option<String>,
}

impl RangeParams {
	fn range(&self) -> Result<OrderRange, RangeError> {
		OrderRange::parse(self.start.as_deref(), self.end.as_deref())
	}
}

/// Resolves the requested range. A query string axum cannot decode at all,
/// such as a repeated `start`, gets the same answer as a bad value.
fn requested_range(
	params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<OrderRange, RangeError> {
	match params {
		Ok(Query(params)) => params.range(),
		Err(rejection) => {
			debug!(error = %rejection, "Rejected range query");
			Err(RangeError::Invalid)
		}
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthBody {
	status: &'static str,
	relayer: String,
	proof_mode: String,
	gas_strategy: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
	(
		status,
		Json(ErrorBody {
			error: error.to_string(),
		}),
	)
		.into_response()
}

pub fn router(engine: Arc<RelayerEngine>) -> Router {
	Router::new()
		.route("/execute-range", get(execute_range))
		.route("/get-asset-indexes", get(get_asset_indexes))
		.route("/health", get(health))
		.with_state(AppState { engine })
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Serves the API until `shutdown` resolves.
pub async fn start_server<S>(
	engine: Arc<RelayerEngine>,
	host: &str,
	port: u16,
	shutdown: S,
) -> anyhow::Result<()>
where
	S: Future<Output = ()> + Send + 'static,
{
	let listener = tokio::net::TcpListener::bind((host, port)).await?;
	info!("API ready at http://{}:{}", host, port);

	axum::serve(listener, router(engine))
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}

#[instrument(skip(state))]
async fn execute_range(
	State(state): State<AppState>,
	params: Result<Query<RangeParams>, QueryRejection>,
) -> Response {
	// Range errors never reach the engine
	let range = match requested_range(params) {
		Ok(range) => range,
		Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
	};

	match state.engine.execute_range(range).await {
		Ok(batch) => Json(batch).into_response(),
		// Shared proof fetch failed; no per-order results exist
		Err(e @ RelayerError::UpstreamBatch(_)) => {
			warn!("Batch aborted: {}", e);
			error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
		}
		Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
	}
}

#[instrument(skip(state))]
async fn get_asset_indexes(
	State(state): State<AppState>,
	params: Result<Query<RangeParams>, QueryRejection>,
) -> Response {
	match requested_range(params) {
		Ok(range) => Json(state.engine.list_asset_indexes(range).await).into_response(),
		Err(e) => error_response(StatusCode::BAD_REQUEST, e),
	}
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
	Json(HealthBody {
		status: "ok",
		relayer: state.engine.relayer_address().to_string(),
		proof_mode: state.engine.settings().proof_mode.to_string(),
		gas_strategy: state.engine.gas_strategy().to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use relayer_account::implementations::local::LocalWallet;
	use relayer_account::AccountService;
	use relayer_core::EngineSettings;
	use relayer_delivery::{
		DeliveryError, DeliveryInterface, DeliveryService, ExecutionCall, GasStrategy, Receipt,
		TxHash,
	};
	use relayer_orders::{OrderReaderInterface, OrderReaderService, ReaderError};
	use relayer_proof::{ProofError, ProofInterface, ProofService};
	use relayer_types::{
		Address, OrderId, OrderLookup, PendingOrder, ProofMode, ProofSubject, RetryPolicy, U256,
	};
	use serde_json::Value;
	use std::time::Duration;
	use tower::ServiceExt;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	// Even ids are live, odd ids are deleted.
	struct EvenOrders;

	#[async_trait]
	impl OrderReaderInterface for EvenOrders {
		async fn read_order(&self, order_id: OrderId) -> Result<OrderLookup, ReaderError> {
			if order_id % 2 == 1 {
				return Ok(OrderLookup::Absent);
			}
			Ok(OrderLookup::Present(PendingOrder {
				order_id,
				owner: Address::repeat_byte(7),
				asset_index: order_id + 100,
				usd_size: U256::from(10u64),
				leverage: U256::from(2u64),
				is_long: false,
				stop_loss_price: U256::ZERO,
				take_profit_price: U256::ZERO,
				timestamp: 0,
			}))
		}
	}

	struct Oracle(Option<&'static str>);

	#[async_trait]
	impl ProofInterface for Oracle {
		async fn fetch_raw(&self, _subject: Option<ProofSubject>) -> Result<String, ProofError> {
			self.0.map(str::to_string).ok_or(ProofError::MissingProof)
		}
	}

	struct InstantChain;

	#[async_trait]
	impl DeliveryInterface for InstantChain {
		async fn estimate_gas(&self, _call: &ExecutionCall) -> Result<u64, DeliveryError> {
			Ok(50_000)
		}

		async fn submit(&self, _call: &ExecutionCall, _gas: u64) -> Result<TxHash, DeliveryError> {
			Ok(TxHash::repeat_byte(0x01))
		}

		async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, DeliveryError> {
			Ok(Some(Receipt {
				tx_hash: *tx_hash,
				block_number: Some(1),
				success: true,
			}))
		}
	}

	fn app(proof: Option<&'static str>, proof_mode: ProofMode) -> Router {
		let engine = RelayerEngine::new(
			AccountService::new(Box::new(LocalWallet::new(KEY).unwrap())),
			OrderReaderService::new(Box::new(EvenOrders)),
			ProofService::new(Box::new(Oracle(proof)), RetryPolicy::new(1, Duration::ZERO)),
			DeliveryService::new(
				Box::new(InstantChain),
				GasStrategy::Fixed { limit: 800_000 },
				Duration::from_secs(5),
				Duration::from_millis(10),
			),
			EngineSettings {
				proof_mode,
				..EngineSettings::default()
			},
		);
		router(Arc::new(engine))
	}

	async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
		let response = app
			.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&body).unwrap())
	}

	#[tokio::test]
	async fn test_execute_range_response_shape() {
		let (status, body) = get(
			app(Some("beef"), ProofMode::PerOrder),
			"/execute-range?start=1&end=4",
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["total"], 4);
		let results = body["results"].as_array().unwrap();
		assert_eq!(results.len(), 4);
		assert_eq!(
			results[0],
			serde_json::json!({ "orderId": 1, "status": "skipped", "reason": "deleted" })
		);
		assert_eq!(results[1]["orderId"], 2);
		assert_eq!(results[1]["status"], "executed");
		assert_eq!(
			results[1]["txHash"],
			format!("0x{}", "01".repeat(32)).as_str()
		);
		// Executed entries carry no reason
		assert!(results[1].get("reason").is_none());
	}

	#[tokio::test]
	async fn test_all_failures_still_return_200() {
		let (status, body) = get(app(None, ProofMode::PerOrder), "/execute-range?start=2&end=2").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["results"][0]["status"], "failed");
	}

	#[tokio::test]
	async fn test_invalid_range_is_400() {
		for uri in [
			"/execute-range?start=5&end=1",
			"/execute-range?start=a&end=3",
			"/execute-range?start=1",
			"/execute-range",
			"/execute-range?start=-1&end=3",
			"/execute-range?start=1&start=2&end=3",
			"/execute-range?start=%FF&end=3",
			"/get-asset-indexes?start=9&end=2",
			"/get-asset-indexes?start=1&end=2&end=3",
		] {
			let (status, body) = get(app(Some("00"), ProofMode::PerOrder), uri).await;
			assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
			assert_eq!(body, serde_json::json!({ "error": "Invalid 'start' and 'end' params" }));
		}
	}

	#[tokio::test]
	async fn test_shared_proof_failure_is_500() {
		let (status, body) = get(
			app(None, ProofMode::SharedForBatch),
			"/execute-range?start=1&end=3",
		)
		.await;

		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert!(body["error"].as_str().unwrap().contains("no proof"));
		// Aborted batch: no partial results
		assert!(body.get("results").is_none());
	}

	#[tokio::test]
	async fn test_asset_indexes_lists_live_orders() {
		let (status, body) = get(
			app(Some("00"), ProofMode::PerOrder),
			"/get-asset-indexes?start=1&end=4",
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(
			body,
			serde_json::json!({
				"count": 2,
				"results": [
					{ "orderId": 2, "assetIndex": 102 },
					{ "orderId": 4, "assetIndex": 104 }
				]
			})
		);
	}

	#[tokio::test]
	async fn test_health() {
		let (status, body) = get(app(Some("00"), ProofMode::SharedForBatch), "/health").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "ok");
		assert_eq!(body["relayer"], "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
		assert_eq!(body["proofMode"], "shared_for_batch");
		assert_eq!(body["gasStrategy"], "fixed 800000");
	}
}
