//! Per-order execution results and the batch responses built from them.

use crate::order::OrderId;
use serde::{Deserialize, Serialize};

/// Reason recorded for orders whose owner is the zero address.
pub const DELETED_REASON: &str = "deleted";

/// Terminal state of one order within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionOutcome {
	Executed {
		#[serde(rename = "txHash")]
		tx_hash: String,
	},
	Skipped {
		reason: String,
	},
	Failed {
		reason: String,
	},
	Error {
		reason: String,
	},
}

impl ExecutionOutcome {
	pub fn status(&self) -> &'static str {
		match self {
			ExecutionOutcome::Executed { .. } => "executed",
			ExecutionOutcome::Skipped { .. } => "skipped",
			ExecutionOutcome::Failed { .. } => "failed",
			ExecutionOutcome::Error { .. } => "error",
		}
	}

	pub fn reason(&self) -> Option<&str> {
		match self {
			ExecutionOutcome::Executed { .. } => None,
			ExecutionOutcome::Skipped { reason }
			| ExecutionOutcome::Failed { reason }
			| ExecutionOutcome::Error { reason } => Some(reason),
		}
	}

	pub fn tx_hash(&self) -> Option<&str> {
		match self {
			ExecutionOutcome::Executed { tx_hash } => Some(tx_hash),
			_ => None,
		}
	}
}

/// One entry of the batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
	pub order_id: OrderId,
	#[serde(flatten)]
	pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
	pub fn executed(order_id: OrderId, tx_hash: impl Into<String>) -> Self {
		Self {
			order_id,
			outcome: ExecutionOutcome::Executed {
				tx_hash: tx_hash.into(),
			},
		}
	}

	pub fn skipped(order_id: OrderId, reason: impl Into<String>) -> Self {
		Self {
			order_id,
			outcome: ExecutionOutcome::Skipped {
				reason: reason.into(),
			},
		}
	}

	pub fn deleted(order_id: OrderId) -> Self {
		Self::skipped(order_id, DELETED_REASON)
	}

	pub fn failed(order_id: OrderId, reason: impl Into<String>) -> Self {
		Self {
			order_id,
			outcome: ExecutionOutcome::Failed {
				reason: reason.into(),
			},
		}
	}

	pub fn error(order_id: OrderId, reason: impl Into<String>) -> Self {
		Self {
			order_id,
			outcome: ExecutionOutcome::Error {
				reason: reason.into(),
			},
		}
	}

	pub fn status(&self) -> &'static str {
		self.outcome.status()
	}
}

/// Response body of `/execute-range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
	pub total: u64,
	pub results: Vec<ExecutionResult>,
}

impl BatchResult {
	pub fn new(results: Vec<ExecutionResult>) -> Self {
		Self {
			total: results.len() as u64,
			results,
		}
	}

	pub fn count_status(&self, status: &str) -> usize {
		self.results.iter().filter(|r| r.status() == status).count()
	}
}

/// One live order and the asset it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexEntry {
	pub order_id: OrderId,
	pub asset_index: u64,
}

/// Response body of `/get-asset-indexes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIndexListing {
	pub count: u64,
	pub results: Vec<AssetIndexEntry>,
}

impl AssetIndexListing {
	pub fn new(results: Vec<AssetIndexEntry>) -> Self {
		Self {
			count: results.len() as u64,
			results,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_result_wire_format() {
		let batch = BatchResult::new(vec![
			ExecutionResult::executed(1, "0xabc"),
			ExecutionResult::deleted(2),
			ExecutionResult::failed(3, "no proof returned"),
			ExecutionResult::error(4, "execution reverted"),
		]);

		let value = serde_json::to_value(&batch).unwrap();
		assert_eq!(
			value,
			json!({
				"total": 4,
				"results": [
					{ "orderId": 1, "status": "executed", "txHash": "0xabc" },
					{ "orderId": 2, "status": "skipped", "reason": "deleted" },
					{ "orderId": 3, "status": "failed", "reason": "no proof returned" },
					{ "orderId": 4, "status": "error", "reason": "execution reverted" },
				]
			})
		);

		let parsed: BatchResult = serde_json::from_value(value).unwrap();
		assert_eq!(parsed, batch);
	}

	#[test]
	fn test_outcome_accessors() {
		let executed = ExecutionResult::executed(9, "0x01");
		assert_eq!(executed.outcome.tx_hash(), Some("0x01"));
		assert_eq!(executed.outcome.reason(), None);

		let skipped = ExecutionResult::deleted(10);
		assert_eq!(skipped.outcome.reason(), Some(DELETED_REASON));
		assert_eq!(skipped.status(), "skipped");
	}

	#[test]
	fn test_asset_listing_wire_format() {
		let listing = AssetIndexListing::new(vec![AssetIndexEntry {
			order_id: 5,
			asset_index: 2,
		}]);
		assert_eq!(
			serde_json::to_value(&listing).unwrap(),
			json!({ "count": 1, "results": [{ "orderId": 5, "assetIndex": 2 }] })
		);
	}
}
