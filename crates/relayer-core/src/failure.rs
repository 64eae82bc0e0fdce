//! Per-order failure classification.

use relayer_delivery::DeliveryError;
use relayer_orders::ReaderError;
use relayer_proof::ProofError;
use relayer_types::{ExecutionResult, OrderId};
use std::any::Any;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
	/// The oracle never produced a proof within the retry budget.
	ProofUnavailable,
	/// Reading the order from chain state failed.
	ChainRead,
	/// Gas estimation, submission or confirmation failed.
	ChainWrite,
	/// The order ran past its deadline.
	Timeout,
	/// Anything unclassified, including panics.
	Internal,
}

/// Why a single order did not execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFailure {
	pub kind: FailureKind,
	pub reason: String,
}

impl OrderFailure {
	pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
		Self {
			kind,
			reason: reason.into(),
		}
	}

	pub fn timeout(limit: Duration) -> Self {
		Self::new(
			FailureKind::Timeout,
			format!("order processing timed out after {}s", limit.as_secs()),
		)
	}

	pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
		let message = payload
			.downcast_ref::<&str>()
			.map(|s| s.to_string())
			.or_else(|| payload.downcast_ref::<String>().cloned())
			.unwrap_or_else(|| "unknown panic".to_string());

		Self::new(
			FailureKind::Internal,
			format!("order processing panicked: {}", message),
		)
	}

	/// Terminal result for the order: `failed` for a missing proof, `error`
	/// for everything else.
	pub fn into_result(self, order_id: OrderId) -> ExecutionResult {
		match self.kind {
			FailureKind::ProofUnavailable => ExecutionResult::failed(order_id, self.reason),
			_ => ExecutionResult::error(order_id, self.reason),
		}
	}
}

impl fmt::Display for OrderFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}: {}", self.kind, self.reason)
	}
}

impl From<ReaderError> for OrderFailure {
	fn from(err: ReaderError) -> Self {
		Self::new(FailureKind::ChainRead, err.to_string())
	}
}

impl From<ProofError> for OrderFailure {
	fn from(err: ProofError) -> Self {
		Self::new(FailureKind::ProofUnavailable, err.to_string())
	}
}

impl From<DeliveryError> for OrderFailure {
	fn from(err: DeliveryError) -> Self {
		let kind = match err {
			DeliveryError::ConfirmationTimeout { .. } => FailureKind::Timeout,
			_ => FailureKind::ChainWrite,
		};
		Self::new(kind, err.to_string())
	}
}
