//! Read-only access to the on-chain order book.
//!
//! A read either yields a live [`PendingOrder`], the [`OrderLookup::Absent`]
//! sentinel for a zero-owner slot, or a [`ReaderError`] that only affects the
//! order being read.

use async_trait::async_trait;
use relayer_types::{OrderId, OrderLookup, RetryPolicy};
use thiserror::Error;
use tracing::instrument;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[derive(Debug, Error)]
pub enum ReaderError {
	/// The RPC call failed or the node returned an error.
	#[error("Network error: {0}")]
	Network(String),
	/// The returned slot could not be mapped onto a [`PendingOrder`].
	#[error("Decode error: {0}")]
	Decode(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

#[async_trait]
pub trait OrderReaderInterface: Send + Sync {
	/// Reads one order slot. Ids past the allocated space decode to
	/// [`OrderLookup::Absent`] rather than failing.
	async fn read_order(&self, order_id: OrderId) -> Result<OrderLookup, ReaderError>;
}

/// Order reader with an optional bounded retry around every read.
pub struct OrderReaderService {
	/// The underlying reader implementation.
	reader: Box<dyn OrderReaderInterface>,
	/// Attempts per read; one by default.
	retry: RetryPolicy,
}

impl OrderReaderService {
	/// Wraps `reader` without retries.
	pub fn new(reader: Box<dyn OrderReaderInterface>) -> Self {
		Self::with_retry(reader, RetryPolicy::once())
	}

	pub fn with_retry(reader: Box<dyn OrderReaderInterface>, retry: RetryPolicy) -> Self {
		Self { reader, retry }
	}

	/// Reads one order, returning the last error once retries run out.
	#[instrument(skip(self))]
	pub async fn read_order(&self, order_id: OrderId) -> Result<OrderLookup, ReaderError> {
		self.retry
			.run("order read", |_| self.reader.read_order(order_id))
			.await
			.map_err(|exhausted| exhausted.last_error)
	}
}
