//! Batch orchestration for the order execution relayer.
//!
//! [`RelayerEngine`] walks an order range one id at a time: read the order,
//! fetch its proof, submit the execution transaction and record exactly one
//! [`relayer_types::ExecutionResult`] per id. [`RelayerBuilder`] wires the
//! engine from configuration through named factories.

use thiserror::Error;

pub mod builder;
pub mod engine;
pub mod failure;

pub use builder::RelayerBuilder;
pub use engine::{EngineSettings, RelayerEngine, BATCH_DEADLINE_REASON};
pub use failure::{FailureKind, OrderFailure};

#[derive(Debug, Error)]
pub enum RelayerError {
	#[error("Configuration error: {0}")]
	Config(String),
	/// The proof shared by the whole batch could not be fetched.
	#[error("{0}")]
	UpstreamBatch(String),
}

#[cfg(test)]
mod tests;
