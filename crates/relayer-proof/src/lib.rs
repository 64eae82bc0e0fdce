//! Proof retrieval from the external proof oracle.
//!
//! The oracle is slow and unreliable. Any failed request, missing proof field
//! or malformed proof counts as a miss; [`ProofService`] retries misses with a
//! fixed delay and reports [`ProofError::Unavailable`] once the attempt budget
//! is spent. Proofs leave this crate normalized to `0x`-prefixed hex.

use async_trait::async_trait;
use relayer_types::{Proof, ProofSubject, RetryPolicy};
use thiserror::Error;
use tracing::{debug, instrument};

pub mod implementations {
	pub mod http;
}

#[derive(Debug, Error)]
pub enum ProofError {
	/// Every attempt missed; `reason` is the last miss.
	#[error("no proof after {attempts} attempts: {reason}")]
	Unavailable { attempts: u32, reason: String },
	#[error("Request failed: {0}")]
	Request(String),
	/// The oracle answered without a proof.
	#[error("no proof returned")]
	MissingProof,
	#[error("Invalid proof: {0}")]
	InvalidProof(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

#[async_trait]
pub trait ProofInterface: Send + Sync {
	/// Issues one oracle request and returns the proof exactly as received.
	///
	/// `None` requests the oracle's global proof.
	async fn fetch_raw(&self, subject: Option<ProofSubject>) -> Result<String, ProofError>;
}

/// Proof client with the retry policy and normalization applied.
pub struct ProofService {
	/// The underlying oracle client.
	client: Box<dyn ProofInterface>,
	/// Attempt budget and fixed delay for oracle polling.
	retry: RetryPolicy,
}

impl ProofService {
	pub fn new(client: Box<dyn ProofInterface>, retry: RetryPolicy) -> Self {
		Self { client, retry }
	}

	/// Returns the oracle polling policy.
	pub fn retry_policy(&self) -> RetryPolicy {
		self.retry
	}

	/// Fetches a fresh proof, retrying every miss until the budget is spent.
	#[instrument(skip(self))]
	pub async fn fetch_proof(&self, subject: Option<ProofSubject>) -> Result<Proof, ProofError> {
		let proof = self
			.retry
			.run("proof fetch", |attempt| async move {
				debug!(attempt, "Requesting proof");
				let raw = self.client.fetch_raw(subject).await?;
				Proof::normalize(&raw).map_err(|e| ProofError::InvalidProof(e.to_string()))
			})
			.await
			.map_err(|exhausted| ProofError::Unavailable {
				attempts: exhausted.attempts,
				reason: exhausted.last_error.to_string(),
			})?;

		debug!(bytes = proof.to_bytes().len(), "Proof obtained");
		Ok(proof)
	}
}
