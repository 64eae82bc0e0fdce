//! Proof values returned by the proof oracle.

use crate::order::PendingOrder;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while normalizing a raw proof string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofFormatError {
	#[error("proof is empty")]
	Empty,
	#[error("proof is not valid hex: {0}")]
	InvalidHex(String),
}

/// An oracle proof, always held as `0x`-prefixed lowercase hex.
///
/// The oracle may omit the prefix; [`Proof::normalize`] is the only way to
/// build a value, so anything handed to the submitter is already canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Proof(String);

impl Proof {
	/// Parses a hex proof with or without the `0x` prefix.
	pub fn normalize(raw: &str) -> Result<Self, ProofFormatError> {
		let trimmed = raw.trim();
		let digits = trimmed
			.strip_prefix("0x")
			.or_else(|| trimmed.strip_prefix("0X"))
			.unwrap_or(trimmed);

		if digits.is_empty() {
			return Err(ProofFormatError::Empty);
		}

		// Round-trip through bytes to lowercase and validate in one step
		let bytes = hex::decode(digits).map_err(|e| ProofFormatError::InvalidHex(e.to_string()))?;
		Ok(Self(format!("0x{}", hex::encode(bytes))))
	}

	pub fn as_hex(&self) -> &str {
		&self.0
	}

	/// Raw proof bytes for ABI encoding.
	pub fn to_bytes(&self) -> Vec<u8> {
		// Construction guarantees valid hex after the prefix.
		hex::decode(&self.0[2..]).unwrap_or_default()
	}
}

impl fmt::Display for Proof {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl TryFrom<String> for Proof {
	type Error = ProofFormatError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Proof::normalize(&value)
	}
}

impl From<Proof> for String {
	fn from(proof: Proof) -> Self {
		proof.0
	}
}

/// Which value the oracle expects as the proof key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKey {
	#[default]
	OrderId,
	AssetIndex,
}

impl ProofKey {
	pub fn subject_for(&self, order: &PendingOrder) -> ProofSubject {
		match self {
			ProofKey::OrderId => ProofSubject::OrderId(order.order_id),
			ProofKey::AssetIndex => ProofSubject::AssetIndex(order.asset_index),
		}
	}
}

/// How often proofs are fetched within one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofMode {
	/// A fresh proof for every present order.
	#[default]
	PerOrder,
	/// One proof fetched before the range loop and reused for every order.
	SharedForBatch,
}

impl fmt::Display for ProofMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProofMode::PerOrder => f.write_str("per_order"),
			ProofMode::SharedForBatch => f.write_str("shared_for_batch"),
		}
	}
}

/// The key a proof is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofSubject {
	OrderId(u64),
	AssetIndex(u64),
}

impl ProofSubject {
	pub fn value(&self) -> u64 {
		match self {
			ProofSubject::OrderId(id) | ProofSubject::AssetIndex(id) => *id,
		}
	}
}

impl fmt::Display for ProofSubject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProofSubject::OrderId(id) => write!(f, "order #{}", id),
			ProofSubject::AssetIndex(index) => write!(f, "asset index {}", index),
		}
	}
}
