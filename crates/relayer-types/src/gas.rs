//! Gas limit sizing for execution transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_GAS_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_GAS_CEILING: u64 = 800_000;

/// How the gas limit of an execution transaction is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum GasStrategy {
	/// Simulated estimate scaled by a safety multiplier.
	Estimated {
		#[serde(default = "default_multiplier")]
		multiplier: f64,
	},
	/// A constant ceiling regardless of the estimate.
	Fixed {
		#[serde(default = "default_ceiling")]
		limit: u64,
	},
}

fn default_multiplier() -> f64 {
	DEFAULT_GAS_MULTIPLIER
}

fn default_ceiling() -> u64 {
	DEFAULT_GAS_CEILING
}

impl Default for GasStrategy {
	fn default() -> Self {
		GasStrategy::Estimated {
			multiplier: DEFAULT_GAS_MULTIPLIER,
		}
	}
}

impl GasStrategy {
	/// Gas limit to submit with, given the pre-flight estimate.
	pub fn gas_limit(&self, estimate: u64) -> u64 {
		match *self {
			GasStrategy::Estimated { multiplier } => {
				// Round up and saturate rather than wrap
				let scaled = (estimate as f64 * multiplier).ceil();
				if scaled >= u64::MAX as f64 {
					u64::MAX
				} else {
					(scaled as u64).max(estimate)
				}
			}
			GasStrategy::Fixed { limit } => limit,
		}
	}
}

impl fmt::Display for GasStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GasStrategy::Estimated { multiplier } => write!(f, "estimated x{}", multiplier),
			GasStrategy::Fixed { limit } => write!(f, "fixed {}", limit),
		}
	}
}
