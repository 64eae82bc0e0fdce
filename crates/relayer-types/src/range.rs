//! Validated order id ranges.

use crate::order::OrderId;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Rejection of a malformed range request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
	#[error("Invalid 'start' and 'end' params")]
	Invalid,
}

/// A closed range `[start, end]` of order ids with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRange {
	start: OrderId,
	end: OrderId,
}

impl OrderRange {
	pub fn new(start: OrderId, end: OrderId) -> Result<Self, RangeError> {
		if start > end {
			return Err(RangeError::Invalid);
		}
		Ok(Self { start, end })
	}

	/// Parses the raw `start`/`end` query values.
	///
	/// Both must be present non-negative integers.
	pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, RangeError> {
		let parse = |value: Option<&str>| -> Result<OrderId, RangeError> {
			value
				.map(str::trim)
				.ok_or(RangeError::Invalid)?
				.parse::<OrderId>()
				.map_err(|_| RangeError::Invalid)
		};

		Self::new(parse(start)?, parse(end)?)
	}

	pub fn start(&self) -> OrderId {
		self.start
	}

	pub fn end(&self) -> OrderId {
		self.end
	}

	/// Number of order ids in the range, `end - start + 1`.
	#[allow(clippy::len_without_is_empty)]
	pub fn len(&self) -> u64 {
		(self.end - self.start).saturating_add(1)
	}

	pub fn ids(&self) -> RangeInclusive<OrderId> {
		self.start..=self.end
	}
}
