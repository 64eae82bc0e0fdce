//! Pending order types read from the order book contract.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Integer key of a pending order in contract storage.
pub type OrderId = u64;

/// A pending order as stored on chain.
///
/// Field order matches the `pendingOrders(uint256)` getter of the order book
/// contract. A zero `owner` marks a deleted or never allocated slot, see
/// [`OrderLookup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
	pub order_id: OrderId,
	pub owner: Address,
	pub asset_index: u64,
	pub usd_size: U256,
	pub leverage: U256,
	pub is_long: bool,
	/// Zero when unset.
	pub stop_loss_price: U256,
	/// Zero when unset.
	pub take_profit_price: U256,
	/// Creation time in seconds since the epoch.
	pub timestamp: u64,
}

impl PendingOrder {
	pub fn is_deleted(&self) -> bool {
		self.owner.is_zero()
	}

	pub fn stop_loss(&self) -> Option<U256> {
		(!self.stop_loss_price.is_zero()).then_some(self.stop_loss_price)
	}

	pub fn take_profit(&self) -> Option<U256> {
		(!self.take_profit_price.is_zero()).then_some(self.take_profit_price)
	}
}

/// Result of reading a single order slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
	/// The slot holds a live order.
	Present(PendingOrder),
	/// The slot decoded to the zero-address owner.
	Absent,
}

impl OrderLookup {
	pub fn is_absent(&self) -> bool {
		matches!(self, OrderLookup::Absent)
	}

	pub fn into_order(self) -> Option<PendingOrder> {
		match self {
			OrderLookup::Present(order) => Some(order),
			OrderLookup::Absent => None,
		}
	}
}

impl From<PendingOrder> for OrderLookup {
	fn from(order: PendingOrder) -> Self {
		if order.is_deleted() {
			OrderLookup::Absent
		} else {
			OrderLookup::Present(order)
		}
	}
}
