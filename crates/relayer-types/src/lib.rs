//! Shared types for the order execution relayer.
//!
//! This crate holds the domain model passed between the reader, proof,
//! delivery and orchestration crates, together with the retry policy and
//! config schema helpers they share.

pub mod execution;
pub mod gas;
pub mod order;
pub mod proof;
pub mod range;
pub mod retry;
pub mod validation;

pub use execution::*;
pub use gas::*;
pub use order::*;
pub use proof::*;
pub use range::*;
pub use retry::*;
pub use validation::*;

pub use alloy_primitives::{Address, U256};
