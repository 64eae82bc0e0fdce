//! Bounded retry with a fixed delay between attempts.
//!
//! Used by the proof client for oracle polling and optionally by the order
//! reader. Delays are constant: no exponential growth and no jitter.

use backoff::backoff::{Backoff, Constant};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt budget and inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total attempts including the first one. Zero is treated as one.
	pub max_attempts: u32,
	/// Pause between two consecutive attempts.
	pub delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			delay: Duration::from_secs(1),
		}
	}
}

/// The last error seen once the attempt budget is spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
	pub attempts: u32,
	pub last_error: E,
}

impl RetryPolicy {
	pub fn new(max_attempts: u32, delay: Duration) -> Self {
		Self {
			max_attempts,
			delay,
		}
	}

	/// A policy that never retries.
	pub fn once() -> Self {
		Self::new(1, Duration::ZERO)
	}

	pub fn attempts(&self) -> u32 {
		self.max_attempts.max(1)
	}

	/// Runs `attempt` until it succeeds or the budget is spent.
	///
	/// The closure receives the 1-based attempt number. Every error is
	/// treated as retriable.
	pub async fn run<T, E, F, Fut>(
		&self,
		operation: &str,
		mut attempt: F,
	) -> Result<T, RetryExhausted<E>>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T, E>>,
		E: Display,
	{
		// Zero attempts still runs once
		let max_attempts = self.attempts();
		let mut backoff = Constant::new(self.delay);
		let mut current = 0;

		loop {
			current += 1;

			match attempt(current).await {
				Ok(value) => {
					if current > 1 {
						debug!("{} succeeded on attempt {}", operation, current);
					}
					return Ok(value);
				}
				Err(e) if current >= max_attempts => {
					warn!(
						"{} failed after {} attempts, giving up: {}",
						operation, current, e
					);
					return Err(RetryExhausted {
						attempts: current,
						last_error: e,
					});
				}
				Err(e) => {
					// Constant never yields None
					let delay = backoff.next_backoff().unwrap_or(self.delay);
					debug!(
						"{} failed, attempt {}/{}, retrying in {:?}: {}",
						operation, current, max_attempts, delay, e
					);
					tokio::time::sleep(delay).await;
				}
			}
		}
	}
}
