//! Bounded retry for transient server faults.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Retry budget for a single remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total attempts, including the first one.
	pub max_attempts: u32,
	/// Fixed pause between attempts.
	pub delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			delay: Duration::from_secs(2),
		}
	}
}

impl RetryPolicy {
	pub fn new(max_attempts: u32, delay: Duration) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			delay,
		}
	}

	/// Runs `op`, retrying only errors whose kind is transient.
	///
	/// Every other error, including an expired session, is returned on first
	/// occurrence. Once the budget is spent the last error is returned.
	pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let max_attempts = self.max_attempts.max(1);
		let mut attempt = 1;

		loop {
			match op().await {
				Ok(value) => return Ok(value),
				Err(err) if err.is_transient() && attempt < max_attempts => {
					warn!(
						target = "squirrel.retry",
						operation,
						attempt,
						delay_secs = self.delay.as_secs_f64(),
						error = %err,
						"attempt {attempt} failed, retrying in {}s...",
						self.delay.as_secs_f64()
					);
					tokio::time::sleep(self.delay).await;
					attempt += 1;
				}
				Err(err) => return Err(err),
			}
		}
	}
}
