//! The repeated check-and-act loop.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::poller::PollOutcome;
use crate::target::SectionSnapshot;

/// Why a watch ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchExit {
	Enrolled(SectionSnapshot),
	Stopped,
}

/// Runs `cycle` until it enrolls, `cancel` fires, or it fails with an error
/// that stops the watch.
///
/// Cancellation is observed between cycles only; a running cycle always
/// completes. Every other outcome, including ordinary errors, waits `interval`
/// before the next cycle.
pub async fn watch<F, Fut>(interval: Duration, cancel: &CancellationToken, mut cycle: F) -> Result<WatchExit>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<PollOutcome>>,
{
	let mut round: u64 = 0;

	loop {
		if cancel.is_cancelled() {
			info!(target = "squirrel.poll", cycles = round, "stop requested, shutting down");
			return Ok(WatchExit::Stopped);
		}

		round += 1;
		match cycle().await {
			Ok(PollOutcome::Enrolled(section)) => return Ok(WatchExit::Enrolled(section)),
			Ok(PollOutcome::NoAction { openings }) => {
				debug!(target = "squirrel.poll", cycle = round, openings = openings.len(), "no seat claimed this cycle");
			}
			Ok(PollOutcome::EnrollmentFailed { attempted }) => {
				warn!(target = "squirrel.poll", cycle = round, attempted = attempted.len(), "all enrollment attempts failed this cycle");
			}
			Err(err) if err.kind().stops_watch() => {
				error!(target = "squirrel.poll", cycle = round, kind = %err.kind(), error = %err, "stopping watch");
				return Err(err);
			}
			Err(err) => {
				error!(target = "squirrel.poll", cycle = round, kind = %err.kind(), error = %err, "error during check");
			}
		}

		tokio::select! {
			_ = cancel.cancelled() => {
				info!(target = "squirrel.poll", cycles = round, "stop requested, shutting down");
				return Ok(WatchExit::Stopped);
			}
			_ = tokio::time::sleep(interval) => {}
		}
	}
}
