use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use squirrel::protocol::TeachMethod;
use squirrel::{CancellationToken, Error, PollOutcome, SectionSnapshot, WatchExit, watch};
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_secs(30);

fn lecture() -> SectionSnapshot {
	SectionSnapshot {
		method: TeachMethod::Lecture,
		section: "0101".into(),
		display_name: "LEC0101".into(),
		available: 1,
		total: 100,
	}
}

#[tokio::test(start_paused = true)]
async fn session_expiry_stops_without_waiting() {
	let cancel = CancellationToken::new();
	let calls = AtomicU32::new(0);
	let started = Instant::now();

	let err = watch(INTERVAL, &cancel, || {
		calls.fetch_add(1, Ordering::SeqCst);
		async { Err(Error::SessionExpired) }
	})
	.await
	.unwrap_err();

	assert!(matches!(err, Error::SessionExpired));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn ordinary_errors_wait_and_loop_until_enrolled() {
	let cancel = CancellationToken::new();
	let calls = AtomicU32::new(0);
	let started = Instant::now();

	let exit = watch(INTERVAL, &cancel, || {
		let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
		async move {
			match n {
				1 => Err(Error::CheckFailed {
					course: "CSC108H1".into(),
					reason: "API Error: try later".into(),
				}),
				2 => Ok(PollOutcome::NoAction { openings: Vec::new() }),
				_ => Ok(PollOutcome::Enrolled(lecture())),
			}
		}
	})
	.await
	.unwrap();

	assert_eq!(exit, WatchExit::Enrolled(lecture()));
	assert_eq!(calls.load(Ordering::SeqCst), 3);
	assert_eq!(started.elapsed(), INTERVAL * 2);
}

#[tokio::test(start_paused = true)]
async fn failed_enrollment_cycles_keep_watching() {
	let cancel = CancellationToken::new();
	let calls = AtomicU32::new(0);

	let exit = watch(INTERVAL, &cancel, || {
		let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
		async move {
			if n == 1 {
				Ok(PollOutcome::EnrollmentFailed { attempted: vec![lecture()] })
			} else {
				Ok(PollOutcome::Enrolled(lecture()))
			}
		}
	})
	.await
	.unwrap();

	assert!(matches!(exit, WatchExit::Enrolled(_)));
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_wait_stops_promptly() {
	let cancel = CancellationToken::new();
	let calls = AtomicU32::new(0);
	let started = Instant::now();

	let stopper = cancel.clone();
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_secs(45)).await;
		stopper.cancel();
	});

	let exit = watch(INTERVAL, &cancel, || {
		calls.fetch_add(1, Ordering::SeqCst);
		async { Ok(PollOutcome::NoAction { openings: Vec::new() }) }
	})
	.await
	.unwrap();

	assert_eq!(exit, WatchExit::Stopped);
	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_eq!(started.elapsed(), Duration::from_secs(45));
}

#[tokio::test(start_paused = true)]
async fn cancellation_inside_cycle_completes_that_cycle() {
	let cancel = CancellationToken::new();
	let calls = AtomicU32::new(0);

	let exit = watch(INTERVAL, &cancel, || {
		calls.fetch_add(1, Ordering::SeqCst);
		cancel.cancel();
		async { Ok(PollOutcome::NoAction { openings: Vec::new() }) }
	})
	.await
	.unwrap();

	assert_eq!(exit, WatchExit::Stopped);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_runs_nothing() {
	let cancel = CancellationToken::new();
	cancel.cancel();
	let calls = AtomicU32::new(0);

	let exit = watch(INTERVAL, &cancel, || {
		calls.fetch_add(1, Ordering::SeqCst);
		async { Ok(PollOutcome::NoAction { openings: Vec::new() }) }
	})
	.await
	.unwrap();

	assert_eq!(exit, WatchExit::Stopped);
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}
