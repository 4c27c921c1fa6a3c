use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use squirrel::{Error, RetryPolicy};
use tokio::time::Instant;

fn server_error() -> Error {
	Error::Server {
		operation: "course view".into(),
		status: 503,
	}
}

#[tokio::test(start_paused = true)]
async fn transient_failures_then_success() {
	let policy = RetryPolicy::new(3, Duration::from_secs(2));
	let calls = AtomicU32::new(0);
	let started = Instant::now();

	let value = policy
		.run("fetch", || {
			let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
			async move { if n <= 2 { Err(server_error()) } else { Ok(n) } }
		})
		.await
		.unwrap();

	assert_eq!(value, 3);
	assert_eq!(calls.load(Ordering::SeqCst), 3);
	assert!(started.elapsed() >= Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn non_transient_error_is_not_retried() {
	let policy = RetryPolicy::default();
	let calls = AtomicU32::new(0);

	let err = policy
		.run("fetch", || {
			calls.fetch_add(1, Ordering::SeqCst);
			async {
				Err::<(), _>(Error::CheckFailed {
					course: "CSC108H1".into(),
					reason: "No course meeting data found".into(),
				})
			}
		})
		.await
		.unwrap_err();

	assert!(matches!(err, Error::CheckFailed { .. }));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn session_expiry_is_never_retried() {
	let policy = RetryPolicy::default();
	let calls = AtomicU32::new(0);
	let started = Instant::now();

	let err = policy
		.run("verify", || {
			calls.fetch_add(1, Ordering::SeqCst);
			async { Err::<(), _>(Error::SessionExpired) }
		})
		.await
		.unwrap_err();

	assert!(matches!(err, Error::SessionExpired));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_returns_last_error() {
	let policy = RetryPolicy::new(2, Duration::from_secs(1));
	let calls = AtomicU32::new(0);

	let err = policy
		.run("fetch", || {
			let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
			async move {
				Err::<(), _>(Error::Server {
					operation: format!("attempt {n}"),
					status: 500,
				})
			}
		})
		.await
		.unwrap_err();

	assert_eq!(calls.load(Ordering::SeqCst), 2);
	match err {
		Error::Server { operation, .. } => assert_eq!(operation, "attempt 2"),
		other => panic!("unexpected error {other:?}"),
	}
}

#[test]
fn zero_attempts_clamps_to_one() {
	assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
}
