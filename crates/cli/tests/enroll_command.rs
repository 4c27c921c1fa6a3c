use std::fs;
use std::time::Duration;

use chrono::NaiveDate;
use squirrel::fake::{Call, FakeBrowser};
use squirrel::protocol::StoredCookie;
use squirrel::{AcornClient, CancellationToken, EnrollmentTarget, HttpResponse, PollMode, Selector, SessionStore, WatchExit};
use squirrel_cli::commands::enroll::watch_course;
use squirrel_cli::error::CliError;
use tempfile::TempDir;

const SAVED: &str = r#"{
	"utorid": "doejohn",
	"bypassCodes": ["111111"],
	"cookies": [
		{"name": "JSESSIONID", "value": "old", "domain": "acorn.utoronto.ca", "path": "/"},
		{"name": "XSRF-TOKEN", "value": "tok", "domain": "acorn.utoronto.ca", "path": "/"}
	],
	"lastLogin": "2024-09-01T12:00:00.000Z"
}"#;

fn store(dir: &TempDir) -> SessionStore {
	let path = dir.path().join("config.json");
	fs::write(&path, SAVED).unwrap();
	SessionStore::open(path)
}

fn reload(dir: &TempDir) -> SessionStore {
	SessionStore::open(dir.path().join("config.json"))
}

fn target() -> EnrollmentTarget {
	EnrollmentTarget::new("CSC108H1", "F", NaiveDate::from_ymd_opt(2024, 10, 1).unwrap())
		.with_poll_interval(Duration::from_secs(30))
}

fn open_lecture() -> HttpResponse {
	HttpResponse::new(
		200,
		r#"{"responseObject":{"meetings":[{"teachMethod":"LEC","sectionNo":"0101","displayName":"LEC0101","enrollmentSpaceAvailable":4,"totalSpace":120}]}}"#,
	)
}

#[tokio::test(start_paused = true)]
async fn expired_session_at_startup_exits_and_clears_cookies() {
	let dir = TempDir::new().unwrap();
	let mut client = AcornClient::new(FakeBrowser::new().with_element("#username"), store(&dir));

	let err = watch_course(&mut client, &target(), PollMode::Enroll, &CancellationToken::new())
		.await
		.unwrap_err();

	assert!(matches!(err, CliError::SessionInvalid));
	assert_eq!(client.browser().calls()[0], Call::AddCookies(2));
	assert!(client.browser().gets().is_empty());

	let saved = reload(&dir);
	assert!(!saved.has_session());
	assert_eq!(saved.config().utorid, "doejohn");
}

#[tokio::test(start_paused = true)]
async fn open_seat_is_claimed_and_session_refreshed() {
	let dir = TempDir::new().unwrap();
	let browser = FakeBrowser::new()
		.with_element("#typeaheadInput")
		.with_element(Selector::text("span", "CSC108H1 F"))
		.with_element("#courseLEC0101")
		.with_element("#enrol")
		.reveal_on_click("#enrol", "#CSC108H1-courseBox");
	browser.push_response(Ok(HttpResponse::new(503, "")));
	browser.push_response(Ok(open_lecture()));
	let mut client = AcornClient::new(browser, store(&dir));

	let exit = watch_course(&mut client, &target(), PollMode::Enroll, &CancellationToken::new())
		.await
		.unwrap();

	match exit {
		WatchExit::Enrolled(section) => assert_eq!(section.section, "0101"),
		other => panic!("expected enrollment, got {other:?}"),
	}
	assert_ne!(reload(&dir).config().last_login.as_deref(), Some("2024-09-01T12:00:00.000Z"));
}

#[tokio::test(start_paused = true)]
async fn session_expiring_mid_run_stops_and_clears_cookies() {
	let dir = TempDir::new().unwrap();
	let browser = FakeBrowser::new().expire_session_after(1);
	let mut client = AcornClient::new(browser, store(&dir));

	let err = watch_course(&mut client, &target(), PollMode::Monitor, &CancellationToken::new())
		.await
		.unwrap_err();

	assert!(matches!(err, CliError::SessionInvalid));
	assert!(!reload(&dir).has_session());
}

#[tokio::test(start_paused = true)]
async fn stop_request_ends_watch_cleanly() {
	let dir = TempDir::new().unwrap();
	let browser = FakeBrowser::new().with_cookie(StoredCookie::new("JSESSIONID", "live", "acorn.utoronto.ca"));
	browser.push_response(Ok(open_lecture()));
	let mut client = AcornClient::new(browser, store(&dir));

	let cancel = CancellationToken::new();
	let stopper = cancel.clone();
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_secs(10)).await;
		stopper.cancel();
	});

	let exit = watch_course(&mut client, &target(), PollMode::Monitor, &cancel).await.unwrap();

	assert_eq!(exit, WatchExit::Stopped);
	assert_eq!(client.browser().gets().len(), 1);
	assert!(reload(&dir).has_session());
}
