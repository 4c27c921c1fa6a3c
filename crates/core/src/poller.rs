//! Availability checks and the enrollment trigger.
//!
//! One call to [`Poller::check`] is one cycle: verify the session, open the
//! course listing, fetch availability, then scan the reported sections in
//! order and act on the first acceptable one with free seats.

use std::time::Duration;

use squirrel_protocol::{CourseViewResponse, StoredCookie, TeachMethod};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

use crate::browser::Browser;
use crate::endpoints::Endpoints;
use crate::enroll::{EnrollTimings, Enroller};
use crate::error::{Error, Result};
use crate::guard::SessionGuard;
use crate::retry::RetryPolicy;
use crate::target::{EnrollmentTarget, SectionSnapshot};
use crate::watch::{WatchExit, watch};

/// Bound on the course listing page settling.
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the anti-forgery cookie mirrored into `x-xsrf-token`.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Marker of the bot challenge page served instead of JSON.
pub const CAPTCHA_MARKER: &str = "hCaptcha";

/// Whether open seats are claimed or only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollMode {
	#[default]
	Enroll,
	Monitor,
}

/// Result of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
	/// Nothing was claimed; in monitor mode `openings` lists what was seen.
	NoAction { openings: Vec<SectionSnapshot> },
	/// A seat was claimed; the run is over.
	Enrolled(SectionSnapshot),
	/// Every attempted candidate failed to enroll.
	EnrollmentFailed { attempted: Vec<SectionSnapshot> },
}

/// Builds the availability query URL for `target`.
pub fn course_view_url(endpoints: &Endpoints, target: &EnrollmentTarget) -> Result<Url> {
	Url::parse_with_params(
		&endpoints.course_view,
		&[
			("courseCode", target.course_code.as_str()),
			("courseSessionCode", target.session_code.as_str()),
			("postCode", endpoints.post_code.as_str()),
			("sectionCode", target.section_code.as_str()),
			("sessionCode", target.session_code.as_str()),
		],
	)
	.map_err(|e| Error::check_failed(&target.course_code, format!("invalid course view URL: {e}")))
}

/// Headers ACORN expects on REST calls, with the XSRF token from `cookies`.
pub fn request_headers(cookies: &[StoredCookie], referer: &str) -> Vec<(String, String)> {
	let xsrf = cookies
		.iter()
		.find(|c| c.name == XSRF_COOKIE)
		.map(|c| c.value.clone())
		.unwrap_or_default();

	[
		("accept", "application/json, text/plain, */*"),
		("accept-language", "en-CA,en;q=0.9"),
		("content-type", "application/json"),
		("x-xsrf-token", xsrf.as_str()),
		("referer", referer),
	]
	.into_iter()
	.map(|(k, v)| (k.to_string(), v.to_string()))
	.collect()
}

/// Parses a course view body into section snapshots.
///
/// A challenge page in place of JSON is fatal; service errors and missing
/// meeting data fail only this check.
pub fn parse_course_view(course: &str, body: &str) -> Result<Vec<SectionSnapshot>> {
	let data: CourseViewResponse = match serde_json::from_str(body) {
		Ok(data) => data,
		Err(e) if body.contains(CAPTCHA_MARKER) => {
			error!(target = "squirrel.poll", %course, error = %e, "captcha detected, please log in again");
			return Err(Error::Captcha {
				course: course.to_string(),
			});
		}
		Err(e) => return Err(Error::check_failed(course, format!("malformed course data: {e}"))),
	};

	let errors = data.errors();
	if !errors.is_empty() {
		return Err(Error::check_failed(course, format!("API Error: {}", errors.join(", "))));
	}

	let meetings = data
		.meetings()
		.ok_or_else(|| Error::check_failed(course, "No course meeting data found"))?;

	Ok(meetings.iter().map(SectionSnapshot::from).collect())
}

pub struct Poller<'a, B: Browser + ?Sized> {
	browser: &'a B,
	endpoints: &'a Endpoints,
	mode: PollMode,
	retry: RetryPolicy,
	timings: EnrollTimings,
}

impl<'a, B: Browser + ?Sized> Poller<'a, B> {
	pub fn new(browser: &'a B, endpoints: &'a Endpoints, mode: PollMode) -> Self {
		Self {
			browser,
			endpoints,
			mode,
			retry: RetryPolicy::default(),
			timings: EnrollTimings::default(),
		}
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn with_enroll_timings(mut self, timings: EnrollTimings) -> Self {
		self.timings = timings;
		self
	}

	pub fn mode(&self) -> PollMode {
		self.mode
	}

	/// Runs one cycle for `target`.
	pub async fn check(&self, target: &EnrollmentTarget) -> Result<PollOutcome> {
		if !SessionGuard::new(self.browser, self.endpoints).verify().await {
			return Err(Error::SessionExpired);
		}

		self.open_listing().await?;
		let sections = self.fetch(target).await?;

		info!(target = "squirrel.poll", course = %target.course_code, sections = sections.len(), "Checking availability for {}", target.course_code);
		self.scan(target, &sections).await
	}

	/// Runs cycles until enrolled, stopped via `cancel`, or a fatal error.
	pub async fn watch(&self, target: &EnrollmentTarget, cancel: &CancellationToken) -> Result<WatchExit> {
		watch(target.poll_interval, cancel, move || self.check(target)).await
	}

	async fn open_listing(&self) -> Result<()> {
		let browser = self.browser;
		let page = self.endpoints.courses_page(0);
		let page = page.as_str();

		self.retry
			.run("open course listing", move || async move {
				browser.goto(page).await?;
				browser.wait_for_load(LISTING_TIMEOUT).await
			})
			.await
	}

	/// Fetches and parses the availability of `target`.
	pub async fn fetch(&self, target: &EnrollmentTarget) -> Result<Vec<SectionSnapshot>> {
		let browser = self.browser;
		let referer = self.endpoints.referer.as_str();
		let url = course_view_url(self.endpoints, target)?;
		let url = url.as_str();

		let response = self
			.retry
			.run("course view", move || async move {
				let cookies = browser.cookies().await?;
				let headers = request_headers(&cookies, referer);
				let response = browser.get(url, &headers).await?;
				if response.is_server_error() {
					return Err(Error::Server {
						operation: "course view".into(),
						status: response.status,
					});
				}
				Ok(response)
			})
			.await?;

		if !response.ok() {
			return Err(Error::check_failed(
				&target.course_code,
				format!("Failed to fetch course data: {} {}", response.status, response.status_text),
			));
		}

		parse_course_view(&target.course_code, &response.body)
	}

	async fn scan(&self, target: &EnrollmentTarget, sections: &[SectionSnapshot]) -> Result<PollOutcome> {
		let enroller = Enroller::new(self.browser, self.endpoints).with_timings(self.timings);
		let mut openings = Vec::new();
		let mut attempted = Vec::new();

		for section in sections {
			if section.method == TeachMethod::Tutorial && !target.wants_tutorials() {
				continue;
			}
			if !target.accepts(section) {
				continue;
			}
			if !section.has_seats() {
				debug!(target = "squirrel.poll", "{} has no space left for {}", target.course_code, section.label());
				continue;
			}

			let spaces = format!(
				"{} has {} spaces left (total: {}) for {}",
				target.course_code,
				section.available,
				section.total,
				section.label()
			);

			match self.mode {
				PollMode::Monitor => {
					info!(target = "squirrel.poll", "[MONITOR] {spaces}");
					openings.push(section.clone());
				}
				PollMode::Enroll => {
					info!(target = "squirrel.poll", "[ENROLL] {spaces}");
					match enroller.enroll(target, section).await {
						Ok(()) => return Ok(PollOutcome::Enrolled(section.clone())),
						Err(err) if err.kind().stops_watch() => return Err(err),
						Err(err) => {
							error!(target = "squirrel.poll", course = %target.course_code, section = %section.label(), error = %err, "enrollment attempt failed");
							attempted.push(section.clone());
						}
					}
				}
			}
		}

		if attempted.is_empty() {
			Ok(PollOutcome::NoAction { openings })
		} else {
			Ok(PollOutcome::EnrollmentFailed { attempted })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_carries_all_parameters() {
		let target = EnrollmentTarget::new("CSC108H1", "F", chrono::NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
		let url = course_view_url(&Endpoints::default(), &target).unwrap();

		let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
		assert_eq!(
			pairs,
			vec![
				("courseCode".to_string(), "CSC108H1".to_string()),
				("courseSessionCode".to_string(), "20249".to_string()),
				("postCode".to_string(), "ASCRSHBSC".to_string()),
				("sectionCode".to_string(), "F".to_string()),
				("sessionCode".to_string(), "20249".to_string()),
			]
		);
	}

	#[test]
	fn xsrf_header_mirrors_cookie() {
		let cookies = vec![
			StoredCookie::new("JSESSIONID", "s", "acorn.utoronto.ca"),
			StoredCookie::new(XSRF_COOKIE, "token-1", "acorn.utoronto.ca"),
		];
		let headers = request_headers(&cookies, "https://acorn.utoronto.ca/sws/");
		assert!(headers.contains(&("x-xsrf-token".to_string(), "token-1".to_string())));
		assert!(headers.contains(&("referer".to_string(), "https://acorn.utoronto.ca/sws/".to_string())));
	}

	#[test]
	fn missing_xsrf_cookie_sends_empty_token() {
		let headers = request_headers(&[], "r");
		assert!(headers.contains(&("x-xsrf-token".to_string(), String::new())));
	}

	#[test]
	fn captcha_page_is_fatal() {
		let err = parse_course_view("CSC108H1", "<html><div class=\"hCaptcha\"></div></html>").unwrap_err();
		assert!(matches!(err, Error::Captcha { .. }));
		assert!(err.kind().stops_watch());
	}

	#[test]
	fn other_malformed_body_is_check_failure() {
		let err = parse_course_view("CSC108H1", "<html>maintenance</html>").unwrap_err();
		assert_eq!(err.kind(), crate::ErrorKind::CheckFailure);
	}

	#[test]
	fn service_errors_fail_the_check() {
		let err = parse_course_view("CSC108H1", r#"{"messages":{"errors":["Invalid session","Try later"]}}"#).unwrap_err();
		assert!(err.to_string().contains("API Error: Invalid session, Try later"));
		assert_eq!(err.kind(), crate::ErrorKind::CheckFailure);
	}

	#[test]
	fn missing_meetings_fail_the_check() {
		let err = parse_course_view("CSC108H1", r#"{"responseObject":{}}"#).unwrap_err();
		assert!(err.to_string().contains("No course meeting data found"));
	}

	#[test]
	fn null_capacity_reads_as_no_seats() {
		let body = r#"{"responseObject":{"meetings":[
			{"teachMethod":"LEC","sectionNo":"0101","enrollmentSpaceAvailable":5,"totalSpace":100},
			{"teachMethod":"PRA","sectionNo":"0001","enrollmentSpaceAvailable":null,"totalSpace":null}
		]}}"#;
		let sections = parse_course_view("CSC108H1", body).unwrap();
		assert_eq!(sections.len(), 2);
		assert_eq!(sections[0].available, 5);
		assert_eq!(sections[1].available, 0);
		assert!(!sections[1].has_seats());
	}
}
