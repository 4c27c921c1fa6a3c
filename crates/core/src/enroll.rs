//! Seat claiming through the enrolment pages.

use std::time::Duration;

use squirrel_protocol::TeachMethod;
use tracing::{debug, error, info};

use crate::browser::{Browser, Selector};
use crate::endpoints::Endpoints;
use crate::error::{Error, Result};
use crate::target::{EnrollmentTarget, SectionSnapshot};

/// Pauses and bounds used while driving the enrolment page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollTimings {
	pub page_load: Duration,
	pub search_field: Duration,
	pub control: Duration,
	pub typeahead_settle: Duration,
	pub course_settle: Duration,
	pub section_settle: Duration,
	pub confirmation: Duration,
}

impl Default for EnrollTimings {
	fn default() -> Self {
		Self {
			page_load: Duration::from_secs(30),
			search_field: Duration::from_secs(30),
			control: Duration::from_secs(10),
			typeahead_settle: Duration::from_secs(2),
			course_settle: Duration::from_secs(2),
			section_settle: Duration::from_secs(1),
			confirmation: Duration::from_secs(5),
		}
	}
}

/// Selector of the confirmation box shown once `course` is in the enrolled list.
pub fn confirmation_selector(course: &str) -> Selector {
	Selector::css(format!("#{course}-courseBox"))
}

/// Selector of the radio control for one section, e.g. `#courseLEC0101`.
pub fn section_selector(section: &SectionSnapshot) -> Selector {
	Selector::css(format!("#course{}{}", section.method, section.section))
}

/// Control that submits the change: tutorials modify an existing enrolment.
pub fn submit_selector(method: &TeachMethod) -> Selector {
	match method {
		TeachMethod::Tutorial => Selector::css("#modify"),
		_ => Selector::css("#enrol"),
	}
}

pub struct Enroller<'a, B: Browser + ?Sized> {
	browser: &'a B,
	endpoints: &'a Endpoints,
	timings: EnrollTimings,
}

impl<'a, B: Browser + ?Sized> Enroller<'a, B> {
	pub fn new(browser: &'a B, endpoints: &'a Endpoints) -> Self {
		Self {
			browser,
			endpoints,
			timings: EnrollTimings::default(),
		}
	}

	pub fn with_timings(mut self, timings: EnrollTimings) -> Self {
		self.timings = timings;
		self
	}

	/// Claims `section` of `target` and confirms it landed.
	///
	/// Any failure short of an expired session or a fatal condition is reported
	/// as [`Error::Enrollment`], so the caller can move on to other candidates.
	pub async fn enroll(&self, target: &EnrollmentTarget, section: &SectionSnapshot) -> Result<()> {
		match self.claim(target, section).await {
			Ok(()) => {
				info!(
					target = "squirrel.enroll",
					course = %target.course_code,
					section = %section.label(),
					"Enrollment SUCCESS! -- now enrolled in {}@{}",
					target.course_code,
					target.section_code
				);
				Ok(())
			}
			Err(err) if err.kind().stops_watch() => Err(err),
			Err(err) => {
				error!(target = "squirrel.enroll", course = %target.course_code, section = %section.label(), error = %err, "failed to enroll");
				Err(match err {
					Error::Enrollment { .. } => err,
					other => Error::Enrollment {
						course: target.course_code.clone(),
						section: section.label(),
						reason: other.to_string(),
					},
				})
			}
		}
	}

	async fn claim(&self, target: &EnrollmentTarget, section: &SectionSnapshot) -> Result<()> {
		let browser = self.browser;
		let t = &self.timings;

		browser.goto(&self.endpoints.courses_page(target.enrolment_page)).await?;
		browser.wait_for_load(t.page_load).await?;

		debug!(target = "squirrel.enroll", course = %target.course_code, "searching for course on enrollment page");
		browser
			.fill_when_ready(&Selector::css("#typeaheadInput"), &target.course_code, t.search_field)
			.await?;
		tokio::time::sleep(t.typeahead_settle).await;

		let course_entry = Selector::text("span", format!("{} {}", target.course_code, target.section_code));
		browser.click_when_ready(&course_entry, t.control).await?;
		tokio::time::sleep(t.course_settle).await;

		browser.click_when_ready(&section_selector(section), t.control).await?;
		tokio::time::sleep(t.section_settle).await;

		browser.click_when_ready(&submit_selector(&section.method), t.control).await?;

		match browser.wait_for(&confirmation_selector(&target.course_code), t.confirmation).await {
			Ok(()) => Ok(()),
			Err(Error::Timeout { .. }) | Err(Error::ElementNotFound { .. }) => Err(Error::Enrollment {
				course: target.course_code.clone(),
				section: section.label(),
				reason: "course box not found after attempt".into(),
			}),
			Err(other) => Err(other),
		}
	}
}
