//! What the user wants to enroll in, and how sections are matched against it.

use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use squirrel_protocol::{Meeting, TeachMethod};

/// Default delay between availability checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Academic-session code for `date`: `{year}9` for Sept–Dec, `{year}1` for
/// Jan–Mar, `{year}5` otherwise.
pub fn session_code(date: NaiveDate) -> String {
	let term = match date.month() {
		9..=12 => '9',
		1..=3 => '1',
		_ => '5',
	};
	format!("{}{term}", date.year())
}

/// Index of the enrolment page tab for `date`: 1 from April to September, 0 otherwise.
pub fn enrolment_page_index(date: NaiveDate) -> u8 {
	if (4..=9).contains(&date.month()) { 1 } else { 0 }
}

/// A course the user wants a seat in.
///
/// Empty section lists accept any lecture; tutorials are only considered when
/// the tutorial list is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentTarget {
	pub course_code: String,
	pub session_code: String,
	pub section_code: String,
	pub lecture_sections: Vec<String>,
	pub tutorial_sections: Vec<String>,
	pub poll_interval: Duration,
	pub enrolment_page: u8,
}

impl EnrollmentTarget {
	/// Builds a target whose session codes are derived from `today`.
	pub fn new(course_code: impl Into<String>, section_code: impl Into<String>, today: NaiveDate) -> Self {
		Self {
			course_code: course_code.into().trim().to_uppercase(),
			session_code: session_code(today),
			section_code: section_code.into().trim().to_uppercase(),
			lecture_sections: Vec::new(),
			tutorial_sections: Vec::new(),
			poll_interval: DEFAULT_POLL_INTERVAL,
			enrolment_page: enrolment_page_index(today),
		}
	}

	pub fn with_lectures(mut self, sections: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.lecture_sections = normalize(sections);
		self
	}

	pub fn with_tutorials(mut self, sections: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.tutorial_sections = normalize(sections);
		self
	}

	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	/// Whether tutorial sections are of interest at all.
	pub fn wants_tutorials(&self) -> bool {
		!self.tutorial_sections.is_empty()
	}

	/// Returns `true` when `section` is one the user would accept.
	pub fn accepts(&self, section: &SectionSnapshot) -> bool {
		match section.method {
			TeachMethod::Lecture => self.lecture_sections.is_empty() || listed(&self.lecture_sections, section),
			TeachMethod::Tutorial => self.wants_tutorials() && listed(&self.tutorial_sections, section),
			_ => false,
		}
	}
}

fn normalize(sections: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
	sections
		.into_iter()
		.map(|s| s.into().trim().to_uppercase())
		.filter(|s| !s.is_empty())
		.collect()
}

// Accepts both "0101" and "LEC0101" spellings.
fn listed(filter: &[String], section: &SectionSnapshot) -> bool {
	let id = section.section.to_uppercase();
	let prefixed = format!("{}{id}", section.method.as_str());
	filter.iter().any(|f| *f == id || *f == prefixed)
}

/// One teaching-method instance as reported by a single availability fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSnapshot {
	pub method: TeachMethod,
	pub section: String,
	pub display_name: String,
	pub available: u32,
	pub total: u32,
}

impl SectionSnapshot {
	pub fn has_seats(&self) -> bool {
		self.available > 0
	}

	/// Label used in logs, e.g. `LEC0101`.
	pub fn label(&self) -> String {
		if self.display_name.is_empty() {
			format!("{}{}", self.method, self.section)
		} else {
			self.display_name.clone()
		}
	}
}

impl From<&Meeting> for SectionSnapshot {
	fn from(meeting: &Meeting) -> Self {
		Self {
			method: meeting.teach_method.clone(),
			section: meeting.section_no.clone(),
			display_name: meeting.display_name.clone(),
			available: clamp_seats(meeting.enrollment_space_available),
			total: clamp_seats(meeting.total_space),
		}
	}
}

fn clamp_seats(value: i64) -> u32 {
	u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
