//! ACORN URLs used by the engine.

use squirrel_protocol::DEFAULT_POST_CODE;

/// Remote locations the engine navigates to and fetches from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
	/// Authenticated landing page; also the URL reached after login.
	pub landing: String,
	/// Prefix of the course-listing pages, followed by the page index.
	pub courses: String,
	/// Course availability REST endpoint.
	pub course_view: String,
	/// `referer` header sent with REST calls.
	pub referer: String,
	/// Program post code sent with availability queries.
	pub post_code: String,
}

impl Default for Endpoints {
	fn default() -> Self {
		Self {
			landing: "https://acorn.utoronto.ca/sws/#/".into(),
			courses: "https://acorn.utoronto.ca/sws/#/courses/".into(),
			course_view: "https://acorn.utoronto.ca/sws/rest/enrolment/course/view".into(),
			referer: "https://acorn.utoronto.ca/sws/".into(),
			post_code: DEFAULT_POST_CODE.into(),
		}
	}
}

impl Endpoints {
	/// Course-listing page for the given enrolment period index.
	pub fn courses_page(&self, index: u8) -> String {
		format!("{}{index}", self.courses)
	}
}
