//! Error taxonomy for the session, retry and polling engine.
//!
//! Control flow dispatches on [`ErrorKind`], never on message text.

use std::fmt;

use squirrel_runtime::RuntimeError;
use thiserror::Error;

/// How the engine should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Server-side fault expected to clear on an immediate retry.
	Transient,
	/// Bad or missing data for this cycle; retried on the next cycle.
	CheckFailure,
	/// The session is no longer authenticated; requires `login`.
	SessionExpired,
	/// Unrecoverable for this process.
	Fatal,
	/// One enrollment attempt failed; other candidates may still succeed.
	EnrollmentFailure,
}

impl ErrorKind {
	/// Whether the watch loop must stop instead of waiting for the next cycle.
	pub fn stops_watch(self) -> bool {
		matches!(self, Self::SessionExpired | Self::Fatal)
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Transient => "transient",
			Self::CheckFailure => "check-failure",
			Self::SessionExpired => "session-expired",
			Self::Fatal => "fatal",
			Self::EnrollmentFailure => "enrollment-failure",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("{operation} failed with server error {status}")]
	Server { operation: String, status: u16 },

	#[error("Navigation to {url} failed: {message}")]
	Navigation { url: String, message: String },

	#[error("Timed out after {ms}ms waiting for {condition}")]
	Timeout { ms: u64, condition: String },

	#[error("Element not found: {selector}")]
	ElementNotFound { selector: String },

	#[error("Browser driver error: {0}")]
	Driver(String),

	#[error("Check failed for {course}: {reason}")]
	CheckFailed { course: String, reason: String },

	#[error("Session expired, please login again")]
	SessionExpired,

	#[error("Captcha detected while checking {course}, please log in again")]
	Captcha { course: String },

	#[error("Enrollment in {course} ({section}) failed: {reason}")]
	Enrollment { course: String, section: String, reason: String },

	#[error("Login failed: {0}")]
	Login(String),

	#[error("Failed to launch browser: {0}")]
	BrowserLaunch(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Server { .. } => ErrorKind::Transient,
			Self::Navigation { .. }
			| Self::Timeout { .. }
			| Self::ElementNotFound { .. }
			| Self::Driver(_)
			| Self::CheckFailed { .. }
			| Self::Json(_) => ErrorKind::CheckFailure,
			Self::SessionExpired => ErrorKind::SessionExpired,
			Self::Captcha { .. } | Self::Login(_) | Self::BrowserLaunch(_) | Self::Io(_) => ErrorKind::Fatal,
			Self::Enrollment { .. } => ErrorKind::EnrollmentFailure,
		}
	}

	pub fn is_transient(&self) -> bool {
		self.kind() == ErrorKind::Transient
	}

	pub(crate) fn check_failed(course: &str, reason: impl Into<String>) -> Self {
		Self::CheckFailed {
			course: course.to_string(),
			reason: reason.into(),
		}
	}
}

impl From<RuntimeError> for Error {
	fn from(err: RuntimeError) -> Self {
		match err {
			RuntimeError::DriverNotFound(_) | RuntimeError::Launch(_) => Self::BrowserLaunch(err.to_string()),
			RuntimeError::Io(e) => Self::Io(e),
			other => Self::Driver(other.to_string()),
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_server_errors_are_transient() {
		let server = Error::Server {
			operation: "course view".into(),
			status: 503,
		};
		assert!(server.is_transient());
		assert!(!Error::SessionExpired.is_transient());
		assert!(!Error::check_failed("CSC108H1", "no data").is_transient());
	}

	#[test]
	fn session_expired_and_fatal_stop_the_watch() {
		assert!(Error::SessionExpired.kind().stops_watch());
		assert!(Error::Captcha { course: "CSC108H1".into() }.kind().stops_watch());
		assert!(!Error::check_failed("CSC108H1", "API Error").kind().stops_watch());
		assert!(
			!Error::Enrollment {
				course: "CSC108H1".into(),
				section: "LEC0101".into(),
				reason: "no course box".into(),
			}
			.kind()
			.stops_watch()
		);
	}

	#[test]
	fn driver_launch_failures_are_fatal() {
		let err: Error = RuntimeError::DriverNotFound("chromedriver".into()).into();
		assert_eq!(err.kind(), ErrorKind::Fatal);

		let err: Error = RuntimeError::Command {
			error: "unknown error".into(),
			message: "tab crashed".into(),
		}
		.into();
		assert_eq!(err.kind(), ErrorKind::CheckFailure);
	}
}
