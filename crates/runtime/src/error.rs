use thiserror::Error;

/// Errors raised while launching or talking to a WebDriver server.
#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("WebDriver executable not found: {0}")]
	DriverNotFound(String),

	#[error("Failed to launch WebDriver: {0}")]
	Launch(String),

	#[error("WebDriver request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("WebDriver error `{error}`: {message}")]
	Command { error: String, message: String },

	#[error("Unexpected WebDriver response: {0}")]
	Protocol(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl RuntimeError {
	/// Returns the W3C error code for command failures.
	pub fn code(&self) -> Option<&str> {
		match self {
			Self::Command { error, .. } => Some(error),
			_ => None,
		}
	}

	pub fn is_no_such_element(&self) -> bool {
		matches!(self.code(), Some("no such element" | "stale element reference"))
	}

	pub fn is_timeout(&self) -> bool {
		match self {
			Self::Command { error, .. } => error == "timeout" || error == "script timeout",
			Self::Http(e) => e.is_timeout(),
			_ => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
