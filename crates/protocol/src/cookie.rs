//! Cookie records as persisted in the session file.

use serde::{Deserialize, Serialize};

/// `SameSite` attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
	Strict,
	Lax,
	None,
}

/// A single browser cookie.
///
/// `expires` is a Unix timestamp in seconds; a missing or negative value marks
/// a session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	#[serde(default = "default_path")]
	pub path: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,
}

fn default_path() -> String {
	"/".to_string()
}

impl StoredCookie {
	/// Creates a session cookie with no flags set.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: domain.into(),
			path: default_path(),
			expires: None,
			http_only: None,
			secure: None,
			same_site: None,
		}
	}

	/// Identity of the cookie: at most one record per key is authoritative.
	pub fn key(&self) -> (&str, &str, &str) {
		(&self.name, &self.domain, &self.path)
	}

	/// Returns `true` for cookies without a positive expiry.
	pub fn is_session(&self) -> bool {
		self.expires.is_none_or(|ts| ts < 0.0)
	}

	/// Host the cookie can be set from, without a leading dot.
	pub fn host(&self) -> &str {
		self.domain.strip_prefix('.').unwrap_or(&self.domain)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_browser_exported_cookie() {
		let cookie: StoredCookie = serde_json::from_str(
			r#"{
  "name": "JSESSIONID",
  "value": "abc",
  "domain": ".utoronto.ca",
  "path": "/sws",
  "expires": -1,
  "httpOnly": true,
  "secure": true,
  "sameSite": "Lax"
}"#,
		)
		.unwrap();

		assert_eq!(cookie.key(), ("JSESSIONID", ".utoronto.ca", "/sws"));
		assert_eq!(cookie.same_site, Some(SameSite::Lax));
		assert!(cookie.is_session());
		assert_eq!(cookie.host(), "utoronto.ca");
	}

	#[test]
	fn missing_path_defaults_to_root() {
		let cookie: StoredCookie = serde_json::from_str(r#"{"name":"a","value":"b","domain":"acorn.utoronto.ca"}"#).unwrap();
		assert_eq!(cookie.path, "/");
		assert!(cookie.is_session());
	}

	#[test]
	fn unset_flags_are_not_written() {
		let json = serde_json::to_string(&StoredCookie::new("a", "b", "example.com")).unwrap();
		assert!(!json.contains("httpOnly"));
		assert!(!json.contains("expires"));
	}
}
