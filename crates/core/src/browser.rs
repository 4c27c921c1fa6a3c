//! Browser capability surface consumed by the engine.
//!
//! Session, polling and enrollment logic only talk to [`Browser`], so they can
//! be driven by [`crate::webdriver::WebDriverBrowser`] in production and by
//! [`crate::fake::FakeBrowser`] in tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use squirrel_protocol::StoredCookie;

use crate::error::Result;

/// Identifies an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
	/// CSS selector such as `#username`.
	Css(String),
	/// First `tag` element whose normalized text contains `text`.
	Text { tag: String, text: String },
}

impl Selector {
	pub fn css(selector: impl Into<String>) -> Self {
		Self::Css(selector.into())
	}

	pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
		Self::Text {
			tag: tag.into(),
			text: text.into(),
		}
	}
}

impl From<&str> for Selector {
	fn from(css: &str) -> Self {
		Self::Css(css.to_string())
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Css(css) => f.write_str(css),
			Self::Text { tag, text } => write!(f, "{tag}:text(\"{text}\")"),
		}
	}
}

/// Response of an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
	pub status: u16,
	pub status_text: String,
	pub body: String,
}

impl HttpResponse {
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self {
			status,
			status_text: String::new(),
			body: body.into(),
		}
	}

	pub fn ok(&self) -> bool {
		(200..300).contains(&self.status)
	}

	pub fn is_server_error(&self) -> bool {
		self.status >= 500
	}
}

/// Remote UI automation capability.
///
/// Every method that waits on the remote side is bounded, either by an explicit
/// `timeout` argument or by the implementation's per-request limit.
#[async_trait]
pub trait Browser: Send + Sync {
	/// Navigates the page to `url`.
	async fn goto(&self, url: &str) -> Result<()>;

	/// URL of the current document.
	async fn current_url(&self) -> Result<String>;

	/// Returns `true` if `selector` currently matches an element.
	async fn exists(&self, selector: &Selector) -> Result<bool>;

	/// Replaces the value of an input.
	async fn fill(&self, selector: &Selector, value: &str) -> Result<()>;

	async fn click(&self, selector: &Selector) -> Result<()>;

	/// Waits until `selector` matches an element.
	async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<()>;

	/// Waits until the current URL equals `url`.
	async fn wait_for_url(&self, url: &str, timeout: Duration) -> Result<()>;

	/// Waits until the current document has finished loading.
	async fn wait_for_load(&self, timeout: Duration) -> Result<()>;

	/// Cookies of the current browsing session, across every domain the
	/// browser can report.
	async fn cookies(&self) -> Result<Vec<StoredCookie>>;

	/// Installs previously captured cookies.
	async fn add_cookies(&self, cookies: &[StoredCookie]) -> Result<()>;

	/// Issues a GET carrying the session cookies and `headers`.
	async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse>;

	/// Ends the browser session.
	async fn close(&self) -> Result<()>;

	/// Waits for `selector` and then clicks it.
	async fn click_when_ready(&self, selector: &Selector, timeout: Duration) -> Result<()> {
		self.wait_for(selector, timeout).await?;
		self.click(selector).await
	}

	/// Waits for `selector` and then fills it.
	async fn fill_when_ready(&self, selector: &Selector, value: &str, timeout: Duration) -> Result<()> {
		self.wait_for(selector, timeout).await?;
		self.fill(selector, value).await
	}
}
