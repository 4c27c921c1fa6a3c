//! [`Browser`] backed by a local chromedriver over the WebDriver wire protocol.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use squirrel_protocol::{SameSite, StoredCookie};
use squirrel_runtime::{
	Capabilities, DriverProcess, ElementRef, Locator, RuntimeError, WebDriverSession, WireCookie, find_chromedriver,
};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::browser::{Browser, HttpResponse, Selector};
use crate::error::{Error, Result};

/// Desktop Chrome user agent presented to ACORN.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// How to start the browser.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
	/// Explicit chromedriver path; otherwise `CHROMEDRIVER` or `PATH` is used.
	pub driver: Option<PathBuf>,
	/// Fixed driver port; a free one is picked when unset.
	pub port: Option<u16>,
	pub headless: bool,
}

pub struct WebDriverBrowser {
	session: WebDriverSession,
	process: Mutex<Option<DriverProcess>>,
	http: reqwest::Client,
}

impl WebDriverBrowser {
	/// Starts chromedriver and opens a Chrome session.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let executable = find_chromedriver(options.driver.as_deref())?;
		let process = DriverProcess::spawn(&executable, options.port).await?;

		let capabilities = Capabilities {
			headless: options.headless,
			user_agent: Some(USER_AGENT.to_string()),
			..Capabilities::default()
		};
		let session = match WebDriverSession::create(&process.url(), &capabilities, COMMAND_TIMEOUT).await {
			Ok(session) => session,
			Err(err) => {
				let _ = process.shutdown().await;
				return Err(Error::BrowserLaunch(err.to_string()));
			}
		};

		let http = reqwest::Client::builder()
			.user_agent(USER_AGENT)
			.timeout(FETCH_TIMEOUT)
			.build()
			.map_err(|e| Error::BrowserLaunch(format!("http client: {e}")))?;

		info!(
			target = "squirrel.runtime",
			driver = %executable.display(),
			port = process.port(),
			headless = options.headless,
			session = session.id(),
			"browser session started"
		);

		Ok(Self {
			session,
			process: Mutex::new(Some(process)),
			http,
		})
	}

	async fn first(&self, selector: &Selector) -> Result<Option<ElementRef>> {
		let elements = self.session.find_elements(&locator(selector)).await?;
		Ok(elements.into_iter().next())
	}

	async fn require(&self, selector: &Selector) -> Result<ElementRef> {
		self.first(selector).await?.ok_or_else(|| Error::ElementNotFound {
			selector: selector.to_string(),
		})
	}

	async fn ready_state(&self) -> Result<bool> {
		let state = self.session.execute("return document.readyState", Vec::new()).await?;
		Ok(state.as_str() == Some("complete"))
	}
}

/// Maps a selector onto a WebDriver locator strategy.
pub fn locator(selector: &Selector) -> Locator {
	match selector {
		Selector::Css(css) => Locator::Css(css.clone()),
		Selector::Text { tag, text } => {
			Locator::XPath(format!("//{tag}[contains(normalize-space(.), {})]", xpath_literal(text)))
		}
	}
}

/// Quotes `text` as an XPath 1.0 string literal.
fn xpath_literal(text: &str) -> String {
	if !text.contains('"') {
		return format!("\"{text}\"");
	}
	if !text.contains('\'') {
		return format!("'{text}'");
	}
	let parts: Vec<String> = text.split('"').map(|part| format!("\"{part}\"")).collect();
	format!("concat({})", parts.join(", '\"', "))
}

fn to_wire(cookie: &StoredCookie) -> WireCookie {
	WireCookie {
		name: cookie.name.clone(),
		value: cookie.value.clone(),
		domain: Some(cookie.domain.clone()),
		path: Some(cookie.path.clone()),
		secure: cookie.secure,
		http_only: cookie.http_only,
		expiry: cookie.expires.filter(|ts| *ts > 0.0).map(|ts| ts as u64),
		same_site: cookie.same_site.map(|s| {
			match s {
				SameSite::Strict => "Strict",
				SameSite::Lax => "Lax",
				SameSite::None => "None",
			}
			.to_string()
		}),
	}
}

fn from_wire(cookie: WireCookie, fallback_domain: &str) -> StoredCookie {
	StoredCookie {
		domain: cookie.domain.unwrap_or_else(|| fallback_domain.to_string()),
		path: cookie.path.unwrap_or_else(|| "/".to_string()),
		expires: cookie.expiry.map(|ts| ts as f64),
		http_only: cookie.http_only,
		secure: cookie.secure,
		same_site: match cookie.same_site.as_deref() {
			Some("Strict") => Some(SameSite::Strict),
			Some("Lax") => Some(SameSite::Lax),
			Some("None") => Some(SameSite::None),
			_ => None,
		},
		name: cookie.name,
		value: cookie.value,
	}
}

fn cookie_header(cookies: &[WireCookie]) -> String {
	cookies
		.iter()
		.map(|c| format!("{}={}", c.name, c.value))
		.collect::<Vec<_>>()
		.join("; ")
}

fn host_of(url: &str) -> String {
	url::Url::parse(url)
		.ok()
		.and_then(|u| u.host_str().map(str::to_string))
		.unwrap_or_default()
}

/// A vanished element is reported as not found rather than as a driver fault.
fn element_error(selector: &Selector, err: RuntimeError) -> Error {
	if err.is_no_such_element() {
		Error::ElementNotFound {
			selector: selector.to_string(),
		}
	} else {
		err.into()
	}
}

fn timeout_error(limit: Duration, condition: String) -> Error {
	Error::Timeout {
		ms: limit.as_millis() as u64,
		condition,
	}
}

#[async_trait]
impl Browser for WebDriverBrowser {
	async fn goto(&self, url: &str) -> Result<()> {
		debug!(target = "squirrel.runtime", %url, "navigate");
		self.session.navigate(url).await.map_err(|e| {
			if e.is_timeout() {
				timeout_error(Capabilities::default().page_load_timeout, format!("navigation to {url}"))
			} else {
				Error::Navigation {
					url: url.to_string(),
					message: e.to_string(),
				}
			}
		})
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.session.current_url().await?)
	}

	async fn exists(&self, selector: &Selector) -> Result<bool> {
		Ok(self.first(selector).await?.is_some())
	}

	async fn fill(&self, selector: &Selector, value: &str) -> Result<()> {
		let element = self.require(selector).await?;
		self.session.clear(&element).await.map_err(|e| element_error(selector, e))?;
		self.session
			.send_keys(&element, value)
			.await
			.map_err(|e| element_error(selector, e))
	}

	async fn click(&self, selector: &Selector) -> Result<()> {
		let element = self.require(selector).await?;
		self.session.click(&element).await.map_err(|e| element_error(selector, e))
	}

	async fn wait_for(&self, selector: &Selector, limit: Duration) -> Result<()> {
		let deadline = Instant::now() + limit;
		loop {
			if self.first(selector).await?.is_some() {
				return Ok(());
			}
			if Instant::now() >= deadline {
				return Err(timeout_error(limit, format!("selector {selector}")));
			}
			sleep(POLL_INTERVAL).await;
		}
	}

	async fn wait_for_url(&self, url: &str, limit: Duration) -> Result<()> {
		let deadline = Instant::now() + limit;
		loop {
			if self.session.current_url().await? == url {
				return Ok(());
			}
			if Instant::now() >= deadline {
				return Err(timeout_error(limit, format!("URL {url}")));
			}
			sleep(POLL_INTERVAL).await;
		}
	}

	async fn wait_for_load(&self, limit: Duration) -> Result<()> {
		let deadline = Instant::now() + limit;
		loop {
			if self.ready_state().await? {
				return Ok(());
			}
			if Instant::now() >= deadline {
				return Err(timeout_error(limit, "document load".to_string()));
			}
			sleep(POLL_INTERVAL).await;
		}
	}

	async fn cookies(&self) -> Result<Vec<StoredCookie>> {
		let host = host_of(&self.session.current_url().await?);
		let cookies = match self.session.all_cookies().await {
			Ok(cookies) => cookies,
			Err(err) => {
				debug!(target = "squirrel.runtime", error = %err, "full cookie jar unavailable, reading current document");
				self.session.cookies().await?
			}
		};
		Ok(cookies.into_iter().map(|c| from_wire(c, &host)).collect())
	}

	/// Cookies can only be set for the current document's domain, so each
	/// host is visited once before its cookies are added.
	async fn add_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
		let mut by_host: BTreeMap<&str, Vec<&StoredCookie>> = BTreeMap::new();
		for cookie in cookies {
			by_host.entry(cookie.host()).or_default().push(cookie);
		}

		for (host, group) in by_host {
			self.goto(&format!("https://{host}/")).await?;
			for cookie in group {
				if let Err(err) = self.session.add_cookie(&to_wire(cookie)).await {
					warn!(target = "squirrel.runtime", name = %cookie.name, %host, error = %err, "cookie rejected");
				}
			}
		}
		Ok(())
	}

	async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse> {
		let cookies = self.session.cookies().await?;

		let mut request = self.http.get(url).header("cookie", cookie_header(&cookies));
		for (name, value) in headers {
			request = request.header(name.as_str(), value.as_str());
		}

		let response = request.send().await.map_err(|e| {
			if e.is_timeout() {
				timeout_error(FETCH_TIMEOUT, format!("GET {url}"))
			} else {
				Error::Driver(format!("GET {url} failed: {e}"))
			}
		})?;

		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| Error::Driver(format!("reading {url} failed: {e}")))?;

		Ok(HttpResponse {
			status: status.as_u16(),
			status_text: status.canonical_reason().unwrap_or_default().to_string(),
			body,
		})
	}

	async fn close(&self) -> Result<()> {
		if let Err(err) = self.session.delete().await {
			debug!(target = "squirrel.runtime", error = %err, "session delete failed");
		}
		let process = self.process.lock().take();
		if let Some(process) = process {
			process.shutdown().await?;
		}
		info!(target = "squirrel.runtime", "browser closed");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn text_selector_becomes_xpath() {
		let locator = locator(&Selector::text("span", "CSC108H1 F"));
		assert_eq!(locator, Locator::XPath("//span[contains(normalize-space(.), \"CSC108H1 F\")]".into()));
	}

	#[test]
	fn xpath_literal_handles_both_quotes() {
		assert_eq!(xpath_literal("it's"), "\"it's\"");
		assert_eq!(xpath_literal("say \"hi\""), "'say \"hi\"'");
		assert_eq!(xpath_literal("a\"b'c"), "concat(\"a\", '\"', \"b'c\")");
	}

	#[test]
	fn cookie_conversion_keeps_flags() {
		let mut cookie = StoredCookie::new("JSESSIONID", "abc", ".utoronto.ca");
		cookie.expires = Some(1_900_000_000.0);
		cookie.secure = Some(true);
		cookie.same_site = Some(SameSite::Lax);

		let wire = to_wire(&cookie);
		assert_eq!(wire.expiry, Some(1_900_000_000));
		assert_eq!(wire.same_site.as_deref(), Some("Lax"));

		assert_eq!(from_wire(wire, "acorn.utoronto.ca"), cookie);
	}

	#[test]
	fn stale_element_maps_to_not_found() {
		let err = element_error(
			&Selector::css("#enrol"),
			RuntimeError::Command {
				error: "stale element reference".into(),
				message: "element is not attached".into(),
			},
		);
		assert!(matches!(err, Error::ElementNotFound { selector } if selector == "#enrol"));
	}

	#[test]
	fn session_cookie_has_no_wire_expiry() {
		let mut cookie = StoredCookie::new("a", "b", "acorn.utoronto.ca");
		cookie.expires = Some(-1.0);
		assert_eq!(to_wire(&cookie).expiry, None);
	}

	#[test]
	fn missing_domain_falls_back_to_page_host() {
		let wire = WireCookie {
			name: "XSRF-TOKEN".into(),
			value: "t".into(),
			domain: None,
			path: None,
			secure: None,
			http_only: None,
			expiry: None,
			same_site: None,
		};
		let cookie = from_wire(wire, &host_of("https://acorn.utoronto.ca/sws/#/"));
		assert_eq!(cookie.domain, "acorn.utoronto.ca");
		assert_eq!(cookie.path, "/");
	}

	#[test]
	fn cookie_header_joins_pairs() {
		let cookies = vec![
			to_wire(&StoredCookie::new("a", "1", "x")),
			to_wire(&StoredCookie::new("b", "2", "x")),
		];
		assert_eq!(cookie_header(&cookies), "a=1; b=2");
	}
}
