//! W3C WebDriver wire session.
//!
//! Thin typed wrapper over the HTTP endpoints used by squirrel. Every request
//! carries the client timeout so a hung driver cannot stall the caller.

use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::trace;

use crate::error::{Result, RuntimeError};

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4f735466cecf";

/// Element location strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
	Css(String),
	XPath(String),
}

impl Locator {
	fn to_json(&self) -> Value {
		match self {
			Self::Css(value) => json!({ "using": "css selector", "value": value }),
			Self::XPath(value) => json!({ "using": "xpath", "value": value }),
		}
	}
}

/// Opaque reference to an element in the current document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// Cookie as represented on the WebDriver wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expiry: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<String>,
}

/// Cookie as reported by the DevTools `Network` domain.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevToolsCookie {
	name: String,
	value: String,
	domain: String,
	#[serde(default)]
	path: Option<String>,
	#[serde(default)]
	expires: Option<f64>,
	#[serde(default)]
	http_only: Option<bool>,
	#[serde(default)]
	secure: Option<bool>,
	#[serde(default)]
	same_site: Option<String>,
	#[serde(default)]
	session: bool,
}

impl From<DevToolsCookie> for WireCookie {
	fn from(cookie: DevToolsCookie) -> Self {
		let expiry = match cookie.expires {
			Some(expires) if !cookie.session && expires > 0.0 => Some(expires as u64),
			_ => None,
		};
		Self {
			name: cookie.name,
			value: cookie.value,
			domain: Some(cookie.domain),
			path: cookie.path,
			secure: cookie.secure,
			http_only: cookie.http_only,
			expiry,
			same_site: cookie.same_site,
		}
	}
}

fn parse_devtools_cookies(mut value: Value) -> Result<Vec<WireCookie>> {
	let cookies: Vec<DevToolsCookie> = serde_json::from_value(value.get_mut("cookies").map(Value::take).unwrap_or_default())
		.map_err(|e| RuntimeError::Protocol(format!("invalid DevTools cookie list: {e}")))?;
	Ok(cookies.into_iter().map(WireCookie::from).collect())
}

/// Session capabilities for Chrome.
#[derive(Debug, Clone)]
pub struct Capabilities {
	pub headless: bool,
	pub user_agent: Option<String>,
	pub page_load_timeout: Duration,
	pub script_timeout: Duration,
}

impl Default for Capabilities {
	fn default() -> Self {
		Self {
			headless: false,
			user_agent: None,
			page_load_timeout: Duration::from_secs(30),
			script_timeout: Duration::from_secs(10),
		}
	}
}

impl Capabilities {
	pub fn to_json(&self) -> Value {
		let mut args = vec!["--no-first-run".to_string(), "--no-default-browser-check".to_string()];
		if self.headless {
			args.push("--headless=new".to_string());
		}
		if let Some(ua) = &self.user_agent {
			args.push(format!("--user-agent={ua}"));
		}

		json!({
			"capabilities": {
				"alwaysMatch": {
					"browserName": "chrome",
					"pageLoadStrategy": "normal",
					"timeouts": {
						"implicit": 0,
						"pageLoad": self.page_load_timeout.as_millis() as u64,
						"script": self.script_timeout.as_millis() as u64,
					},
					"goog:chromeOptions": { "args": args },
				}
			}
		})
	}
}

#[derive(Debug, Deserialize)]
struct Envelope {
	#[serde(default)]
	value: Value,
}

/// An open WebDriver session.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
	client: reqwest::Client,
	base: String,
	id: String,
}

impl WebDriverSession {
	/// Opens a new browser session on the driver at `base`.
	pub async fn create(base: &str, capabilities: &Capabilities, request_timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder().timeout(request_timeout).build()?;
		let value = send(&client, Method::POST, &format!("{base}/session"), Some(capabilities.to_json())).await?;
		let id = value
			.get("sessionId")
			.and_then(Value::as_str)
			.ok_or_else(|| RuntimeError::Protocol(format!("new session response without sessionId: {value}")))?
			.to_string();

		Ok(Self {
			client,
			base: base.trim_end_matches('/').to_string(),
			id,
		})
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
		let url = format!("{}/session/{}{}", self.base, self.id, path);
		send(&self.client, method, &url, body).await
	}

	pub async fn navigate(&self, url: &str) -> Result<()> {
		self.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
		Ok(())
	}

	pub async fn current_url(&self) -> Result<String> {
		let value = self.command(Method::GET, "/url", None).await?;
		value
			.as_str()
			.map(str::to_string)
			.ok_or_else(|| RuntimeError::Protocol(format!("expected URL string, got {value}")))
	}

	/// Returns every element matching `locator`; an empty list is not an error.
	pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
		let value = self.command(Method::POST, "/elements", Some(locator.to_json())).await?;
		let items = value
			.as_array()
			.ok_or_else(|| RuntimeError::Protocol(format!("expected element list, got {value}")))?;

		Ok(items
			.iter()
			.filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
			.map(|id| ElementRef(id.to_string()))
			.collect())
	}

	pub async fn clear(&self, element: &ElementRef) -> Result<()> {
		self.command(Method::POST, &format!("/element/{}/clear", element.0), Some(json!({})))
			.await?;
		Ok(())
	}

	pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
		self.command(Method::POST, &format!("/element/{}/value", element.0), Some(json!({ "text": text })))
			.await?;
		Ok(())
	}

	pub async fn click(&self, element: &ElementRef) -> Result<()> {
		self.command(Method::POST, &format!("/element/{}/click", element.0), Some(json!({})))
			.await?;
		Ok(())
	}

	/// Runs a synchronous script and returns its result.
	pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
		self.command(Method::POST, "/execute/sync", Some(json!({ "script": script, "args": args })))
			.await
	}

	/// Cookies visible to the current document.
	pub async fn cookies(&self) -> Result<Vec<WireCookie>> {
		let value = self.command(Method::GET, "/cookie", None).await?;
		serde_json::from_value(value).map_err(|e| RuntimeError::Protocol(format!("invalid cookie list: {e}")))
	}

	/// Every cookie in the browser profile, across all domains.
	///
	/// Uses chromedriver's DevTools passthrough; drivers without it answer
	/// with a command error.
	pub async fn all_cookies(&self) -> Result<Vec<WireCookie>> {
		let value = self
			.command(
				Method::POST,
				"/goog/cdp/execute",
				Some(json!({ "cmd": "Network.getAllCookies", "params": {} })),
			)
			.await?;
		parse_devtools_cookies(value)
	}

	/// Adds a cookie; its domain must match the current document.
	pub async fn add_cookie(&self, cookie: &WireCookie) -> Result<()> {
		self.command(Method::POST, "/cookie", Some(json!({ "cookie": cookie }))).await?;
		Ok(())
	}

	/// Ends the session and closes the browser.
	pub async fn delete(&self) -> Result<()> {
		self.command(Method::DELETE, "", None).await?;
		Ok(())
	}
}

async fn send(client: &reqwest::Client, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
	trace!(target = "squirrel.runtime", %method, %url, "webdriver command");

	let mut request = client.request(method, url);
	if let Some(body) = body {
		request = request.json(&body);
	}

	let response = request.send().await?;
	let status = response.status();
	let envelope: Envelope = response
		.json()
		.await
		.map_err(|e| RuntimeError::Protocol(format!("{status} with unreadable body: {e}")))?;

	if let Some(error) = envelope.value.get("error").and_then(Value::as_str) {
		let message = envelope
			.value
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string();
		return Err(RuntimeError::Command {
			error: error.to_string(),
			message,
		});
	}

	if !status.is_success() {
		return Err(RuntimeError::Protocol(format!("unexpected status {status}")));
	}

	Ok(envelope.value)
}
