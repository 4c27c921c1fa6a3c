//! In-memory [`Browser`] for exercising the engine without a real browser.
//!
//! Pages are modeled as a set of present selectors. Navigation records the
//! call and moves to the requested URL (or a scripted redirect), requests pop
//! scripted responses in order, and clicks can reveal further elements.
//!
//! ```ignore
//! let browser = FakeBrowser::new()
//!     .with_element("#typeaheadInput")
//!     .reveal_on_click("#enrol", "#CSC108H1-courseBox");
//! browser.push_response(Ok(HttpResponse::new(200, body)));
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use squirrel_protocol::StoredCookie;
use tokio::time::sleep;

use crate::browser::{Browser, HttpResponse, Selector};
use crate::error::{Error, Result};
use crate::guard::LOGIN_FIELD;

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Goto(String),
	Fill(Selector, String),
	Click(Selector),
	Get { url: String, headers: Vec<(String, String)> },
	AddCookies(usize),
	Close,
}

#[derive(Default)]
struct State {
	url: String,
	present: HashSet<Selector>,
	redirects: HashMap<String, String>,
	reveals: HashMap<Selector, Vec<Selector>>,
	goto_failures: VecDeque<Error>,
	responses: VecDeque<Result<HttpResponse>>,
	cookies: Vec<StoredCookie>,
	calls: Vec<Call>,
	navigations: usize,
	expire_after: Option<usize>,
}

#[derive(Default)]
pub struct FakeBrowser {
	state: Mutex<State>,
}

impl FakeBrowser {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes `selector` present on every page.
	pub fn with_element(self, selector: impl Into<Selector>) -> Self {
		self.state.lock().present.insert(selector.into());
		self
	}

	/// Navigating to `from` lands on `to` instead.
	pub fn with_redirect(self, from: impl Into<String>, to: impl Into<String>) -> Self {
		self.state.lock().redirects.insert(from.into(), to.into());
		self
	}

	pub fn with_cookie(self, cookie: StoredCookie) -> Self {
		self.state.lock().cookies.push(cookie);
		self
	}

	/// Clicking `trigger` makes `revealed` present.
	pub fn reveal_on_click(self, trigger: impl Into<Selector>, revealed: impl Into<Selector>) -> Self {
		self.state
			.lock()
			.reveals
			.entry(trigger.into())
			.or_default()
			.push(revealed.into());
		self
	}

	/// Shows the login form on every page after `navigations` successful gotos.
	pub fn expire_session_after(self, navigations: usize) -> Self {
		self.state.lock().expire_after = Some(navigations);
		self
	}

	/// Queues the result of the next `get`.
	pub fn push_response(&self, response: Result<HttpResponse>) {
		self.state.lock().responses.push_back(response);
	}

	/// Makes the next `goto` fail with `error`.
	pub fn fail_next_goto(&self, error: Error) {
		self.state.lock().goto_failures.push_back(error);
	}

	pub fn calls(&self) -> Vec<Call> {
		self.state.lock().calls.clone()
	}

	pub fn clicks(&self) -> Vec<Selector> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Click(selector) => Some(selector),
				_ => None,
			})
			.collect()
	}

	pub fn gets(&self) -> Vec<(String, Vec<(String, String)>)> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Get { url, headers } => Some((url, headers)),
				_ => None,
			})
			.collect()
	}

	pub fn stored_cookies(&self) -> Vec<StoredCookie> {
		self.state.lock().cookies.clone()
	}

	fn require(state: &State, selector: &Selector) -> Result<()> {
		if state.present.contains(selector) {
			Ok(())
		} else {
			Err(Error::ElementNotFound {
				selector: selector.to_string(),
			})
		}
	}
}

fn timeout(limit: Duration, condition: String) -> Error {
	Error::Timeout {
		ms: limit.as_millis() as u64,
		condition,
	}
}

#[async_trait]
impl Browser for FakeBrowser {
	async fn goto(&self, url: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(Call::Goto(url.to_string()));
		if let Some(err) = state.goto_failures.pop_front() {
			return Err(err);
		}
		let landed = state.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());
		state.url = landed;
		state.navigations += 1;
		if state.expire_after.is_some_and(|limit| state.navigations > limit) {
			state.present.insert(Selector::css(LOGIN_FIELD));
		}
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.state.lock().url.clone())
	}

	async fn exists(&self, selector: &Selector) -> Result<bool> {
		Ok(self.state.lock().present.contains(selector))
	}

	async fn fill(&self, selector: &Selector, value: &str) -> Result<()> {
		let mut state = self.state.lock();
		Self::require(&state, selector)?;
		state.calls.push(Call::Fill(selector.clone(), value.to_string()));
		Ok(())
	}

	async fn click(&self, selector: &Selector) -> Result<()> {
		let mut state = self.state.lock();
		Self::require(&state, selector)?;
		state.calls.push(Call::Click(selector.clone()));
		if let Some(revealed) = state.reveals.get(selector).cloned() {
			state.present.extend(revealed);
		}
		Ok(())
	}

	/// Resolves at once when the selector is present; otherwise waits out
	/// `limit` before timing out.
	async fn wait_for(&self, selector: &Selector, limit: Duration) -> Result<()> {
		let present = self.state.lock().present.contains(selector);
		if present {
			return Ok(());
		}
		sleep(limit).await;
		Err(timeout(limit, format!("selector {selector}")))
	}

	async fn wait_for_url(&self, url: &str, limit: Duration) -> Result<()> {
		let arrived = self.state.lock().url == url;
		if arrived {
			return Ok(());
		}
		sleep(limit).await;
		Err(timeout(limit, format!("URL {url}")))
	}

	async fn wait_for_load(&self, _limit: Duration) -> Result<()> {
		Ok(())
	}

	async fn cookies(&self) -> Result<Vec<StoredCookie>> {
		Ok(self.state.lock().cookies.clone())
	}

	async fn add_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(Call::AddCookies(cookies.len()));
		state.cookies.extend_from_slice(cookies);
		Ok(())
	}

	async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse> {
		let mut state = self.state.lock();
		state.calls.push(Call::Get {
			url: url.to_string(),
			headers: headers.to_vec(),
		});
		state
			.responses
			.pop_front()
			.unwrap_or_else(|| Err(Error::Driver(format!("no scripted response for {url}"))))
	}

	async fn close(&self) -> Result<()> {
		self.state.lock().calls.push(Call::Close);
		Ok(())
	}
}
