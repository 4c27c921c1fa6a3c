//! Session validity checks and the only cookie writes outside of login.

use std::time::Duration;

use tracing::{debug, info};

use crate::browser::{Browser, Selector};
use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::store::SessionStore;

/// Element shown by the single sign-on page when the session is gone.
pub const LOGIN_FIELD: &str = "#username";

/// How long the landing page may take to settle on its own URL.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks the remote service to decide whether the browser is authenticated.
pub struct SessionGuard<'a, B: Browser + ?Sized> {
	browser: &'a B,
	endpoints: &'a Endpoints,
	timeout: Duration,
}

impl<'a, B: Browser + ?Sized> SessionGuard<'a, B> {
	pub fn new(browser: &'a B, endpoints: &'a Endpoints) -> Self {
		Self {
			browser,
			endpoints,
			timeout: VERIFY_TIMEOUT,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Returns `true` only when the authenticated landing page is reached.
	///
	/// A login prompt, a navigation error or a timeout all yield `false`. The
	/// store is never touched.
	pub async fn verify(&self) -> bool {
		match self.check_landing().await {
			Ok(valid) => valid,
			Err(err) => {
				debug!(target = "squirrel.session", error = %err, "session verification failed");
				false
			}
		}
	}

	async fn check_landing(&self) -> Result<bool> {
		self.browser.goto(&self.endpoints.landing).await?;

		if self.browser.exists(&Selector::css(LOGIN_FIELD)).await? {
			debug!(target = "squirrel.session", "login form shown, session needs re-login");
			return Ok(false);
		}

		self.browser.wait_for_url(&self.endpoints.landing, self.timeout).await?;
		Ok(true)
	}

	/// Merges the browser's current cookies into the store after a successful
	/// verification. Stored cookies for domains the browser did not report are kept.
	pub async fn refresh(&self, store: &mut SessionStore) -> Result<usize> {
		let cookies = self.browser.cookies().await?;
		let count = cookies.len();
		store.merge_session(cookies)?;
		debug!(target = "squirrel.session", cookies = count, "session refreshed");
		Ok(count)
	}

	/// Drops the stored session once it is known to be invalid.
	pub fn invalidate(&self, store: &mut SessionStore) -> Result<()> {
		if store.has_session() {
			info!(target = "squirrel.session", path = %store.path().display(), "clearing expired session");
			store.clear_session()?;
		}
		Ok(())
	}
}
