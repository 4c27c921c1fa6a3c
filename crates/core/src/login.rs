//! Interactive single sign-on login with Duo or a stored bypass code.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::browser::{Browser, Selector};
use crate::endpoints::Endpoints;
use crate::error::{Error, Result};
use crate::store::SessionStore;

const FORM_TIMEOUT: Duration = Duration::from_secs(10);
const STEP_TIMEOUT: Duration = Duration::from_secs(10);
const MFA_TIMEOUT: Duration = Duration::from_secs(60);
const LANDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Account credentials. The password never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
	pub utorid: String,
	password: String,
}

impl Credentials {
	pub fn new(utorid: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			utorid: utorid.into(),
			password: password.into(),
		}
	}

	pub fn password(&self) -> &str {
		&self.password
	}

	pub fn is_complete(&self) -> bool {
		!self.utorid.trim().is_empty() && !self.password.is_empty()
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("utorid", &self.utorid)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Drives the login pages and records the resulting session.
pub struct LoginFlow<'a, B: Browser + ?Sized> {
	browser: &'a B,
	endpoints: &'a Endpoints,
}

impl<'a, B: Browser + ?Sized> LoginFlow<'a, B> {
	pub fn new(browser: &'a B, endpoints: &'a Endpoints) -> Self {
		Self { browser, endpoints }
	}

	/// Logs in and persists the session; clears any stored session on failure.
	pub async fn login(&self, store: &mut SessionStore, credentials: &Credentials) -> Result<()> {
		if !credentials.is_complete() {
			return Err(Error::Login("missing UTORid or password".into()));
		}

		let bypass_code = store.next_bypass_code().map(str::to_string);

		match self.sign_in(credentials, bypass_code.as_deref()).await {
			Ok(()) => {
				let cookies = self.browser.cookies().await?;
				store.set_account(&credentials.utorid);
				if let Some(code) = &bypass_code {
					store.consume_bypass_code(code);
				}
				store.update_session(cookies)?;
				info!(target = "squirrel.session", utorid = %credentials.utorid, "login successful, session saved");
				Ok(())
			}
			Err(err) => {
				error!(target = "squirrel.session", utorid = %credentials.utorid, error = %err, "login failed");
				if let Err(clear_err) = store.clear_session() {
					warn!(target = "squirrel.session", error = %clear_err, "could not clear session after failed login");
				}
				Err(match err {
					Error::Login(_) => err,
					other => Error::Login(other.to_string()),
				})
			}
		}
	}

	async fn sign_in(&self, credentials: &Credentials, bypass_code: Option<&str>) -> Result<()> {
		let browser = self.browser;
		browser.goto(&self.endpoints.landing).await?;

		browser
			.fill_when_ready(&Selector::css("#username"), &credentials.utorid, FORM_TIMEOUT)
			.await?;
		browser.fill(&Selector::css("#password"), credentials.password()).await?;
		browser.click(&Selector::css("[name=\"_eventId_proceed\"]")).await?;

		browser.wait_for(&Selector::css("#auth-view-wrapper"), FORM_TIMEOUT).await?;

		match bypass_code {
			Some(code) => self.enter_bypass_code(code).await?,
			None => self.await_duo_push().await?,
		}

		browser.wait_for_url(&self.endpoints.landing, LANDING_TIMEOUT).await
	}

	async fn enter_bypass_code(&self, code: &str) -> Result<()> {
		let browser = self.browser;
		info!(target = "squirrel.session", "using stored bypass code");

		browser.click_when_ready(&Selector::css(".button--link"), STEP_TIMEOUT).await?;
		browser
			.click_when_ready(&Selector::css("[data-testid=\"test-id-bypass\"]"), STEP_TIMEOUT)
			.await?;
		browser
			.fill_when_ready(&Selector::css("[name=\"passcode-input\"]"), code, STEP_TIMEOUT)
			.await?;
		browser.click(&Selector::css("[data-testid=\"verify-button\"]")).await
	}

	async fn await_duo_push(&self) -> Result<()> {
		info!(target = "squirrel.session", "waiting for Duo mobile authentication...");
		self.browser
			.click_when_ready(&Selector::css("#trust-browser-button"), MFA_TIMEOUT)
			.await
	}
}
