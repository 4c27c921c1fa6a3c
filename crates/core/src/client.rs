//! Owns a browser and its session store, and wires the engine pieces together.

use tracing::debug;

use crate::browser::Browser;
use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::guard::SessionGuard;
use crate::login::{Credentials, LoginFlow};
use crate::poller::{PollMode, Poller};
use crate::store::SessionStore;

pub struct AcornClient<B: Browser> {
	browser: B,
	store: SessionStore,
	endpoints: Endpoints,
}

impl<B: Browser> AcornClient<B> {
	pub fn new(browser: B, store: SessionStore) -> Self {
		Self {
			browser,
			store,
			endpoints: Endpoints::default(),
		}
	}

	pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;
		self
	}

	pub fn browser(&self) -> &B {
		&self.browser
	}

	pub fn store(&self) -> &SessionStore {
		&self.store
	}

	pub fn endpoints(&self) -> &Endpoints {
		&self.endpoints
	}

	/// Installs stored cookies into the browser; returns how many were restored.
	pub async fn restore_session(&self) -> Result<usize> {
		let cookies = self.store.cookies();
		if cookies.is_empty() {
			debug!(target = "squirrel.session", "no stored session to restore");
			return Ok(0);
		}
		self.browser.add_cookies(cookies).await?;
		debug!(target = "squirrel.session", cookies = cookies.len(), "restored stored session");
		Ok(cookies.len())
	}

	pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
		LoginFlow::new(&self.browser, &self.endpoints)
			.login(&mut self.store, credentials)
			.await
	}

	pub async fn verify_session(&self) -> bool {
		SessionGuard::new(&self.browser, &self.endpoints).verify().await
	}

	pub async fn refresh_session(&mut self) -> Result<usize> {
		SessionGuard::new(&self.browser, &self.endpoints)
			.refresh(&mut self.store)
			.await
	}

	pub fn invalidate_session(&mut self) -> Result<()> {
		SessionGuard::new(&self.browser, &self.endpoints).invalidate(&mut self.store)
	}

	pub fn poller(&self, mode: PollMode) -> Poller<'_, B> {
		Poller::new(&self.browser, &self.endpoints, mode)
	}

	pub async fn close(self) -> Result<()> {
		self.browser.close().await
	}
}
