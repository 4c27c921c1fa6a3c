use std::path::PathBuf;

use squirrel::{AcornClient, LaunchOptions, SessionStore, WebDriverBrowser};

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
	pub config_path: PathBuf,
	pub launch: LaunchOptions,
}

impl CommandContext {
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let config_path = cli
			.config
			.clone()
			.or_else(SessionStore::default_path)
			.ok_or(CliError::NoConfigPath)?;

		Ok(Self {
			config_path,
			launch: LaunchOptions {
				driver: cli.driver.clone(),
				port: cli.driver_port,
				headless: cli.headless,
			},
		})
	}

	pub fn open_store(&self) -> SessionStore {
		SessionStore::open(self.config_path.clone())
	}

	/// Launches the browser and pairs it with `store`.
	pub async fn connect(&self, store: SessionStore) -> Result<AcornClient<WebDriverBrowser>> {
		let browser = WebDriverBrowser::launch(&self.launch).await?;
		Ok(AcornClient::new(browser, store))
	}
}
