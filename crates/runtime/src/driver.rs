//! `chromedriver` discovery and process lifecycle.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::process::{free_local_port, port_available};

const READY_ATTEMPTS: usize = 25;
const READY_POLL: Duration = Duration::from_millis(200);

/// Locates a `chromedriver` executable.
///
/// An explicit path wins; otherwise `CHROMEDRIVER` and then `PATH` are searched.
pub fn find_chromedriver(explicit: Option<&Path>) -> Result<PathBuf> {
	if let Some(path) = explicit {
		if path.exists() {
			return Ok(path.to_path_buf());
		}
		return which::which(path).map_err(|_| RuntimeError::DriverNotFound(path.display().to_string()));
	}

	if let Some(path) = std::env::var_os("CHROMEDRIVER").map(PathBuf::from) {
		if path.exists() {
			return Ok(path);
		}
	}

	let candidates: &[&str] = if cfg!(target_os = "windows") {
		&["chromedriver.exe", "chromedriver"]
	} else {
		&["chromedriver", "/usr/bin/chromedriver", "/usr/local/bin/chromedriver", "/snap/bin/chromium.chromedriver"]
	};

	for candidate in candidates {
		if candidate.starts_with('/') {
			if Path::new(candidate).exists() {
				return Ok(PathBuf::from(candidate));
			}
		} else if let Ok(path) = which::which(candidate) {
			return Ok(path);
		}
	}

	Err(RuntimeError::DriverNotFound(
		"chromedriver is not on PATH; install it or pass --driver <path>".into(),
	))
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
	value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
	#[serde(default)]
	ready: bool,
	#[serde(default)]
	message: String,
}

/// A running WebDriver server owned by this process.
///
/// The child is killed when the handle is dropped.
#[derive(Debug)]
pub struct DriverProcess {
	child: Child,
	port: u16,
}

impl DriverProcess {
	/// Spawns `executable` on `port` (or a free port) and waits for `/status` to report ready.
	pub async fn spawn(executable: &Path, port: Option<u16>) -> Result<Self> {
		let port = match port {
			Some(port) if !port_available(port) => {
				return Err(RuntimeError::Launch(format!("port {port} is already in use")));
			}
			Some(port) => port,
			None => free_local_port()?,
		};

		debug!(target = "squirrel.runtime", driver = %executable.display(), port, "spawning WebDriver");

		let mut cmd = Command::new(executable);
		cmd.arg(format!("--port={port}"))
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true);

		let child = cmd
			.spawn()
			.map_err(|e| RuntimeError::Launch(format!("failed to start {}: {e}", executable.display())))?;

		let mut process = Self { child, port };
		process.wait_ready().await?;
		Ok(process)
	}

	/// Base URL of the WebDriver HTTP endpoint.
	pub fn url(&self) -> String {
		format!("http://127.0.0.1:{}", self.port)
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	async fn wait_ready(&mut self) -> Result<()> {
		let client = reqwest::Client::builder().timeout(Duration::from_millis(400)).build()?;
		let status_url = format!("{}/status", self.url());
		let mut last_error = "endpoint not reachable".to_string();

		for _ in 0..READY_ATTEMPTS {
			tokio::time::sleep(READY_POLL).await;

			if let Ok(Some(status)) = self.child.try_wait() {
				return Err(RuntimeError::Launch(format!(
					"WebDriver exited before becoming ready (status: {status})"
				)));
			}

			match client.get(&status_url).send().await {
				Ok(response) => match response.json::<StatusEnvelope>().await {
					Ok(envelope) if envelope.value.ready => return Ok(()),
					Ok(envelope) => last_error = envelope.value.message,
					Err(e) => last_error = e.to_string(),
				},
				Err(e) => last_error = e.to_string(),
			}
		}

		Err(RuntimeError::Launch(format!(
			"WebDriver on port {} did not become ready: {last_error}",
			self.port
		)))
	}

	/// Stops the WebDriver server.
	pub async fn shutdown(mut self) -> Result<()> {
		if self.child.try_wait()?.is_none() {
			self.child.kill().await?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn explicit_missing_driver_is_reported() {
		let err = find_chromedriver(Some(Path::new("/definitely/missing/chromedriver"))).unwrap_err();
		assert!(matches!(err, RuntimeError::DriverNotFound(_)));
	}

	#[test]
	fn explicit_existing_path_is_used_as_is() {
		let exe = std::env::current_exe().unwrap();
		assert_eq!(find_chromedriver(Some(&exe)).unwrap(), exe);
	}

	#[test]
	fn status_payload_parses() {
		let status: StatusEnvelope =
			serde_json::from_str(r#"{"value":{"ready":true,"message":"ChromeDriver ready for new sessions.","build":{}}}"#).unwrap();
		assert!(status.value.ready);
	}
}
