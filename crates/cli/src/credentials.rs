//! Where login credentials come from: environment (including `.env`), the
//! stored account id, then an interactive prompt.

use std::io::{self, BufRead, IsTerminal, Write};

use squirrel::Credentials;
use tracing::info;

use crate::error::{CliError, Result};

pub const UTORID_ENV: &str = "UTORID";
pub const PASSWORD_ENV: &str = "PASSWORD";

/// Credentials known without asking the user.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KnownCredentials {
	pub utorid: Option<String>,
	pub password: Option<String>,
}

impl KnownCredentials {
	pub fn gather(env_utorid: Option<String>, env_password: Option<String>, stored_utorid: &str) -> Self {
		Self {
			utorid: non_empty(env_utorid).or_else(|| non_empty(Some(stored_utorid.to_string()))),
			password: non_empty(env_password),
		}
	}

	pub fn from_env(stored_utorid: &str) -> Self {
		Self::gather(
			std::env::var(UTORID_ENV).ok(),
			std::env::var(PASSWORD_ENV).ok(),
			stored_utorid,
		)
	}

	pub fn is_complete(&self) -> bool {
		self.utorid.is_some() && self.password.is_some()
	}
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolves credentials, prompting for whatever is still missing.
pub async fn resolve(stored_utorid: &str) -> Result<Credentials> {
	let known = KnownCredentials::from_env(stored_utorid);
	if known.is_complete() {
		info!(target = "squirrel", "Using UTORid and password from environment variables");
	} else {
		info!(target = "squirrel", "No UTORid or password provided, prompting user");
	}

	let KnownCredentials { utorid, password } = known;
	let utorid = match utorid {
		Some(utorid) => utorid,
		None => prompt("Enter your UTORid: ", false).await?,
	};
	let password = match password {
		Some(password) => password,
		None => prompt("Enter your password: ", true).await?,
	};

	let credentials = Credentials::new(utorid.trim(), password);
	if !credentials.is_complete() {
		return Err(CliError::MissingCredentials);
	}
	Ok(credentials)
}

async fn prompt(label: &'static str, hidden: bool) -> Result<String> {
	let answer = tokio::task::spawn_blocking(move || {
		if hidden && io::stdin().is_terminal() {
			read_hidden(label)
		} else {
			read_line(label)
		}
	})
	.await
	.map_err(|e| io::Error::other(e.to_string()))??;
	Ok(answer)
}

fn read_line(label: &str) -> io::Result<String> {
	eprint!("{label}");
	io::stderr().flush()?;
	let mut line = String::new();
	io::stdin().lock().read_line(&mut line)?;
	Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_hidden(label: &str) -> io::Result<String> {
	use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
	use crossterm::terminal;

	eprint!("{label}");
	io::stderr().flush()?;

	terminal::enable_raw_mode()?;
	let read = (|| -> io::Result<String> {
		let mut value = String::new();
		loop {
			if let Event::Key(KeyEvent {
				code,
				modifiers,
				kind: KeyEventKind::Press,
				..
			}) = event::read()?
			{
				match code {
					KeyCode::Enter => return Ok(value),
					KeyCode::Backspace => {
						value.pop();
					}
					KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
						return Err(io::Error::new(io::ErrorKind::Interrupted, "prompt cancelled"));
					}
					KeyCode::Char(c) => value.push(c),
					_ => {}
				}
			}
		}
	})();
	terminal::disable_raw_mode()?;
	eprintln!();
	read
}
