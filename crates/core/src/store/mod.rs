//! Persisted login session and account settings.
//!
//! The store lives at `~/.squirrel/config.json` by default. Loading never
//! fails: a missing or corrupt file degrades to an empty session. Saving goes
//! through a temporary sibling file and a rename, so readers only ever observe
//! a complete file.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use squirrel_protocol::StoredCookie;
use tracing::debug;

use crate::error::Result;


/// Environment variable overriding the store location.
pub const CONFIG_PATH_ENV: &str = "SQUIRREL_CONFIG";

/// On-disk format of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
	#[serde(default)]
	pub utorid: String,
	/// Placeholder kept for file compatibility; never written by squirrel.
	#[serde(default)]
	pub password: String,
	#[serde(default)]
	pub bypass_codes: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cookies: Option<Vec<StoredCookie>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_login: Option<String>,
}

/// File-backed session store.
#[derive(Debug)]
pub struct SessionStore {
	path: PathBuf,
	config: StoredConfig,
}

impl SessionStore {
	/// Default store location: `$SQUIRREL_CONFIG`, else `~/.squirrel/config.json`.
	pub fn default_path() -> Option<PathBuf> {
		if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
			return Some(PathBuf::from(path));
		}
		dirs::home_dir().map(|home| home.join(".squirrel").join("config.json"))
	}

	/// Opens the store at `path` and loads it.
	pub fn open(path: PathBuf) -> Self {
		let mut store = Self {
			path,
			config: StoredConfig::default(),
		};
		store.load();
		store
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn config(&self) -> &StoredConfig {
		&self.config
	}

	/// Re-reads the file, falling back to defaults when it is missing or unreadable.
	pub fn load(&mut self) -> &StoredConfig {
		self.config = match fs::read_to_string(&self.path) {
			Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
				debug!(target = "squirrel.session", path = %self.path.display(), error = %e, "unreadable config, using defaults");
				StoredConfig::default()
			}),
			Err(_) => {
				debug!(target = "squirrel.session", path = %self.path.display(), "no existing config found, using defaults");
				StoredConfig::default()
			}
		};
		&self.config
	}

	/// Writes the whole store atomically, creating the parent directory first.
	pub fn save(&self) -> Result<()> {
		let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
		if let Some(parent) = parent {
			fs::create_dir_all(parent)?;
		}

		let json = serde_json::to_string_pretty(&self.config)?;
		let tmp = self.tmp_path();
		{
			let mut file = File::create(&tmp)?;
			file.write_all(json.as_bytes())?;
			file.sync_all()?;
		}
		if let Err(e) = fs::rename(&tmp, &self.path) {
			let _ = fs::remove_file(&tmp);
			return Err(e.into());
		}

		debug!(target = "squirrel.session", path = %self.path.display(), "config saved");
		Ok(())
	}

	fn tmp_path(&self) -> PathBuf {
		let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "config.json".into());
		name.push(".tmp");
		self.path.with_file_name(name)
	}

	/// Stored cookies, empty when there is no session.
	pub fn cookies(&self) -> &[StoredCookie] {
		self.config.cookies.as_deref().unwrap_or_default()
	}

	pub fn has_session(&self) -> bool {
		!self.cookies().is_empty()
	}

	/// Replaces the cookie set, stamps the login time and persists.
	pub(crate) fn update_session(&mut self, cookies: Vec<StoredCookie>) -> Result<()> {
		let cookies = dedupe_cookies(cookies);
		let count = cookies.len();
		self.config.cookies = Some(cookies);
		self.config.last_login = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
		self.save()?;
		debug!(target = "squirrel.session", cookies = count, "session updated");
		Ok(())
	}

	/// Merges freshly read cookies into the stored set and persists.
	///
	/// Stored cookies for any domain present in `fresh` are replaced by it;
	/// cookies for other domains are kept.
	pub(crate) fn merge_session(&mut self, fresh: Vec<StoredCookie>) -> Result<()> {
		let domains: HashSet<&str> = fresh.iter().map(|c| c.domain.as_str()).collect();
		let mut merged: Vec<StoredCookie> = self
			.cookies()
			.iter()
			.filter(|c| !domains.contains(c.domain.as_str()))
			.cloned()
			.collect();
		let kept = merged.len();
		merged.extend(fresh);
		debug!(target = "squirrel.session", kept, "merging refreshed cookies");
		self.update_session(merged)
	}

	/// Drops cookies and the login time, keeping everything else, and persists.
	pub(crate) fn clear_session(&mut self) -> Result<()> {
		self.config.cookies = None;
		self.config.last_login = None;
		self.save()?;
		debug!(target = "squirrel.session", "session cleared");
		Ok(())
	}

	/// Records the account id; persisted with the next save.
	pub(crate) fn set_account(&mut self, utorid: &str) {
		self.config.utorid = utorid.to_string();
	}

	/// Next unused bypass code, if any.
	pub fn next_bypass_code(&self) -> Option<&str> {
		self.config.bypass_codes.first().map(String::as_str)
	}

	/// Removes a bypass code once it has been used; persisted with the next save.
	pub(crate) fn consume_bypass_code(&mut self, code: &str) {
		self.config.bypass_codes.retain(|c| c != code);
	}
}

/// Keeps the last record for each (name, domain, path), in first-seen order.
pub fn dedupe_cookies(cookies: Vec<StoredCookie>) -> Vec<StoredCookie> {
	let mut index: HashMap<(String, String, String), usize> = HashMap::new();
	let mut out: Vec<StoredCookie> = Vec::with_capacity(cookies.len());

	for cookie in cookies {
		let key = (cookie.name.clone(), cookie.domain.clone(), cookie.path.clone());
		match index.get(&key) {
			Some(&i) => out[i] = cookie,
			None => {
				index.insert(key, out.len());
				out.push(cookie);
			}
		}
	}

	out
}
