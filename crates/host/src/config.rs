//! Host configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a [`HostConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or values.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Tunables for the service framework.
///
/// ```toml
/// message_wait_ms = 16
/// thread_name_prefix = "hearth"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
	/// Upper bound for one blocking wait of the main-thread host, in milliseconds.
	#[serde(default = "default_message_wait_ms")]
	pub message_wait_ms: u64,
	/// Prefix of managed thread names; the group name is appended.
	#[serde(default = "default_thread_name_prefix")]
	pub thread_name_prefix: String,
}

fn default_message_wait_ms() -> u64 {
	16
}

fn default_thread_name_prefix() -> String {
	"hearth".to_string()
}

impl Default for HostConfig {
	fn default() -> Self {
		Self {
			message_wait_ms: default_message_wait_ms(),
			thread_name_prefix: default_thread_name_prefix(),
		}
	}
}

impl HostConfig {
	/// Parses a configuration from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses a TOML configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Returns the main-thread wait bound.
	pub fn message_wait(&self) -> Duration {
		Duration::from_millis(self.message_wait_ms)
	}

	/// Returns the thread name used for group `group`.
	pub fn thread_name(&self, group: &str) -> String {
		format!("{}-{group}", self.thread_name_prefix)
	}
}
