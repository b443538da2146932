//! Error types for hosts and the thread manager.

use hearth_service::ServiceError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while preparing, launching or running service hosts.
#[derive(Debug, Error)]
pub enum HostError {
	/// A thread manager phase was invoked out of order.
	#[error("invalid thread manager state: expected {expected}, found {actual}")]
	InvalidState {
		/// State the call requires.
		expected: &'static str,
		/// Current state.
		actual: &'static str,
	},

	/// No main-thread service group was supplied.
	#[error("no main thread service group")]
	MainThreadGroupMissing,

	/// More than one main-thread service group was supplied.
	#[error("expected exactly one main thread service group, found {0}")]
	MultipleMainThreadGroups(usize),

	/// A main-thread group reached the managed-thread launch stage.
	#[error("main thread service group `{0}` cannot run on a managed thread")]
	UnexpectedMainThreadGroup(String),

	/// A group id or group layout is not valid for the requested operation.
	#[error("invalid service group: {0}")]
	InvalidGroup(String),

	/// The OS refused to spawn a group thread.
	#[error("failed to spawn thread for group `{group}`: {error}")]
	ThreadSpawn {
		/// Group that was being started.
		group: String,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A managed group failed while launching or running its services.
	#[error("service group `{group}` failed: {source}")]
	ThreadFailed {
		/// Failing group.
		group: String,
		/// What went wrong on that thread.
		source: Box<HostError>,
	},

	/// A managed group's thread panicked.
	#[error("service group `{group}` panicked: {message}")]
	ThreadPanicked {
		/// Failing group.
		group: String,
		/// Panic payload text.
		message: String,
	},

	/// The target message queue no longer accepts messages.
	#[error("message queue is closed")]
	QueueClosed,

	/// A service failed to resolve, launch or update.
	#[error(transparent)]
	Service(#[from] ServiceError),

	/// Host configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, HostError>;
