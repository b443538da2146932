//! Control and payload messages exchanged between service hosts.

use std::any::{Any, type_name};
use std::fmt;

use hearth_service::{ProviderId, ServiceError};

use crate::error::HostError;
use crate::queue::{MessageQueue, QueueSender};

/// Queue drained by one [`ServiceHost`](crate::ServiceHost).
pub type BasicMessageQueue = MessageQueue<BasicMessage>;

/// Producer handle for a [`BasicMessageQueue`].
pub type BasicMessageSender = QueueSender<BasicMessage>;

/// Messages understood by every service host.
pub enum BasicMessage {
	/// First message a managed thread posts to its own queue.
	ThreadInit,
	/// Asks the receiving host to stop after the current batch.
	ThreadShutdownBegin,
	/// A managed thread finished; carries its failure, if any.
	ThreadShutdown(Option<HostError>),
	/// One-way payload for an async service implementation.
	FireAndForget(FireAndForgetMessage),
}

impl BasicMessage {
	/// Short name for logs.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::ThreadInit => "ThreadInit",
			Self::ThreadShutdownBegin => "ThreadShutdownBegin",
			Self::ThreadShutdown(_) => "ThreadShutdown",
			Self::FireAndForget(_) => "FireAndForget",
		}
	}
}

impl fmt::Debug for BasicMessage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ThreadShutdown(failure) => f.debug_tuple("ThreadShutdown").field(failure).finish(),
			Self::FireAndForget(msg) => f.debug_tuple("FireAndForget").field(msg).finish(),
			other => f.write_str(other.kind()),
		}
	}
}

/// Type-erased payload addressed to one async service provider.
pub struct FireAndForgetMessage {
	target: ProviderId,
	payload: Box<dyn Any + Send>,
}

impl FireAndForgetMessage {
	/// Wraps `payload` for provider `target`.
	pub fn new<M: Send + 'static>(target: ProviderId, payload: M) -> Self {
		Self {
			target,
			payload: Box::new(payload),
		}
	}

	/// Provider the payload is addressed to.
	pub fn target(&self) -> ProviderId {
		self.target
	}

	/// Returns `true` if the payload is an `M`.
	pub fn is<M: 'static>(&self) -> bool {
		self.payload.is::<M>()
	}

	/// Takes the payload out as an `M`.
	pub fn decode<M: 'static>(self) -> Result<M, ServiceError> {
		let target = self.target;
		self.payload.downcast::<M>().map(|payload| *payload).map_err(|_| {
			ServiceError::failed(
				target.to_string(),
				format!("fire-and-forget payload is not a `{}`", type_name::<M>()),
			)
		})
	}
}

impl fmt::Debug for FireAndForgetMessage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FireAndForgetMessage").field("target", &self.target).finish_non_exhaustive()
	}
}
