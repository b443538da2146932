//! Per-thread message loop.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use hearth_service::{ServiceProvider, ServiceProviderImpl};
use tokio_util::sync::CancellationToken;

use crate::async_service::AsyncServiceImplHost;
use crate::error::{HostError, Result};
use crate::message::{BasicMessage, BasicMessageQueue, BasicMessageSender};

/// Lifecycle of a [`ServiceHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
	/// Processing messages.
	Running,
	/// The loop should exit; no further messages are processed.
	QuitRequested,
}

/// Owns one thread's services and drains that thread's queue.
pub struct ServiceHost {
	name: String,
	state: HostState,
	cancel: CancellationToken,
	queue: BasicMessageQueue,
	failures: VecDeque<HostError>,
	// Declared before `services` so dispatch references drop first.
	async_host: AsyncServiceImplHost,
	services: ServiceProviderImpl,
}

impl ServiceHost {
	/// Wraps launched services and their inbound queue.
	pub fn new(
		name: impl Into<String>,
		queue: BasicMessageQueue,
		services: ServiceProviderImpl,
		cancel: CancellationToken,
	) -> Result<Self> {
		let async_host = AsyncServiceImplHost::new(services.provider())?;
		Ok(Self {
			name: name.into(),
			state: HostState::Running,
			cancel,
			queue,
			failures: VecDeque::new(),
			async_host,
			services,
		})
	}

	/// Host name, used in logs.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Query handle for the services of this thread.
	pub fn provider(&self) -> &ServiceProvider {
		self.services.provider()
	}

	/// Producer handle for this host's queue.
	pub fn sender(&self) -> BasicMessageSender {
		self.queue.sender()
	}

	/// Current state.
	pub fn state(&self) -> HostState {
		self.state
	}

	/// Returns `true` once the loop should exit.
	pub fn is_quit_requested(&self) -> bool {
		self.state == HostState::QuitRequested
	}

	/// Stops the loop after the current batch.
	pub fn request_quit(&mut self) {
		if self.state != HostState::QuitRequested {
			tracing::debug!(host = %self.name, "host.quit_requested");
			self.state = HostState::QuitRequested;
		}
	}

	/// Number of messages waiting in the queue.
	pub fn pending(&self) -> usize {
		self.queue.len()
	}

	/// Runs one loop iteration: wait for a batch, dispatch it in FIFO order, update services.
	///
	/// `None` blocks until a message arrives; `Some(wait)` bounds the wait.
	/// A cancelled token or a closed queue moves the host to
	/// [`HostState::QuitRequested`] without touching queued messages.
	///
	/// A failing message does not stop the rest of its batch. Failures are
	/// returned one per call, oldest first, before any further waiting; services
	/// are only updated after a batch without failures.
	pub fn process_messages(&mut self, wait: Option<Duration>) -> Result<()> {
		if let Some(failure) = self.failures.pop_front() {
			return Err(failure);
		}
		if self.is_quit_requested() {
			return Ok(());
		}
		if self.cancel.is_cancelled() {
			self.request_quit();
			return Ok(());
		}

		let batch = match self.queue.pop_batch(wait) {
			Ok(batch) => batch,
			Err(HostError::QueueClosed) => {
				self.request_quit();
				return Ok(());
			}
			Err(e) => return Err(e),
		};

		for message in batch {
			if let Err(failure) = self.process_message(message) {
				self.failures.push_back(failure);
			}
		}
		if let Some(failure) = self.failures.pop_front() {
			return Err(failure);
		}
		self.services.update()?;
		Ok(())
	}

	/// Handles a single message.
	///
	/// A [`BasicMessage::ThreadShutdown`] carrying a failure re-raises it here.
	pub fn process_message(&mut self, message: BasicMessage) -> Result<()> {
		tracing::trace!(host = %self.name, kind = message.kind(), "host.message");
		match message {
			BasicMessage::ThreadInit => Ok(()),
			BasicMessage::ThreadShutdownBegin => {
				self.request_quit();
				Ok(())
			}
			BasicMessage::ThreadShutdown(None) => Ok(()),
			BasicMessage::ThreadShutdown(Some(failure)) => Err(failure),
			BasicMessage::FireAndForget(message) => self.async_host.dispatch(message),
		}
	}

	/// Blocks on the queue until quit is requested.
	pub fn run(&mut self) -> Result<()> {
		tracing::debug!(host = %self.name, services = self.services.owned_len(), "host.run");
		while !self.is_quit_requested() {
			self.process_messages(None)?;
		}
		tracing::debug!(host = %self.name, "host.stopped");
		Ok(())
	}

	/// Empties the queue after shutdown, returning the oldest failure not yet raised.
	///
	/// Only one failure can be returned; later ones are logged.
	pub fn drain_shutdown(&mut self) -> Result<()> {
		let mut failures = std::mem::take(&mut self.failures);
		for message in self.queue.try_pop_batch() {
			match message {
				BasicMessage::ThreadShutdown(Some(failure)) => failures.push_back(failure),
				other => tracing::trace!(host = %self.name, kind = other.kind(), "host.drain.discard"),
			}
		}
		let first = failures.pop_front();
		for failure in failures {
			tracing::error!(host = %self.name, error = %failure, "host.drain.failure");
		}
		first.map_or(Ok(()), Err)
	}
}

impl fmt::Debug for ServiceHost {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceHost")
			.field("name", &self.name)
			.field("state", &self.state)
			.field("services", &self.services)
			.field("async_services", &self.async_host.len())
			.field("pending_failures", &self.failures.len())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests;
