//! Blocking multi-producer message queue owned by one service host.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{HostError, Result};

struct QueueState<T> {
	queue: VecDeque<T>,
	closed: bool,
}

struct QueueInner<T> {
	state: Mutex<QueueState<T>>,
	available: Condvar,
}

/// Receiving end of a host queue. Exactly one host drains it.
pub struct MessageQueue<T> {
	inner: Arc<QueueInner<T>>,
}

/// Cloneable producer handle for a [`MessageQueue`].
pub struct QueueSender<T> {
	inner: Arc<QueueInner<T>>,
}

impl<T> Clone for QueueSender<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Default for MessageQueue<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> MessageQueue<T> {
	/// Creates an empty open queue.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(QueueInner {
				state: Mutex::new(QueueState {
					queue: VecDeque::new(),
					closed: false,
				}),
				available: Condvar::new(),
			}),
		}
	}

	/// Returns a producer handle.
	pub fn sender(&self) -> QueueSender<T> {
		QueueSender {
			inner: Arc::clone(&self.inner),
		}
	}

	/// Removes every queued message, blocking first while the queue is empty.
	///
	/// `None` waits until a message arrives or the queue closes. `Some(wait)`
	/// bounds the wait and yields an empty batch on timeout. Once the queue is
	/// closed and drained this returns [`HostError::QueueClosed`].
	pub fn pop_batch(&self, wait: Option<Duration>) -> Result<Vec<T>> {
		let deadline = wait.map(|wait| Instant::now() + wait);
		let mut state = self.inner.state.lock();
		while state.queue.is_empty() {
			if state.closed {
				return Err(HostError::QueueClosed);
			}
			match deadline {
				None => self.inner.available.wait(&mut state),
				Some(deadline) => {
					if self.inner.available.wait_until(&mut state, deadline).timed_out() {
						break;
					}
				}
			}
		}
		Ok(state.queue.drain(..).collect())
	}

	/// Removes every queued message without blocking.
	pub fn try_pop_batch(&self) -> Vec<T> {
		self.inner.state.lock().queue.drain(..).collect()
	}

	/// Closes the queue. Queued messages can still be drained.
	pub fn close(&self) {
		close(&self.inner);
	}

	/// Number of queued messages.
	pub fn len(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	/// Returns `true` if nothing is queued.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T> QueueSender<T> {
	/// Appends `msg` and wakes the consumer.
	pub fn push(&self, msg: T) -> Result<()> {
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(HostError::QueueClosed);
		}
		state.queue.push_back(msg);
		drop(state);
		self.inner.available.notify_one();
		Ok(())
	}

	/// Closes the queue. Queued messages can still be drained.
	pub fn close(&self) {
		close(&self.inner);
	}

	/// Returns `true` once the queue rejects new messages.
	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}
}

fn close<T>(inner: &QueueInner<T>) {
	inner.state.lock().closed = true;
	inner.available.notify_all();
}
