//! Service groups: the unit of thread placement.

use std::fmt;
use std::sync::Arc;

use hearth_service::{ProviderId, RegisteredServiceRecord};

use crate::async_service::AsyncProxyFactory;

/// Identifier of a service group within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceGroupId(pub u32);

impl ServiceGroupId {
	/// The group whose host runs on the caller's thread.
	pub const MAIN: Self = Self(0);
}

impl fmt::Display for ServiceGroupId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "group#{}", self.0)
	}
}

/// Where a group's host runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceGroupKind {
	/// Hosted in place on the thread that launches the framework.
	MainThread,
	/// Hosted on a dedicated thread.
	Managed,
}

/// An async service: implementation record plus the factory for its proxies.
#[derive(Clone)]
pub struct AsyncServiceRecord {
	/// Launch record of the implementation factory.
	pub record: RegisteredServiceRecord,
	/// Builds caller-side proxies.
	pub proxy_factory: Arc<dyn AsyncProxyFactory>,
}

impl AsyncServiceRecord {
	/// Provider id shared by the implementation and its proxies.
	pub fn provider_id(&self) -> ProviderId {
		self.record.id
	}
}

impl fmt::Debug for AsyncServiceRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AsyncServiceRecord").field("record", &self.record).finish_non_exhaustive()
	}
}

/// Services launched together on one thread.
#[derive(Debug, Clone)]
pub struct ServiceGroup {
	/// Group identifier.
	pub id: ServiceGroupId,
	/// Main-thread or managed placement.
	pub kind: ServiceGroupKind,
	/// Name used for the thread and in logs.
	pub name: String,
	/// Services visible only on the group's thread.
	pub thread_local_services: Vec<RegisteredServiceRecord>,
	/// Services reachable from every thread through proxies.
	pub async_services: Vec<AsyncServiceRecord>,
}

impl ServiceGroup {
	/// Creates an empty group.
	pub fn new(id: ServiceGroupId, kind: ServiceGroupKind, name: impl Into<String>) -> Self {
		Self {
			id,
			kind,
			name: name.into(),
			thread_local_services: Vec::new(),
			async_services: Vec::new(),
		}
	}

	/// Returns `true` for the main-thread group.
	pub fn is_main_thread(&self) -> bool {
		self.kind == ServiceGroupKind::MainThread
	}

	/// Records launched on the group's thread: thread-local services, then async implementations.
	pub fn launch_records(&self) -> Vec<RegisteredServiceRecord> {
		self.thread_local_services
			.iter()
			.cloned()
			.chain(self.async_services.iter().map(|svc| svc.record.clone()))
			.collect()
	}
}
