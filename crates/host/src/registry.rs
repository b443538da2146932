//! Registration front end assigning provider ids and group placement.

use std::sync::Arc;

use hearth_service::{ProviderId, RegisteredServiceRecord, ServiceFactory, ServicePriority};

use crate::async_service::AsyncProxyFactory;
use crate::error::{HostError, Result};
use crate::group::{AsyncServiceRecord, ServiceGroup, ServiceGroupId, ServiceGroupKind};

/// Collects service registrations before launch.
///
/// The registry starts with the main-thread group ([`ServiceGroupId::MAIN`]).
/// Provider ids are handed out sequentially across all groups.
#[derive(Debug)]
pub struct ServiceRegistry {
	groups: Vec<ServiceGroup>,
	next_provider: u32,
}

impl Default for ServiceRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ServiceRegistry {
	/// Creates a registry holding only the empty main-thread group.
	pub fn new() -> Self {
		Self {
			groups: vec![ServiceGroup::new(ServiceGroupId::MAIN, ServiceGroupKind::MainThread, "main")],
			next_provider: 0,
		}
	}

	/// Registers a thread-local service on the main thread.
	pub fn register(&mut self, factory: impl ServiceFactory + 'static, priority: ServicePriority) -> ProviderId {
		let record = self.record(Arc::new(factory), priority);
		let id = record.id;
		self.groups[0].thread_local_services.push(record);
		id
	}

	/// Adds a managed group hosted on its own thread.
	pub fn create_group(&mut self, name: impl Into<String>) -> ServiceGroupId {
		let id = ServiceGroupId(self.groups.len() as u32);
		self.groups.push(ServiceGroup::new(id, ServiceGroupKind::Managed, name));
		id
	}

	/// Registers a thread-local service in `group`.
	pub fn register_in(
		&mut self,
		group: ServiceGroupId,
		factory: impl ServiceFactory + 'static,
		priority: ServicePriority,
	) -> Result<ProviderId> {
		let index = self.group_index(group)?;
		let record = self.record(Arc::new(factory), priority);
		let id = record.id;
		self.groups[index].thread_local_services.push(record);
		Ok(id)
	}

	/// Registers an async service hosted by managed `group`.
	///
	/// `factory` must provide [`AsyncServiceImpl`](crate::AsyncServiceImpl);
	/// `proxy_factory` supplies the public interfaces seen by other threads.
	pub fn register_async(
		&mut self,
		group: ServiceGroupId,
		factory: impl ServiceFactory + 'static,
		proxy_factory: impl AsyncProxyFactory + 'static,
		priority: ServicePriority,
	) -> Result<ProviderId> {
		let index = self.group_index(group)?;
		if self.groups[index].is_main_thread() {
			return Err(HostError::InvalidGroup(format!(
				"async services need a managed group, `{}` runs on the main thread",
				self.groups[index].name
			)));
		}
		let record = self.record(Arc::new(factory), priority);
		let id = record.id;
		self.groups[index].async_services.push(AsyncServiceRecord {
			record,
			proxy_factory: Arc::new(proxy_factory),
		});
		Ok(id)
	}

	/// Registered groups, main-thread group first.
	pub fn groups(&self) -> &[ServiceGroup] {
		&self.groups
	}

	/// Consumes the registry into its groups.
	pub fn into_groups(self) -> Vec<ServiceGroup> {
		self.groups
	}

	fn group_index(&self, group: ServiceGroupId) -> Result<usize> {
		self.groups
			.iter()
			.position(|g| g.id == group)
			.ok_or_else(|| HostError::InvalidGroup(format!("{group} is not registered")))
	}

	fn record(&mut self, factory: Arc<dyn ServiceFactory>, priority: ServicePriority) -> RegisteredServiceRecord {
		let id = ProviderId(self.next_provider);
		self.next_provider += 1;
		RegisteredServiceRecord::new(id, factory, priority)
	}
}
