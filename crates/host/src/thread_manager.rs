//! Partitions service groups onto threads and wires async proxies between them.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use hearth_service::{GlobalServiceMap, ServiceError, ServiceLauncher, TypeServiceMaps};
use tokio_util::sync::CancellationToken;

use crate::async_service::{AsyncProxyAllocator, AsyncServiceSender};
use crate::config::HostConfig;
use crate::error::{HostError, Result};
use crate::group::{ServiceGroup, ServiceGroupId};
use crate::host::ServiceHost;
use crate::message::{BasicMessage, BasicMessageQueue, BasicMessageSender};
use crate::spawn::{panic_message, spawn_group_thread};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagerState {
	Waiting,
	PreparedServiceGroups,
	PreparedAsyncProxies,
	Running,
}

impl ManagerState {
	fn as_str(self) -> &'static str {
		match self {
			Self::Waiting => "Waiting",
			Self::PreparedServiceGroups => "PreparedServiceGroups",
			Self::PreparedAsyncProxies => "PreparedAsyncProxies",
			Self::Running => "Running",
		}
	}
}

struct ManagedThread {
	group: String,
	sender: BasicMessageSender,
	handle: Option<JoinHandle<()>>,
}

/// Everything a managed thread needs, moved onto it at spawn.
struct GroupThread {
	group: ServiceGroup,
	global: GlobalServiceMap,
	queue: BasicMessageQueue,
	owner: BasicMessageSender,
	cancel: CancellationToken,
}

/// Runs one thread per managed group and the main-thread host in place.
///
/// The phases must be called in order: [`prepare_service_groups`],
/// [`prepare_async_proxy_factories`], [`launch_threads`].
///
/// [`prepare_service_groups`]: Self::prepare_service_groups
/// [`prepare_async_proxy_factories`]: Self::prepare_async_proxy_factories
/// [`launch_threads`]: Self::launch_threads
pub struct ServiceThreadManager {
	config: HostConfig,
	state: ManagerState,
	groups: Vec<ServiceGroup>,
	queues: Vec<(ServiceGroupId, BasicMessageQueue)>,
	main_queue: Option<BasicMessageQueue>,
	main_sender: BasicMessageSender,
	cancel: CancellationToken,
	threads: Vec<ManagedThread>,
}

impl ServiceThreadManager {
	/// Creates a manager in the waiting state.
	pub fn new(config: HostConfig) -> Self {
		let main_queue = BasicMessageQueue::new();
		Self {
			config,
			state: ManagerState::Waiting,
			groups: Vec::new(),
			queues: Vec::new(),
			main_sender: main_queue.sender(),
			main_queue: Some(main_queue),
			cancel: CancellationToken::new(),
			threads: Vec::new(),
		}
	}

	/// Token shared by every host launched by this manager.
	pub fn cancellation_token(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Validates the groups and moves the main-thread group to the front.
	pub fn prepare_service_groups(&mut self, groups: Vec<ServiceGroup>) -> Result<()> {
		self.expect_state(ManagerState::Waiting)?;
		let (main, managed): (Vec<_>, Vec<_>) = groups.into_iter().partition(ServiceGroup::is_main_thread);
		match main.len() {
			0 => return Err(HostError::MainThreadGroupMissing),
			1 => {}
			count => return Err(HostError::MultipleMainThreadGroups(count)),
		}
		tracing::debug!(managed = managed.len(), "host.groups.prepared");
		self.groups = main.into_iter().chain(managed).collect();
		self.state = ManagerState::PreparedServiceGroups;
		Ok(())
	}

	/// Creates each managed group's queue and registers proxy allocators in `global`.
	pub fn prepare_async_proxy_factories(&mut self, global: &mut GlobalServiceMap) -> Result<()> {
		self.expect_state(ManagerState::PreparedServiceGroups)?;
		let mut interfaces = Vec::new();
		for group in &self.groups {
			if group.is_main_thread() {
				if let Some(service) = group.async_services.first() {
					return Err(HostError::InvalidGroup(format!(
						"async service `{}` registered on main thread group `{}`",
						service.record.name(),
						group.name
					)));
				}
				continue;
			}

			let queue = BasicMessageQueue::new();
			for service in &group.async_services {
				interfaces.clear();
				service.proxy_factory.fill_interface_types(&mut interfaces);
				if interfaces.is_empty() {
					return Err(ServiceError::InvalidServiceFactory {
						service: service.record.name().to_string(),
						reason: "proxy factory provides no interfaces".to_string(),
					}
					.into());
				}
				let sender = AsyncServiceSender::new(queue.sender(), service.provider_id());
				for &interface in &interfaces {
					let allocator =
						AsyncProxyAllocator::new(interface, sender.clone(), Arc::clone(&service.proxy_factory));
					global.add_allocator(interface, service.provider_id(), Arc::new(allocator));
				}
				tracing::debug!(
					group = %group.name,
					service = service.record.name(),
					provider = %service.provider_id(),
					interfaces = interfaces.len(),
					"host.async.proxy"
				);
			}
			self.queues.push((group.id, queue));
		}
		self.state = ManagerState::PreparedAsyncProxies;
		Ok(())
	}

	/// Launches the main-thread host in place, then spawns one thread per managed group.
	///
	/// The returned host must be driven by the caller. Threads that were
	/// already spawned keep running if a later spawn fails; call
	/// [`request_shutdown`](Self::request_shutdown) and [`join`](Self::join).
	pub fn launch_threads(&mut self, global: &GlobalServiceMap) -> Result<ServiceHost> {
		self.expect_state(ManagerState::PreparedAsyncProxies)?;
		let mut groups = std::mem::take(&mut self.groups).into_iter();
		let main = groups.next().ok_or(HostError::MainThreadGroupMissing)?;
		let main_queue = self.main_queue.take().ok_or(HostError::QueueClosed)?;

		let services = ServiceLauncher::new(TypeServiceMaps::from_global(global)).launch(&main.launch_records())?;
		let host = ServiceHost::new(main.name, main_queue, services, self.cancel.clone())?;
		self.state = ManagerState::Running;

		let mut queues = std::mem::take(&mut self.queues);
		for group in groups {
			if group.is_main_thread() {
				return Err(HostError::UnexpectedMainThreadGroup(group.name));
			}
			let index = queues
				.iter()
				.position(|(id, _)| *id == group.id)
				.ok_or_else(|| HostError::InvalidGroup(format!("no queue prepared for `{}`", group.name)))?;
			let (_, queue) = queues.swap_remove(index);
			let name = group.name.clone();
			let sender = queue.sender();
			let thread = GroupThread {
				group,
				global: global.clone(),
				queue,
				owner: self.main_sender.clone(),
				cancel: self.cancel.clone(),
			};
			let handle = spawn_group_thread(self.config.thread_name(&name), move || thread.run())
				.map_err(|error| HostError::ThreadSpawn {
					group: name.clone(),
					error,
				})?;
			tracing::debug!(group = %name, "host.thread.spawn");
			self.threads.push(ManagedThread {
				group: name,
				sender,
				handle: Some(handle),
			});
		}
		Ok(host)
	}

	/// Signals cancellation and wakes every managed host.
	pub fn request_shutdown(&self) {
		tracing::debug!(threads = self.threads.len(), "host.shutdown.request");
		self.cancel.cancel();
		for thread in &self.threads {
			if thread.sender.push(BasicMessage::ThreadShutdownBegin).is_err() {
				tracing::trace!(group = %thread.group, "host.shutdown.queue_closed");
			}
		}
	}

	/// Waits for every managed thread to exit.
	///
	/// Failures captured on a managed thread are reported to the main host
	/// through its queue. This only reports threads that died outside that path.
	pub fn join(&mut self) -> Result<()> {
		let mut first = None;
		for thread in &mut self.threads {
			let Some(handle) = thread.handle.take() else {
				continue;
			};
			if let Err(payload) = handle.join() {
				let failure = HostError::ThreadPanicked {
					group: thread.group.clone(),
					message: panic_message(payload.as_ref()),
				};
				tracing::error!(group = %thread.group, error = %failure, "host.thread.join");
				first.get_or_insert(failure);
			}
		}
		first.map_or(Ok(()), Err)
	}

	/// Number of spawned managed threads.
	pub fn thread_count(&self) -> usize {
		self.threads.len()
	}

	fn expect_state(&self, expected: ManagerState) -> Result<()> {
		if self.state == expected {
			Ok(())
		} else {
			Err(HostError::InvalidState {
				expected: expected.as_str(),
				actual: self.state.as_str(),
			})
		}
	}
}

impl Drop for ServiceThreadManager {
	fn drop(&mut self) {
		if self.threads.iter().any(|t| t.handle.is_some()) {
			self.request_shutdown();
			if let Err(error) = self.join() {
				tracing::warn!(%error, "host.drop.join_failed");
			}
		}
	}
}

impl fmt::Debug for ServiceThreadManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceThreadManager")
			.field("state", &self.state)
			.field("groups", &self.groups.len())
			.field("threads", &self.threads.len())
			.finish_non_exhaustive()
	}
}

impl GroupThread {
	fn run(self) {
		let Self {
			group,
			global,
			queue,
			owner,
			cancel,
		} = self;
		let name = group.name.clone();
		let inbox = queue.sender();

		let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<()> {
			inbox.push(BasicMessage::ThreadInit)?;
			let services = ServiceLauncher::new(TypeServiceMaps::from_global(&global)).launch(&group.launch_records())?;
			let mut host = ServiceHost::new(group.name.clone(), queue, services, cancel)?;
			host.run()
		}));

		let failure = match outcome {
			Ok(Ok(())) => None,
			Ok(Err(error)) => Some(HostError::ThreadFailed {
				group: name.clone(),
				source: Box::new(error),
			}),
			Err(payload) => Some(HostError::ThreadPanicked {
				group: name.clone(),
				message: panic_message(payload.as_ref()),
			}),
		};
		inbox.close();
		if let Some(failure) = &failure {
			tracing::error!(group = %name, error = %failure, "host.thread.failed");
		}
		if owner.push(BasicMessage::ThreadShutdown(failure)).is_err() {
			tracing::warn!(group = %name, "host.thread.owner_closed");
		}
	}
}
