//! One-call setup and teardown around [`ServiceThreadManager`].

use hearth_service::{GlobalServiceMap, ServiceProvider};

use crate::config::HostConfig;
use crate::error::Result;
use crate::host::ServiceHost;
use crate::registry::ServiceRegistry;
use crate::thread_manager::ServiceThreadManager;

/// A running set of service groups, driven from the caller's thread.
///
/// ```no_run
/// # use hearth_host::{HostConfig, ServiceFramework, ServiceRegistry};
/// # fn main() -> hearth_host::Result<()> {
/// let mut framework = ServiceFramework::launch(ServiceRegistry::new(), HostConfig::default())?;
/// while !framework.is_quit_requested() {
/// 	framework.process_messages()?;
/// 	# framework.request_quit();
/// }
/// framework.shutdown()
/// # }
/// ```
#[derive(Debug)]
pub struct ServiceFramework {
	config: HostConfig,
	host: ServiceHost,
	manager: ServiceThreadManager,
}

impl ServiceFramework {
	/// Prepares the registered groups, spawns managed threads and launches the main host.
	pub fn launch(registry: ServiceRegistry, config: HostConfig) -> Result<Self> {
		let mut manager = ServiceThreadManager::new(config.clone());
		manager.prepare_service_groups(registry.into_groups())?;
		let mut global = GlobalServiceMap::new();
		manager.prepare_async_proxy_factories(&mut global)?;
		let host = manager.launch_threads(&global)?;
		tracing::info!(threads = manager.thread_count(), proxies = global.len(), "host.framework.launched");
		Ok(Self { config, host, manager })
	}

	/// Services reachable from the main thread.
	pub fn provider(&self) -> &ServiceProvider {
		self.host.provider()
	}

	/// The main-thread host.
	pub fn host(&mut self) -> &mut ServiceHost {
		&mut self.host
	}

	/// Runs one main loop iteration with the configured bounded wait.
	pub fn process_messages(&mut self) -> Result<()> {
		self.host.process_messages(Some(self.config.message_wait()))
	}

	/// Returns `true` once the main loop should exit.
	pub fn is_quit_requested(&self) -> bool {
		self.host.is_quit_requested()
	}

	/// Asks every host, including the main one, to stop.
	pub fn request_quit(&self) {
		self.manager.request_shutdown();
	}

	/// Stops and joins managed threads, then drops the main-thread services.
	///
	/// Returns the first failure reported by a managed thread that the main
	/// loop has not already surfaced.
	pub fn shutdown(self) -> Result<()> {
		let Self {
			mut host, mut manager, ..
		} = self;
		manager.request_shutdown();
		let joined = manager.join();
		let reported = host.drain_shutdown();
		drop(host);
		tracing::info!("host.framework.stopped");
		reported.and(joined)
	}
}
