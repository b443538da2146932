//! Service and factory contracts implemented by consumers.

use crate::{Result, ServiceCaps, ServiceId, ServiceInstance, ServiceProvider};

/// A long-lived object resolved through a [`ServiceProvider`].
///
/// Services live on the thread that launched them. Both hooks take `&self`;
/// services keep mutable state behind `Cell`/`RefCell`.
pub trait Service: 'static {
	/// Called once after construction, before the service is registered.
	///
	/// The provider may be cloned and kept for later lookups.
	fn link(&self, _provider: &ServiceProvider) -> Result<()> {
		Ok(())
	}

	/// Called once per host loop iteration, in registration order.
	fn update(&self) -> Result<()> {
		Ok(())
	}
}

/// Creates one service instance at launch time.
///
/// Factories are shared between threads: a managed group's factories are
/// invoked on the group's own thread.
pub trait ServiceFactory: Send + Sync {
	/// Human readable name used in logs and errors.
	fn name(&self) -> &str;

	/// Appends every interface the allocated instance provides. Must add at least one.
	fn fill_interface_types(&self, out: &mut Vec<ServiceId>);

	/// Launch behavior flags.
	fn flags(&self) -> ServiceCaps {
		ServiceCaps::empty()
	}

	/// Allocates the instance. `None` is only legal for
	/// [`ServiceCaps::AVAILABLE_ON_DEMAND`] factories.
	fn allocate(&self, provider: &ServiceProvider) -> Result<Option<ServiceInstance>>;
}

/// [`ServiceFactory`] backed by a closure.
pub struct FnServiceFactory<F> {
	name: String,
	interfaces: Vec<ServiceId>,
	flags: ServiceCaps,
	allocate: F,
}

impl<F> FnServiceFactory<F>
where
	F: Fn(&ServiceProvider) -> Result<Option<ServiceInstance>> + Send + Sync,
{
	/// Creates a factory with no interfaces and no flags.
	pub fn new(name: impl Into<String>, allocate: F) -> Self {
		Self {
			name: name.into(),
			interfaces: Vec::new(),
			flags: ServiceCaps::empty(),
			allocate,
		}
	}

	/// Declares interface `I` as provided.
	#[must_use]
	pub fn interface<I: ?Sized + 'static>(mut self) -> Self {
		self.interfaces.push(ServiceId::of::<I>());
		self
	}

	/// Sets the launch flags.
	#[must_use]
	pub fn with_flags(mut self, flags: ServiceCaps) -> Self {
		self.flags = flags;
		self
	}
}

impl<F> ServiceFactory for FnServiceFactory<F>
where
	F: Fn(&ServiceProvider) -> Result<Option<ServiceInstance>> + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	fn fill_interface_types(&self, out: &mut Vec<ServiceId>) {
		out.extend_from_slice(&self.interfaces);
	}

	fn flags(&self) -> ServiceCaps {
		self.flags
	}

	fn allocate(&self, provider: &ServiceProvider) -> Result<Option<ServiceInstance>> {
		(self.allocate)(provider)
	}
}
