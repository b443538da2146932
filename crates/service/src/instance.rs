//! Type-erased service instances and interface bindings.

use std::any::Any;
use std::rc::{Rc, Weak};

use crate::{Service, ServiceId};

/// One interface view of an instance: the strong `Rc<I>` plus its `Weak<I>`.
#[derive(Clone)]
pub(crate) struct InterfaceBinding {
	id: ServiceId,
	strong: Rc<dyn Any>,
	weak: Rc<dyn Any>,
}

impl InterfaceBinding {
	fn new<I: ?Sized + 'static>(instance: Rc<I>) -> Self {
		let weak: Weak<I> = Rc::downgrade(&instance);
		Self {
			id: ServiceId::of::<I>(),
			strong: Rc::new(instance),
			weak: Rc::new(weak),
		}
	}

	pub(crate) fn id(&self) -> ServiceId {
		self.id
	}

	pub(crate) fn handle(&self) -> InstanceHandle {
		InstanceHandle(Rc::clone(&self.weak))
	}

	pub(crate) fn into_erased(self) -> ErasedInstance {
		ErasedInstance(self.strong)
	}
}

/// Non-owning reference to a launched instance, stored in the lookup maps.
#[derive(Clone)]
pub struct InstanceHandle(Rc<dyn Any>);

impl InstanceHandle {
	pub(crate) fn resolve<I: ?Sized + 'static>(&self) -> Option<Rc<I>> {
		self.0.downcast_ref::<Weak<I>>()?.upgrade()
	}
}

/// Owning, type-erased reference to one interface view of an instance.
///
/// Produced by instance allocators; resolved back with [`ErasedInstance::downcast`].
#[derive(Clone)]
pub struct ErasedInstance(Rc<dyn Any>);

impl ErasedInstance {
	/// Returns the instance as interface `I`, if that is what it holds.
	pub fn downcast<I: ?Sized + 'static>(&self) -> Option<Rc<I>> {
		self.0.downcast_ref::<Rc<I>>().cloned()
	}
}

impl std::fmt::Debug for ErasedInstance {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("ErasedInstance")
	}
}

/// A freshly allocated service together with the interfaces it provides.
///
/// ```ignore
/// let logger = Rc::new(ConsoleLogger::default());
/// ServiceInstance::new(logger.clone()).provide::<dyn Logger>(logger)
/// ```
pub struct ServiceInstance {
	service: Rc<dyn Service>,
	bindings: Vec<InterfaceBinding>,
}

impl ServiceInstance {
	/// Wraps a service with no interface bindings yet.
	pub fn new<S: Service>(service: Rc<S>) -> Self {
		Self {
			service,
			bindings: Vec::new(),
		}
	}

	/// Binds interface `I`. Pass a clone of the service coerced to `Rc<I>`.
	#[must_use]
	pub fn provide<I: ?Sized + 'static>(mut self, instance: Rc<I>) -> Self {
		self.bindings.push(InterfaceBinding::new(instance));
		self
	}

	/// Returns true if interface `id` is bound.
	pub fn provides(&self, id: ServiceId) -> bool {
		self.bindings.iter().any(|b| b.id == id)
	}

	/// Returns the lifecycle view of the instance.
	pub fn service(&self) -> &Rc<dyn Service> {
		&self.service
	}

	pub(crate) fn into_parts(self) -> (Rc<dyn Service>, Vec<InterfaceBinding>) {
		(self.service, self.bindings)
	}
}

/// Interface bindings of a proxy object standing in for a remote service.
///
/// Proxies have no lifecycle of their own, so unlike [`ServiceInstance`]
/// they are not required to implement [`Service`].
#[derive(Default)]
pub struct ProxyInstance {
	bindings: Vec<InterfaceBinding>,
}

impl ProxyInstance {
	/// Creates an empty proxy binding set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds interface `I`.
	#[must_use]
	pub fn provide<I: ?Sized + 'static>(mut self, instance: Rc<I>) -> Self {
		self.bindings.push(InterfaceBinding::new(instance));
		self
	}

	/// Consumes the proxy, keeping only the view for interface `id`.
	pub fn into_erased(self, id: ServiceId) -> Option<ErasedInstance> {
		self.bindings.into_iter().find(|b| b.id == id).map(InterfaceBinding::into_erased)
	}
}
