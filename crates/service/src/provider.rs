//! Service resolution surface.

use std::ops::Deref;
use std::rc::Rc;

use crate::maps::{OwnedService, ServiceLookup};
use crate::record::LaunchKind;
use crate::{ProviderId, Result, ServiceError, ServiceId, ServiceLaunchRecord};

/// Cheap, cloneable query handle over one thread's lookup maps.
///
/// Services may keep a clone obtained in [`Service::link`](crate::Service::link).
/// A provider only holds non-owning references to the instances it resolves.
#[derive(Clone, Default)]
pub struct ServiceProvider {
	lookup: Rc<ServiceLookup>,
}

impl ServiceProvider {
	pub(crate) fn from_lookup(lookup: ServiceLookup) -> Self {
		Self { lookup: Rc::new(lookup) }
	}

	/// Resolves interface `I`, returning `None` when it has no provider.
	///
	/// Ambiguous lookups still fail with [`ServiceError::MultipleProviders`].
	pub fn try_get<I: ?Sized + 'static>(&self) -> Result<Option<Rc<I>>> {
		let id = ServiceId::of::<I>();
		match self.lookup.get(id) {
			None => Ok(None),
			Some(record) => resolve::<I>(id, record).map(Some),
		}
	}

	/// Resolves interface `I`.
	///
	/// Fails with [`ServiceError::UnknownService`] when nothing provides it and
	/// with [`ServiceError::MultipleProviders`] when several providers compete.
	pub fn get<I: ?Sized + 'static>(&self) -> Result<Rc<I>> {
		self.try_get::<I>()?.ok_or_else(|| ServiceError::UnknownService(ServiceId::of::<I>()))
	}

	/// Resolves the provider `provider` of interface `I`, if it exists.
	pub fn try_get_from<I: ?Sized + 'static>(&self, provider: ProviderId) -> Result<Option<Rc<I>>> {
		let id = ServiceId::of::<I>();
		match self.lookup.providers(id).iter().find(|r| r.provider_id() == provider) {
			None => Ok(None),
			Some(record) => resolve::<I>(id, record).map(Some),
		}
	}

	/// Resolves the provider `provider` of interface `I`.
	///
	/// Fails with [`ServiceError::UnknownService`] when that provider does not implement `I`.
	pub fn get_from<I: ?Sized + 'static>(&self, provider: ProviderId) -> Result<Rc<I>> {
		self.try_get_from::<I>(provider)?.ok_or_else(|| {
			let id = ServiceId::of::<I>();
			tracing::debug!(interface = %id, %provider, "service.get_from.unknown");
			ServiceError::UnknownService(id)
		})
	}

	/// Appends every provider of interface `I` to `out`, in registration order.
	pub fn get_all<I: ?Sized + 'static>(&self, out: &mut Vec<Rc<I>>) -> Result<()> {
		let id = ServiceId::of::<I>();
		for record in self.lookup.providers(id) {
			out.push(resolve::<I>(id, record)?);
		}
		Ok(())
	}

	/// Returns the provider ids registered for `id`, in registration order.
	pub fn provider_ids(&self, id: ServiceId) -> Vec<ProviderId> {
		self.lookup.providers(id).iter().map(ServiceLaunchRecord::provider_id).collect()
	}

	/// Returns true if at least one provider of `id` is registered.
	pub fn contains(&self, id: ServiceId) -> bool {
		self.lookup.get(id).is_some()
	}
}

fn resolve<I: ?Sized + 'static>(id: ServiceId, record: &ServiceLaunchRecord) -> Result<Rc<I>> {
	match record.kind() {
		LaunchKind::Instance(handle) => handle.resolve::<I>().ok_or(ServiceError::UnknownService(id)),
		LaunchKind::InstanceAllocator(allocator) => {
			let instance = allocator.allocate()?;
			instance.downcast::<I>().ok_or_else(|| ServiceError::InvalidServiceFactory {
				service: id.name().to_string(),
				reason: format!("allocator for provider {} produced a different interface", record.provider_id()),
			})
		}
		LaunchKind::MultipleProviderTag => Err(ServiceError::MultipleProviders(id)),
	}
}

/// Owner of one thread's launched services plus the provider resolving them.
///
/// Dropping it destroys the owned services in reverse launch order.
pub struct ServiceProviderImpl {
	provider: ServiceProvider,
	owned: Vec<OwnedService>,
}

impl ServiceProviderImpl {
	pub(crate) fn new(provider: ServiceProvider, owned: Vec<OwnedService>) -> Self {
		Self { provider, owned }
	}

	/// Returns the query handle.
	pub fn provider(&self) -> &ServiceProvider {
		&self.provider
	}

	/// Updates every owned service in launch order, stopping at the first failure.
	pub fn update(&self) -> Result<()> {
		for owned in &self.owned {
			owned.service.update().inspect_err(|e| {
				tracing::warn!(service = %owned.name, provider = %owned.provider_id, error = %e, "service.update.failed");
			})?;
		}
		Ok(())
	}

	/// Returns the number of owned services.
	pub fn owned_len(&self) -> usize {
		self.owned.len()
	}

	/// Returns the names of owned services in launch order.
	pub fn owned_names(&self) -> impl Iterator<Item = &str> {
		self.owned.iter().map(|o| o.name.as_str())
	}
}

impl Deref for ServiceProviderImpl {
	type Target = ServiceProvider;

	fn deref(&self) -> &ServiceProvider {
		&self.provider
	}
}

impl Drop for ServiceProviderImpl {
	fn drop(&mut self) {
		while let Some(owned) = self.owned.pop() {
			tracing::trace!(service = %owned.name, provider = %owned.provider_id, "service.drop");
			drop(owned);
		}
	}
}

impl std::fmt::Debug for ServiceProviderImpl {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ServiceProviderImpl").field("owned", &self.owned.len()).finish()
	}
}
