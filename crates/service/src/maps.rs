//! Interface lookup maps.
//!
//! [`TypeServiceMaps`] is built once per thread while services launch and is
//! read-only afterwards. An interface maps either to one launch record or to
//! [`LaunchKind::MultipleProviderTag`](crate::LaunchKind::MultipleProviderTag), in which case every competing provider
//! lives in the multi-provider sequence for that interface.

use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{InstanceAllocator, ProviderId, Service, ServiceId, ServiceLaunchRecord, ServiceProvider, ServiceProviderImpl};

/// The two lookup tables shared by every provider snapshot.
#[derive(Clone, Default)]
pub(crate) struct ServiceLookup {
	interface_to_service: FxHashMap<ServiceId, ServiceLaunchRecord>,
	interface_multiple_services: FxHashMap<ServiceId, Vec<ServiceLaunchRecord>>,
}

impl ServiceLookup {
	pub(crate) fn get(&self, id: ServiceId) -> Option<&ServiceLaunchRecord> {
		self.interface_to_service.get(&id)
	}

	pub(crate) fn multiple(&self, id: ServiceId) -> &[ServiceLaunchRecord] {
		self.interface_multiple_services.get(&id).map(Vec::as_slice).unwrap_or_default()
	}

	/// Returns every concrete provider record of `id`, in registration order.
	pub(crate) fn providers(&self, id: ServiceId) -> &[ServiceLaunchRecord] {
		match self.interface_to_service.get(&id) {
			None => &[],
			Some(record) if record.is_multiple_provider_tag() => self.multiple(id),
			Some(record) => std::slice::from_ref(record),
		}
	}
}

/// A uniquely owned service instance on the owning thread.
pub(crate) struct OwnedService {
	pub(crate) name: String,
	pub(crate) provider_id: ProviderId,
	pub(crate) service: Rc<dyn Service>,
}

/// Per-thread interface lookup plus the instances owned by that thread.
#[derive(Default)]
pub struct TypeServiceMaps {
	lookup: ServiceLookup,
	owned_unique_services: Vec<OwnedService>,
}

impl TypeServiceMaps {
	/// Creates empty maps.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a thread's maps seeded with the shared allocators.
	pub fn from_global(global: &GlobalServiceMap) -> Self {
		let mut maps = Self::new();
		for entry in &global.entries {
			maps.add_provider(entry.id, ServiceLaunchRecord::allocator(entry.provider_id, Arc::clone(&entry.allocator)));
		}
		maps
	}

	/// Registers `record` as a provider of `id`.
	///
	/// The first provider is stored directly. A second provider promotes the
	/// entry to a multi-provider sequence holding both, later ones append.
	pub fn add_provider(&mut self, id: ServiceId, record: ServiceLaunchRecord) {
		self.add_provider_routed(id, record, false);
	}

	/// Like [`Self::add_provider`], but when `multi_provider` is set the first
	/// provider already goes into a one-element sequence.
	pub(crate) fn add_provider_routed(&mut self, id: ServiceId, record: ServiceLaunchRecord, multi_provider: bool) {
		let lookup = &mut self.lookup;
		let existing = lookup.interface_to_service.get(&id).map(ServiceLaunchRecord::is_multiple_provider_tag);
		match existing {
			None if multi_provider => {
				lookup.interface_multiple_services.insert(id, vec![record]);
				lookup.interface_to_service.insert(id, ServiceLaunchRecord::multiple_provider_tag());
			}
			None => {
				lookup.interface_to_service.insert(id, record);
			}
			Some(true) => {
				lookup.interface_multiple_services.entry(id).or_default().push(record);
			}
			Some(false) => {
				tracing::trace!(interface = %id, "service.maps.promote");
				let mut providers = Vec::with_capacity(2);
				providers.extend(lookup.interface_to_service.insert(id, ServiceLaunchRecord::multiple_provider_tag()));
				providers.push(record);
				lookup.interface_multiple_services.insert(id, providers);
			}
		}
	}

	/// Returns true if at least one provider of `id` is registered.
	pub fn contains(&self, id: ServiceId) -> bool {
		self.lookup.interface_to_service.contains_key(&id)
	}

	/// Returns the lookup entry of `id`.
	pub fn get(&self, id: ServiceId) -> Option<&ServiceLaunchRecord> {
		self.lookup.get(id)
	}

	/// Returns the multi-provider sequence of `id`; empty for single providers.
	pub fn multiple_providers(&self, id: ServiceId) -> &[ServiceLaunchRecord] {
		self.lookup.multiple(id)
	}

	/// Returns the number of providers registered for `id`.
	pub fn provider_count(&self, id: ServiceId) -> usize {
		self.lookup.providers(id).len()
	}

	/// Returns true if `id` resolves to the multi-provider tag.
	pub fn is_multi_provider(&self, id: ServiceId) -> bool {
		self.get(id).is_some_and(ServiceLaunchRecord::is_multiple_provider_tag)
	}

	/// Returns every interface with at least one provider.
	pub fn interfaces(&self) -> impl Iterator<Item = ServiceId> + '_ {
		self.lookup.interface_to_service.keys().copied()
	}

	/// Returns the number of owned instances.
	pub fn owned_len(&self) -> usize {
		self.owned_unique_services.len()
	}

	pub(crate) fn push_owned(&mut self, owned: OwnedService) {
		self.owned_unique_services.push(owned);
	}

	/// Builds a read-only provider over the current lookup state.
	pub fn provider_snapshot(&self) -> ServiceProvider {
		ServiceProvider::from_lookup(self.lookup.clone())
	}

	/// Hands the maps to a provider that owns the launched instances.
	pub fn into_provider_impl(mut self) -> ServiceProviderImpl {
		let lookup = std::mem::take(&mut self.lookup);
		let owned = std::mem::take(&mut self.owned_unique_services);
		ServiceProviderImpl::new(ServiceProvider::from_lookup(lookup), owned)
	}

	#[cfg(test)]
	pub(crate) fn check_invariant(&self) {
		let lookup = &self.lookup;
		for (id, record) in &lookup.interface_to_service {
			let multi = lookup.interface_multiple_services.get(id);
			assert_eq!(
				record.is_multiple_provider_tag(),
				multi.is_some_and(|m| !m.is_empty()),
				"tag/sequence mismatch for {id}"
			);
		}
		for id in lookup.interface_multiple_services.keys() {
			assert!(lookup.interface_to_service.get(id).is_some_and(ServiceLaunchRecord::is_multiple_provider_tag));
		}
	}
}

impl Drop for TypeServiceMaps {
	fn drop(&mut self) {
		while let Some(owned) = self.owned_unique_services.pop() {
			tracing::trace!(service = %owned.name, provider = %owned.provider_id, "service.maps.drop");
			drop(owned);
		}
	}
}

struct GlobalEntry {
	id: ServiceId,
	provider_id: ProviderId,
	allocator: Arc<dyn InstanceAllocator>,
}

impl Clone for GlobalEntry {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			provider_id: self.provider_id,
			allocator: Arc::clone(&self.allocator),
		}
	}
}

/// Thread-safe entries visible on every thread.
///
/// Only instance allocators can be shared; each thread copies them into its
/// own [`TypeServiceMaps`] before launching its services.
#[derive(Clone, Default)]
pub struct GlobalServiceMap {
	entries: Vec<GlobalEntry>,
}

impl GlobalServiceMap {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers an allocator as a provider of `id`.
	pub fn add_allocator(&mut self, id: ServiceId, provider_id: ProviderId, allocator: Arc<dyn InstanceAllocator>) {
		self.entries.push(GlobalEntry { id, provider_id, allocator });
	}

	/// Returns the number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if the map has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Returns `(interface, provider)` pairs in registration order.
	pub fn iter(&self) -> impl Iterator<Item = (ServiceId, ProviderId)> + '_ {
		self.entries.iter().map(|e| (e.id, e.provider_id))
	}
}

impl std::fmt::Debug for GlobalServiceMap {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}
