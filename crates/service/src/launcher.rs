//! Tiered service launch.
//!
//! Records launch from the highest priority to the lowest. Every tier gets a
//! provider snapshot taken when the tier starts, so a service can resolve
//! anything launched in a higher tier and nothing launched in its own or a
//! lower one. Which interfaces end up with several providers is decided up
//! front, so launch order never changes whether a lookup is ambiguous.

use std::cmp::Reverse;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::maps::OwnedService;
use crate::{
	RegisteredServiceRecord, Result, ServiceCaps, ServiceError, ServiceId, ServiceInstance, ServiceLaunchRecord, ServiceProvider,
	ServiceProviderImpl, TypeServiceMaps,
};

/// Instantiates registered services into one thread's [`TypeServiceMaps`].
#[derive(Default)]
pub struct ServiceLauncher {
	maps: TypeServiceMaps,
}

impl ServiceLauncher {
	/// Creates a launcher over `maps`, usually seeded from the global map.
	pub fn new(maps: TypeServiceMaps) -> Self {
		Self { maps }
	}

	/// Launches `services` and returns the provider owning them.
	///
	/// Failures of [`ServiceCaps::OPTIONAL`] records are logged and skipped;
	/// any other failure aborts the launch.
	pub fn launch(mut self, services: &[RegisteredServiceRecord]) -> Result<ServiceProviderImpl> {
		let interfaces: Vec<Vec<ServiceId>> = services.iter().map(interfaces_of).collect();
		let multi_provider = self.multi_provider_interfaces(&interfaces);

		let mut order: Vec<usize> = (0..services.len()).collect();
		order.sort_by_key(|&i| Reverse(services[i].priority));

		for tier in order.chunk_by(|&a, &b| services[a].priority == services[b].priority) {
			let priority = services[tier[0]].priority;
			tracing::debug!(%priority, services = tier.len(), "service.launch.tier");
			let provider = self.maps.provider_snapshot();

			for &index in tier {
				let record = &services[index];
				let flags = record.factory.flags();
				match launch_one(&provider, record, &interfaces[index], flags) {
					Ok(Some(instance)) => self.register(record, &interfaces[index], instance, &multi_provider),
					Ok(None) => {
						tracing::debug!(service = record.name(), provider = %record.id, "service.launch.on_demand_skipped");
					}
					Err(e) if flags.contains(ServiceCaps::OPTIONAL) => {
						tracing::warn!(service = record.name(), provider = %record.id, error = %e, "service.launch.optional_failed");
					}
					Err(e) => {
						tracing::error!(service = record.name(), provider = %record.id, error = %e, "service.launch.failed");
						return Err(e);
					}
				}
			}
		}

		Ok(self.maps.into_provider_impl())
	}

	fn multi_provider_interfaces(&self, interfaces: &[Vec<ServiceId>]) -> FxHashSet<ServiceId> {
		let mut counts: FxHashMap<ServiceId, usize> = FxHashMap::default();
		for id in self.maps.interfaces() {
			counts.insert(id, self.maps.provider_count(id));
		}
		for id in interfaces.iter().flatten() {
			*counts.entry(*id).or_default() += 1;
		}
		counts.into_iter().filter(|&(_, count)| count > 1).map(|(id, _)| id).collect()
	}

	fn register(&mut self, record: &RegisteredServiceRecord, interfaces: &[ServiceId], instance: ServiceInstance, multi_provider: &FxHashSet<ServiceId>) {
		let (service, bindings) = instance.into_parts();
		self.maps.push_owned(OwnedService {
			name: record.name().to_string(),
			provider_id: record.id,
			service,
		});
		for &id in interfaces {
			if let Some(binding) = bindings.iter().find(|b| b.id() == id) {
				let launch_record = ServiceLaunchRecord::instance(record.id, binding.handle());
				self.maps.add_provider_routed(id, launch_record, multi_provider.contains(&id));
			}
		}
		tracing::debug!(service = record.name(), provider = %record.id, interfaces = interfaces.len(), "service.launch");
	}
}

/// Reported interfaces of `record`, first occurrence wins.
fn interfaces_of(record: &RegisteredServiceRecord) -> Vec<ServiceId> {
	let mut reported = Vec::new();
	record.factory.fill_interface_types(&mut reported);
	let mut seen = FxHashSet::default();
	reported.retain(|id| seen.insert(*id));
	reported
}

fn launch_one(provider: &ServiceProvider, record: &RegisteredServiceRecord, interfaces: &[ServiceId], flags: ServiceCaps) -> Result<Option<ServiceInstance>> {
	if interfaces.is_empty() {
		return Err(invalid_factory(record, "reports no interfaces"));
	}

	let Some(instance) = record.factory.allocate(provider)? else {
		if flags.contains(ServiceCaps::AVAILABLE_ON_DEMAND) {
			return Ok(None);
		}
		return Err(invalid_factory(record, "returned no instance"));
	};

	if let Some(missing) = interfaces.iter().find(|id| !instance.provides(**id)) {
		return Err(invalid_factory(record, &format!("instance does not provide {missing}")));
	}

	instance.service().link(provider)?;
	Ok(Some(instance))
}

fn invalid_factory(record: &RegisteredServiceRecord, reason: &str) -> ServiceError {
	ServiceError::InvalidServiceFactory {
		service: record.name().to_string(),
		reason: reason.to_string(),
	}
}
