use std::fmt;
use std::sync::Arc;

use crate::instance::InstanceHandle;
use crate::{ErasedInstance, ProviderId, Result, ServiceFactory, ServicePriority};

/// A service registered at composition time. Immutable once created.
#[derive(Clone)]
pub struct RegisteredServiceRecord {
	/// Unique provider id of this record.
	pub id: ProviderId,
	/// Factory allocating the instance.
	pub factory: Arc<dyn ServiceFactory>,
	/// Launch tier; higher launches first.
	pub priority: ServicePriority,
}

impl RegisteredServiceRecord {
	/// Creates a record.
	pub fn new(id: ProviderId, factory: Arc<dyn ServiceFactory>, priority: ServicePriority) -> Self {
		Self { id, factory, priority }
	}

	/// Returns the factory name.
	pub fn name(&self) -> &str {
		self.factory.name()
	}
}

impl fmt::Debug for RegisteredServiceRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RegisteredServiceRecord")
			.field("id", &self.id)
			.field("factory", &self.factory.name())
			.field("priority", &self.priority)
			.finish()
	}
}

/// Allocates a fresh instance of one interface on every call.
///
/// Allocators are shared by every thread, which is how asynchronous services
/// hand out thread-local proxies.
pub trait InstanceAllocator: Send + Sync {
	/// Allocates a new instance. The returned value holds an `Rc<I>` for the
	/// interface the allocator was registered under.
	fn allocate(&self) -> Result<ErasedInstance>;
}

/// Resolution strategy stored for one interface.
#[derive(Clone)]
pub enum LaunchKind {
	/// A launched thread-local instance.
	Instance(InstanceHandle),
	/// A factory producing a new instance per lookup.
	InstanceAllocator(Arc<dyn InstanceAllocator>),
	/// Several providers exist; see the multi-provider sequence.
	MultipleProviderTag,
}

/// One entry of the interface lookup maps.
#[derive(Clone)]
pub struct ServiceLaunchRecord {
	provider_id: ProviderId,
	kind: LaunchKind,
}

impl ServiceLaunchRecord {
	pub(crate) fn instance(provider_id: ProviderId, handle: InstanceHandle) -> Self {
		Self {
			provider_id,
			kind: LaunchKind::Instance(handle),
		}
	}

	/// Creates an allocator-backed record.
	pub fn allocator(provider_id: ProviderId, allocator: Arc<dyn InstanceAllocator>) -> Self {
		Self {
			provider_id,
			kind: LaunchKind::InstanceAllocator(allocator),
		}
	}

	pub(crate) fn multiple_provider_tag() -> Self {
		Self {
			provider_id: ProviderId::INVALID,
			kind: LaunchKind::MultipleProviderTag,
		}
	}

	/// Returns the provider id; [`ProviderId::INVALID`] for the multi-provider tag.
	pub fn provider_id(&self) -> ProviderId {
		self.provider_id
	}

	/// Returns the resolution strategy.
	pub fn kind(&self) -> &LaunchKind {
		&self.kind
	}

	/// Returns true for [`LaunchKind::MultipleProviderTag`].
	pub fn is_multiple_provider_tag(&self) -> bool {
		matches!(self.kind, LaunchKind::MultipleProviderTag)
	}
}

impl fmt::Debug for ServiceLaunchRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = match self.kind {
			LaunchKind::Instance(_) => "Instance",
			LaunchKind::InstanceAllocator(_) => "InstanceAllocator",
			LaunchKind::MultipleProviderTag => "MultipleProviderTag",
		};
		f.debug_struct("ServiceLaunchRecord").field("provider_id", &self.provider_id).field("kind", &kind).finish()
	}
}
