bitflags::bitflags! {
	/// Launch behavior flags reported by a service factory.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct ServiceCaps: u32 {
		/// Launch failures are logged and skipped instead of aborting startup.
		const OPTIONAL = 1 << 0;
		/// The factory may decline to allocate; the interface then stays unresolved.
		const AVAILABLE_ON_DEMAND = 1 << 1;
	}
}

/// Startup priority of a registered service. Higher launches first.
///
/// A service may only depend on services with a strictly higher priority;
/// equal priorities launch in registration order and cannot see each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServicePriority(pub i32);

impl ServicePriority {
	pub const HIGHEST: ServicePriority = ServicePriority(1_000_000);
	pub const HIGH: ServicePriority = ServicePriority(1_000);
	pub const NORMAL: ServicePriority = ServicePriority(0);
	pub const LOW: ServicePriority = ServicePriority(-1_000);
	pub const LOWEST: ServicePriority = ServicePriority(-1_000_000);

	/// Returns the raw priority value.
	#[inline]
	pub const fn value(self) -> i32 {
		self.0
	}
}

impl From<i32> for ServicePriority {
	fn from(value: i32) -> Self {
		Self(value)
	}
}

impl std::fmt::Display for ServicePriority {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}
