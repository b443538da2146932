use std::any::TypeId;
use std::fmt;

/// Key naming one interface type.
///
/// Interfaces are usually trait objects, so the id of `dyn Logger` is
/// obtained with `ServiceId::of::<dyn Logger>()`.
#[derive(Clone, Copy)]
pub struct ServiceId {
	type_id: Option<TypeId>,
	name: &'static str,
}

impl ServiceId {
	/// Represents no interface at all.
	pub const INVALID: ServiceId = ServiceId {
		type_id: None,
		name: "<invalid>",
	};

	/// Returns the id of interface type `T`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			type_id: Some(TypeId::of::<T>()),
			name: std::any::type_name::<T>(),
		}
	}

	/// Returns true if this id names a real interface.
	#[inline]
	pub fn is_valid(self) -> bool {
		self != Self::INVALID
	}

	/// Returns the interface type name, for diagnostics only.
	pub fn name(self) -> &'static str {
		self.name
	}
}

impl PartialEq for ServiceId {
	fn eq(&self, other: &Self) -> bool {
		self.type_id == other.type_id
	}
}

impl Eq for ServiceId {}

impl std::hash::Hash for ServiceId {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.type_id.hash(state);
	}
}

impl fmt::Debug for ServiceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ServiceId({})", self.name)
	}
}

impl fmt::Display for ServiceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// Numeric identifier of one registered provider record.
///
/// Provider ids disambiguate interfaces that have several competing
/// implementations. They are handed out by the composition registry and stay
/// stable for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderId(pub u32);

impl ProviderId {
	/// Represents an invalid provider id, used for ambiguous lookups.
	pub const INVALID: ProviderId = ProviderId(u32::MAX);

	/// Returns true if this provider id is valid.
	#[inline]
	pub fn is_valid(self) -> bool {
		self != Self::INVALID
	}
}

impl fmt::Display for ProviderId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_valid() {
			write!(f, "provider:{}", self.0)
		} else {
			f.write_str("provider:invalid")
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	trait Alpha {}
	trait Beta {}

	#[test]
	fn ids_compare_by_type() {
		assert_eq!(ServiceId::of::<dyn Alpha>(), ServiceId::of::<dyn Alpha>());
		assert_ne!(ServiceId::of::<dyn Alpha>(), ServiceId::of::<dyn Beta>());
		assert!(ServiceId::of::<dyn Alpha>().name().contains("Alpha"));
	}

	#[test]
	fn invalid_sentinels() {
		assert!(!ServiceId::INVALID.is_valid());
		assert!(ServiceId::of::<dyn Beta>().is_valid());
		assert!(!ProviderId::INVALID.is_valid());
		assert!(ProviderId(0).is_valid());
		assert_eq!(ProviderId::INVALID.to_string(), "provider:invalid");
		assert_eq!(ProviderId(7).to_string(), "provider:7");
	}
}
