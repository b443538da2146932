//! Error types for service resolution and launch.

use thiserror::Error;

use crate::ServiceId;

/// Errors raised while resolving or launching services.
#[derive(Debug, Error)]
pub enum ServiceError {
	/// No provider is registered for the interface.
	#[error("unknown service: {0}")]
	UnknownService(ServiceId),

	/// The interface has several providers and no provider id was given.
	#[error("service interface {0} has multiple providers")]
	MultipleProviders(ServiceId),

	/// A factory that is not available on demand returned no usable instance.
	#[error("invalid service factory `{service}`: {reason}")]
	InvalidServiceFactory {
		/// Name of the offending factory.
		service: String,
		/// What the factory got wrong.
		reason: String,
	},

	/// A service failed to construct, link or update.
	#[error("service `{service}` failed: {reason}")]
	Failed {
		/// Name of the failing service.
		service: String,
		/// Failure description.
		reason: String,
	},

	/// Any other error raised by service code.
	#[error(transparent)]
	Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ServiceError {
	/// Creates a [`ServiceError::Failed`].
	pub fn failed(service: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::Failed {
			service: service.into(),
			reason: reason.into(),
		}
	}

	/// Returns true for lookups that found nothing, with or without a provider id.
	pub fn is_unknown_service(&self) -> bool {
		matches!(self, Self::UnknownService(_))
	}
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
