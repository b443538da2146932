//! Service registry types, interface lookup and tiered launch.
//!
//! This crate provides the thread-local half of the hearth service framework:
//! - [`ServiceId`] / [`ProviderId`]: interface and provider keys
//! - [`Service`] / [`ServiceFactory`]: contracts implemented by consumers
//! - [`TypeServiceMaps`]: per-thread interface lookup
//! - [`ServiceLauncher`]: priority-tiered instantiation
//! - [`ServiceProvider`] / [`ServiceProviderImpl`]: resolution and updates
//!
//! Threads, queues and asynchronous proxies live in `hearth-host`.

mod caps;
mod error;
mod id;
mod instance;
mod launcher;
mod maps;
mod provider;
mod record;
mod service;

pub use caps::{ServiceCaps, ServicePriority};
pub use error::{Result, ServiceError};
pub use id::{ProviderId, ServiceId};
pub use instance::{ErasedInstance, InstanceHandle, ProxyInstance, ServiceInstance};
pub use launcher::ServiceLauncher;
pub use maps::{GlobalServiceMap, TypeServiceMaps};
pub use provider::{ServiceProvider, ServiceProviderImpl};
pub use record::{InstanceAllocator, LaunchKind, RegisteredServiceRecord, ServiceLaunchRecord};
pub use service::{FnServiceFactory, Service, ServiceFactory};
