//! Thread placement and message loops for hearth services.
//!
//! Services are registered in a [`ServiceRegistry`], grouped per thread.
//! [`ServiceThreadManager`] spawns one thread per managed group, launches
//! the main-thread group in place and wires [`AsyncProxyFactory`] proxies so
//! other threads can reach async services by posting messages to the
//! owning [`ServiceHost`]. [`ServiceFramework`] bundles the whole sequence.

mod async_service;
mod config;
mod error;
mod framework;
mod group;
mod host;
mod message;
mod queue;
mod registry;
mod spawn;
mod thread_manager;

pub use async_service::{
	AsyncProxyFactory, AsyncServiceImpl, AsyncServiceImplHost, AsyncServiceSender, FnAsyncProxyFactory,
};
pub use config::{ConfigError, HostConfig};
pub use error::{HostError, Result};
pub use framework::ServiceFramework;
pub use group::{AsyncServiceRecord, ServiceGroup, ServiceGroupId, ServiceGroupKind};
pub use host::{HostState, ServiceHost};
pub use message::{BasicMessage, BasicMessageQueue, BasicMessageSender, FireAndForgetMessage};
pub use queue::{MessageQueue, QueueSender};
pub use registry::ServiceRegistry;
pub use thread_manager::ServiceThreadManager;
