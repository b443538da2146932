//! Cross-thread services: implementations on a managed thread, proxies elsewhere.
//!
//! An async service is registered twice. Its implementation factory runs on
//! the owning group's thread and provides [`AsyncServiceImpl`]. Its
//! [`AsyncProxyFactory`] is turned into a [`GlobalServiceMap`] allocator, so
//! every other thread resolves the public interface to a fresh proxy that
//! posts [`BasicMessage::FireAndForget`] messages to the owning queue.
//!
//! [`GlobalServiceMap`]: hearth_service::GlobalServiceMap

use std::rc::Rc;
use std::sync::Arc;

use hearth_service::{
	ErasedInstance, InstanceAllocator, ProviderId, ProxyInstance, Result, ServiceError, ServiceId, ServiceProvider,
};
use rustc_hash::FxHashMap;

use crate::error::HostError;
use crate::message::{BasicMessage, BasicMessageSender, FireAndForgetMessage};

/// Receiving side of an async service, living on its group's thread.
pub trait AsyncServiceImpl: 'static {
	/// Handles one fire-and-forget message addressed to this provider.
	fn process(&self, message: FireAndForgetMessage) -> Result<()>;
}

/// Posts payloads to one async service provider.
#[derive(Clone)]
pub struct AsyncServiceSender {
	queue: BasicMessageSender,
	target: ProviderId,
}

impl AsyncServiceSender {
	pub(crate) fn new(queue: BasicMessageSender, target: ProviderId) -> Self {
		Self { queue, target }
	}

	/// Provider the messages are addressed to.
	pub fn target(&self) -> ProviderId {
		self.target
	}

	/// Enqueues `payload` on the owning thread.
	pub fn post<M: Send + 'static>(&self, payload: M) -> crate::Result<()> {
		self.queue
			.push(BasicMessage::FireAndForget(FireAndForgetMessage::new(self.target, payload)))
	}
}

impl std::fmt::Debug for AsyncServiceSender {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AsyncServiceSender").field("target", &self.target).finish_non_exhaustive()
	}
}

/// Builds caller-side proxies for an async service.
pub trait AsyncProxyFactory: Send + Sync {
	/// Appends the public interfaces the proxy implements. Must add at least one.
	fn fill_interface_types(&self, out: &mut Vec<ServiceId>);

	/// Creates a proxy that forwards through `sender`.
	fn create_proxy(&self, sender: AsyncServiceSender) -> ProxyInstance;
}

/// [`AsyncProxyFactory`] backed by a closure.
pub struct FnAsyncProxyFactory<F> {
	interfaces: Vec<ServiceId>,
	create: F,
}

impl<F> FnAsyncProxyFactory<F>
where
	F: Fn(AsyncServiceSender) -> ProxyInstance + Send + Sync,
{
	/// Creates a factory with no interfaces.
	pub fn new(create: F) -> Self {
		Self {
			interfaces: Vec::new(),
			create,
		}
	}

	/// Declares interface `I` as provided by the proxy.
	#[must_use]
	pub fn interface<I: ?Sized + 'static>(mut self) -> Self {
		self.interfaces.push(ServiceId::of::<I>());
		self
	}
}

impl<F> AsyncProxyFactory for FnAsyncProxyFactory<F>
where
	F: Fn(AsyncServiceSender) -> ProxyInstance + Send + Sync,
{
	fn fill_interface_types(&self, out: &mut Vec<ServiceId>) {
		out.extend_from_slice(&self.interfaces);
	}

	fn create_proxy(&self, sender: AsyncServiceSender) -> ProxyInstance {
		(self.create)(sender)
	}
}

/// Global-map allocator producing a new proxy per lookup.
pub(crate) struct AsyncProxyAllocator {
	interface: ServiceId,
	sender: AsyncServiceSender,
	factory: Arc<dyn AsyncProxyFactory>,
}

impl AsyncProxyAllocator {
	pub(crate) fn new(interface: ServiceId, sender: AsyncServiceSender, factory: Arc<dyn AsyncProxyFactory>) -> Self {
		Self {
			interface,
			sender,
			factory,
		}
	}
}

impl InstanceAllocator for AsyncProxyAllocator {
	fn allocate(&self) -> Result<ErasedInstance> {
		self.factory
			.create_proxy(self.sender.clone())
			.into_erased(self.interface)
			.ok_or_else(|| ServiceError::InvalidServiceFactory {
				service: self.sender.target().to_string(),
				reason: format!("proxy does not provide {}", self.interface),
			})
	}
}

/// Routes fire-and-forget messages to the implementations of one thread.
#[derive(Default)]
pub struct AsyncServiceImplHost {
	impls: FxHashMap<ProviderId, Rc<dyn AsyncServiceImpl>>,
}

impl AsyncServiceImplHost {
	/// Collects every [`AsyncServiceImpl`] launched on this thread.
	pub fn new(provider: &ServiceProvider) -> Result<Self> {
		let mut impls = FxHashMap::default();
		for id in provider.provider_ids(ServiceId::of::<dyn AsyncServiceImpl>()) {
			impls.insert(id, provider.get_from::<dyn AsyncServiceImpl>(id)?);
		}
		Ok(Self { impls })
	}

	/// Number of implementations hosted.
	pub fn len(&self) -> usize {
		self.impls.len()
	}

	/// Returns `true` if the thread hosts no async services.
	pub fn is_empty(&self) -> bool {
		self.impls.is_empty()
	}

	/// Hands `message` to its target implementation.
	///
	/// Messages for unknown providers are dropped with a warning.
	pub fn dispatch(&self, message: FireAndForgetMessage) -> crate::Result<()> {
		let target = message.target();
		match self.impls.get(&target) {
			Some(service) => service.process(message).map_err(HostError::from),
			None => {
				tracing::warn!(provider = %target, "host.async.unknown_target");
				Ok(())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use hearth_service::{FnServiceFactory, RegisteredServiceRecord, Service, ServiceInstance, ServiceLauncher, ServicePriority};
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::message::BasicMessageQueue;

	type Seen = Arc<parking_lot::Mutex<Vec<String>>>;

	struct Recorder {
		seen: Seen,
	}

	impl Service for Recorder {}

	impl AsyncServiceImpl for Recorder {
		fn process(&self, message: FireAndForgetMessage) -> Result<()> {
			self.seen.lock().push(message.decode::<String>()?);
			Ok(())
		}
	}

	trait Sink {
		fn send(&self, text: &str);
	}

	struct SinkProxy(AsyncServiceSender);

	impl Sink for SinkProxy {
		fn send(&self, text: &str) {
			let _ = self.0.post(text.to_string());
		}
	}

	fn recorder_record(id: u32, seen: &Seen) -> RegisteredServiceRecord {
		let seen = Arc::clone(seen);
		let factory = FnServiceFactory::new("recorder", move |_: &ServiceProvider| {
			let recorder = Rc::new(Recorder { seen: Arc::clone(&seen) });
			Ok(Some(ServiceInstance::new(recorder.clone()).provide::<dyn AsyncServiceImpl>(recorder)))
		})
		.interface::<dyn AsyncServiceImpl>();
		RegisteredServiceRecord::new(ProviderId(id), Arc::new(factory), ServicePriority::NORMAL)
	}

	#[test]
	fn dispatch_reaches_target_and_skips_unknown() {
		let seen = Seen::default();
		let services = ServiceLauncher::default().launch(&[recorder_record(4, &seen)]).unwrap();
		let host = AsyncServiceImplHost::new(services.provider()).unwrap();
		assert_eq!(host.len(), 1);

		host.dispatch(FireAndForgetMessage::new(ProviderId(4), "one".to_string())).unwrap();
		host.dispatch(FireAndForgetMessage::new(ProviderId(9), "lost".to_string())).unwrap();
		assert_eq!(*seen.lock(), vec!["one".to_string()]);

		let err = host.dispatch(FireAndForgetMessage::new(ProviderId(4), 1_u8)).unwrap_err();
		assert!(matches!(err, HostError::Service(ServiceError::Failed { .. })));
	}

	#[test]
	fn proxy_allocator_posts_to_queue() {
		let queue = BasicMessageQueue::new();
		let factory: Arc<dyn AsyncProxyFactory> = Arc::new(
			FnAsyncProxyFactory::new(|sender| ProxyInstance::new().provide::<dyn Sink>(Rc::new(SinkProxy(sender))))
				.interface::<dyn Sink>(),
		);
		let allocator = AsyncProxyAllocator::new(
			ServiceId::of::<dyn Sink>(),
			AsyncServiceSender::new(queue.sender(), ProviderId(2)),
			factory,
		);

		let sink = allocator.allocate().unwrap().downcast::<dyn Sink>().unwrap();
		sink.send("hi");

		let batch = queue.try_pop_batch();
		assert_eq!(batch.len(), 1);
		match batch.into_iter().next() {
			Some(BasicMessage::FireAndForget(msg)) => {
				assert_eq!(msg.target(), ProviderId(2));
				assert_eq!(msg.decode::<String>().unwrap(), "hi");
			}
			other => panic!("unexpected message: {other:?}"),
		}
	}

	#[test]
	fn proxy_missing_interface_is_invalid() {
		let queue = BasicMessageQueue::new();
		let factory: Arc<dyn AsyncProxyFactory> =
			Arc::new(FnAsyncProxyFactory::new(|_| ProxyInstance::new()).interface::<dyn Sink>());
		let allocator = AsyncProxyAllocator::new(
			ServiceId::of::<dyn Sink>(),
			AsyncServiceSender::new(queue.sender(), ProviderId(2)),
			factory,
		);
		assert!(matches!(allocator.allocate(), Err(ServiceError::InvalidServiceFactory { .. })));
	}
}
