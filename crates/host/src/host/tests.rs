use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hearth_service::{
	FnServiceFactory, ProviderId, RegisteredServiceRecord, Service, ServiceInstance, ServiceLauncher, ServicePriority,
	ServiceProvider,
};
use pretty_assertions::assert_eq;

use super::*;
use crate::async_service::AsyncServiceImpl;
use crate::message::FireAndForgetMessage;

struct Ticker {
	ticks: Arc<AtomicUsize>,
	received: Arc<AtomicUsize>,
}

impl Service for Ticker {
	fn update(&self) -> hearth_service::Result<()> {
		self.ticks.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

impl AsyncServiceImpl for Ticker {
	fn process(&self, message: FireAndForgetMessage) -> hearth_service::Result<()> {
		let step = message.decode::<usize>()?;
		self.received.fetch_add(step, Ordering::SeqCst);
		Ok(())
	}
}

struct Fixture {
	host: ServiceHost,
	cancel: CancellationToken,
	ticks: Arc<AtomicUsize>,
	received: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
	let ticks = Arc::new(AtomicUsize::new(0));
	let received = Arc::new(AtomicUsize::new(0));
	let (t, r) = (Arc::clone(&ticks), Arc::clone(&received));
	let factory = FnServiceFactory::new("ticker", move |_: &ServiceProvider| {
		let ticker = Rc::new(Ticker {
			ticks: Arc::clone(&t),
			received: Arc::clone(&r),
		});
		Ok(Some(ServiceInstance::new(ticker.clone()).provide::<dyn AsyncServiceImpl>(ticker)))
	})
	.interface::<dyn AsyncServiceImpl>();
	let record = RegisteredServiceRecord::new(ProviderId(0), Arc::new(factory), ServicePriority::NORMAL);
	let services = ServiceLauncher::default().launch(&[record]).unwrap();
	let cancel = CancellationToken::new();
	let host = ServiceHost::new("test", BasicMessageQueue::new(), services, cancel.clone()).unwrap();
	Fixture {
		host,
		cancel,
		ticks,
		received,
	}
}

const SHORT: Option<Duration> = Some(Duration::from_millis(5));

#[test]
fn timeout_still_updates_services() {
	let mut fx = fixture();
	fx.host.process_messages(SHORT).unwrap();
	assert_eq!(fx.host.state(), HostState::Running);
	assert_eq!(fx.ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn batch_dispatches_then_updates_once() {
	let mut fx = fixture();
	let tx = fx.host.sender();
	tx.push(BasicMessage::ThreadInit).unwrap();
	tx.push(BasicMessage::FireAndForget(FireAndForgetMessage::new(ProviderId(0), 2_usize))).unwrap();
	tx.push(BasicMessage::FireAndForget(FireAndForgetMessage::new(ProviderId(0), 3_usize))).unwrap();

	fx.host.process_messages(None).unwrap();
	assert_eq!(fx.received.load(Ordering::SeqCst), 5);
	assert_eq!(fx.ticks.load(Ordering::SeqCst), 1);
	assert_eq!(fx.host.pending(), 0);
}

#[test]
fn shutdown_begin_requests_quit() {
	let mut fx = fixture();
	fx.host.sender().push(BasicMessage::ThreadShutdownBegin).unwrap();
	fx.host.run().unwrap();
	assert!(fx.host.is_quit_requested());
}

#[test]
fn cancelled_token_quits_without_draining() {
	let mut fx = fixture();
	fx.host.sender().push(BasicMessage::ThreadInit).unwrap();
	fx.cancel.cancel();
	fx.host.process_messages(None).unwrap();
	assert_eq!(fx.host.state(), HostState::QuitRequested);
	assert_eq!(fx.host.pending(), 1);
	assert_eq!(fx.ticks.load(Ordering::SeqCst), 0);
}

#[test]
fn closed_queue_requests_quit() {
	let mut fx = fixture();
	fx.host.sender().close();
	fx.host.run().unwrap();
	assert!(fx.host.is_quit_requested());
}

#[test]
fn captured_failure_is_reraised() {
	let mut fx = fixture();
	let failure = HostError::ThreadPanicked {
		group: "worker".into(),
		message: "boom".into(),
	};
	fx.host.sender().push(BasicMessage::ThreadShutdown(Some(failure))).unwrap();
	let err = fx.host.process_messages(None).unwrap_err();
	assert!(matches!(err, HostError::ThreadPanicked { ref group, .. } if group == "worker"));
}

#[test]
fn drain_shutdown_returns_first_failure() {
	let mut fx = fixture();
	let tx = fx.host.sender();
	tx.push(BasicMessage::ThreadShutdown(None)).unwrap();
	tx.push(BasicMessage::ThreadShutdown(Some(HostError::QueueClosed))).unwrap();
	tx.push(BasicMessage::ThreadShutdown(Some(HostError::MainThreadGroupMissing))).unwrap();
	assert!(matches!(fx.host.drain_shutdown(), Err(HostError::QueueClosed)));
	assert!(fx.host.drain_shutdown().is_ok());
}

#[test]
fn failure_does_not_drop_rest_of_batch() {
	let mut fx = fixture();
	let tx = fx.host.sender();
	tx.push(BasicMessage::ThreadShutdown(Some(HostError::QueueClosed))).unwrap();
	tx.push(BasicMessage::ThreadShutdown(Some(HostError::MainThreadGroupMissing))).unwrap();
	tx.push(BasicMessage::FireAndForget(FireAndForgetMessage::new(ProviderId(0), 7_usize))).unwrap();

	assert!(matches!(fx.host.process_messages(None), Err(HostError::QueueClosed)));
	assert_eq!(fx.received.load(Ordering::SeqCst), 7);
	assert_eq!(fx.ticks.load(Ordering::SeqCst), 0);

	assert!(matches!(fx.host.process_messages(None), Err(HostError::MainThreadGroupMissing)));
	fx.host.process_messages(SHORT).unwrap();
	assert_eq!(fx.ticks.load(Ordering::SeqCst), 1);
	assert_eq!(fx.received.load(Ordering::SeqCst), 7);
}

#[test]
fn drain_shutdown_returns_unraised_batch_failure() {
	let mut fx = fixture();
	let tx = fx.host.sender();
	tx.push(BasicMessage::ThreadShutdown(Some(HostError::QueueClosed))).unwrap();
	tx.push(BasicMessage::ThreadShutdown(Some(HostError::MainThreadGroupMissing))).unwrap();

	assert!(matches!(fx.host.process_messages(None), Err(HostError::QueueClosed)));
	assert!(matches!(fx.host.drain_shutdown(), Err(HostError::MainThreadGroupMissing)));
	assert!(fx.host.drain_shutdown().is_ok());
}
