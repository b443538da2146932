use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hearth_host::{
	AsyncServiceImpl, AsyncServiceSender, FireAndForgetMessage, FnAsyncProxyFactory, HostConfig, HostError,
	ServiceFramework, ServiceRegistry,
};
use hearth_service::{
	FnServiceFactory, ProxyInstance, Result, Service, ServiceError, ServiceInstance, ServicePriority, ServiceProvider,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

type Lines = Arc<Mutex<Vec<(String, Option<String>)>>>;

trait JournalApi {
	fn append(&self, line: &str);
}

trait LocalOnly {}

struct JournalProxy(AsyncServiceSender);

impl JournalApi for JournalProxy {
	fn append(&self, line: &str) {
		self.0.post(line.to_string()).expect("journal queue open");
	}
}

struct Journal {
	lines: Lines,
}

impl Service for Journal {}

impl AsyncServiceImpl for Journal {
	fn process(&self, message: FireAndForgetMessage) -> Result<()> {
		let line = message.decode::<String>()?;
		let thread = std::thread::current().name().map(str::to_string);
		self.lines.lock().push((line, thread));
		Ok(())
	}
}

struct Greeter;

impl Service for Greeter {
	fn link(&self, provider: &ServiceProvider) -> Result<()> {
		provider.get::<dyn JournalApi>()?.append("linked");
		Ok(())
	}
}

struct Inert;

impl Service for Inert {}

impl LocalOnly for Inert {}

fn config() -> HostConfig {
	HostConfig::from_toml_str("message_wait_ms = 5\nthread_name_prefix = \"it\"").unwrap()
}

fn register_journal(registry: &mut ServiceRegistry, lines: &Lines) {
	let group = registry.create_group("journal");
	let lines = Arc::clone(lines);
	let factory = FnServiceFactory::new("journal", move |_: &ServiceProvider| {
		let journal = Rc::new(Journal {
			lines: Arc::clone(&lines),
		});
		Ok(Some(ServiceInstance::new(journal.clone()).provide::<dyn AsyncServiceImpl>(journal)))
	})
	.interface::<dyn AsyncServiceImpl>();
	let proxy = FnAsyncProxyFactory::new(|sender| {
		ProxyInstance::new().provide::<dyn JournalApi>(Rc::new(JournalProxy(sender)))
	})
	.interface::<dyn JournalApi>();
	registry
		.register_async(group, factory, proxy, ServicePriority::NORMAL)
		.unwrap();
	registry
		.register_in(
			group,
			FnServiceFactory::new("inert", |_: &ServiceProvider| {
				let inert = Rc::new(Inert);
				Ok(Some(ServiceInstance::new(inert.clone()).provide::<dyn LocalOnly>(inert)))
			})
			.interface::<dyn LocalOnly>(),
			ServicePriority::HIGH,
		)
		.unwrap();
}

fn wait_for(mut done: impl FnMut() -> bool) {
	let deadline = Instant::now() + Duration::from_secs(5);
	while !done() {
		assert!(Instant::now() < deadline, "timed out waiting for managed thread");
		std::thread::sleep(Duration::from_millis(2));
	}
}

#[test]
fn proxies_deliver_in_order_on_the_owning_thread() {
	let lines = Lines::default();
	let mut registry = ServiceRegistry::new();
	register_journal(&mut registry, &lines);
	registry.register(
		FnServiceFactory::new("greeter", |_: &ServiceProvider| {
			let greeter = Rc::new(Greeter);
			Ok(Some(ServiceInstance::new(greeter.clone()).provide::<Greeter>(greeter)))
		})
		.interface::<Greeter>(),
		ServicePriority::NORMAL,
	);

	let framework = ServiceFramework::launch(registry, config()).unwrap();
	let first = framework.provider().get::<dyn JournalApi>().unwrap();
	let second = framework.provider().get::<dyn JournalApi>().unwrap();
	assert!(!Rc::ptr_eq(&first, &second));

	for line in ["one", "two", "three"] {
		first.append(line);
	}
	wait_for(|| lines.lock().len() == 4);
	framework.shutdown().unwrap();

	let lines = lines.lock().clone();
	let text: Vec<&str> = lines.iter().map(|(line, _)| line.as_str()).collect();
	assert_eq!(text, vec!["linked", "one", "two", "three"]);
	assert!(lines.iter().all(|(_, thread)| thread.as_deref() == Some("it-journal")));
}

#[test]
fn thread_local_services_stay_on_their_thread() {
	let lines = Lines::default();
	let mut registry = ServiceRegistry::new();
	register_journal(&mut registry, &lines);

	let framework = ServiceFramework::launch(registry, config()).unwrap();
	assert!(framework.provider().try_get::<dyn LocalOnly>().unwrap().is_none());
	assert!(framework.provider().try_get::<dyn JournalApi>().unwrap().is_some());
	framework.shutdown().unwrap();
}

#[test]
fn request_quit_stops_main_loop() {
	let mut framework = ServiceFramework::launch(ServiceRegistry::new(), config()).unwrap();
	framework.process_messages().unwrap();
	assert!(!framework.is_quit_requested());
	framework.request_quit();
	framework.process_messages().unwrap();
	assert!(framework.is_quit_requested());
	framework.shutdown().unwrap();
}

#[test]
fn managed_launch_failure_surfaces_on_main_loop() {
	let mut registry = ServiceRegistry::new();
	let group = registry.create_group("broken");
	registry
		.register_in(
			group,
			FnServiceFactory::new("fragile", |_: &ServiceProvider| Err(ServiceError::failed("fragile", "no device")))
				.interface::<dyn LocalOnly>(),
			ServicePriority::NORMAL,
		)
		.unwrap();

	let mut framework = ServiceFramework::launch(registry, config()).unwrap();
	let deadline = Instant::now() + Duration::from_secs(5);
	let err = loop {
		assert!(Instant::now() < deadline, "failure never reached the main loop");
		if let Err(err) = framework.process_messages() {
			break err;
		}
	};
	match &err {
		HostError::ThreadFailed { group, source } => {
			assert_eq!(group, "broken");
			assert!(matches!(**source, HostError::Service(ServiceError::Failed { .. })));
		}
		other => panic!("unexpected error: {other}"),
	}
	framework.shutdown().unwrap();
}

#[test]
fn managed_panic_is_reported_at_shutdown() {
	let mut registry = ServiceRegistry::new();
	let group = registry.create_group("panicky");
	registry
		.register_in(
			group,
			FnServiceFactory::new("bomb", |_: &ServiceProvider| panic!("allocate exploded")).interface::<dyn LocalOnly>(),
			ServicePriority::NORMAL,
		)
		.unwrap();

	let framework = ServiceFramework::launch(registry, config()).unwrap();
	let err = framework.shutdown().unwrap_err();
	match err {
		HostError::ThreadPanicked { group, message } => {
			assert_eq!(group, "panicky");
			assert_eq!(message, "allocate exploded");
		}
		other => panic!("unexpected error: {other}"),
	}
}

#[test]
fn async_service_on_main_group_is_rejected() {
	let mut registry = ServiceRegistry::new();
	let err = registry
		.register_async(
			hearth_host::ServiceGroupId::MAIN,
			FnServiceFactory::new("x", |_: &ServiceProvider| Ok(None)).interface::<dyn AsyncServiceImpl>(),
			FnAsyncProxyFactory::new(|_| ProxyInstance::new()).interface::<dyn JournalApi>(),
			ServicePriority::NORMAL,
		)
		.unwrap_err();
	assert!(matches!(err, HostError::InvalidGroup(_)));
}

trait Identify {
	fn who(&self) -> &'static str;
}

struct Local(&'static str);

impl Service for Local {}

impl Identify for Local {
	fn who(&self) -> &'static str {
		self.0
	}
}

impl AsyncServiceImpl for Local {
	fn process(&self, _message: FireAndForgetMessage) -> Result<()> {
		Ok(())
	}
}

struct IdentifyProxy;

impl Identify for IdentifyProxy {
	fn who(&self) -> &'static str {
		"y-proxy"
	}
}

fn identify_factory(name: &'static str) -> impl hearth_service::ServiceFactory + 'static {
	FnServiceFactory::new(name, move |_: &ServiceProvider| {
		let local = Rc::new(Local(name));
		Ok(Some(ServiceInstance::new(local.clone()).provide::<dyn Identify>(local)))
	})
	.interface::<dyn Identify>()
}

#[test]
fn main_and_async_providers_of_one_interface_are_ambiguous() {
	let mut registry = ServiceRegistry::new();
	let x = registry.register(identify_factory("x"), ServicePriority(100));
	let group = registry.create_group("ys");
	let y = registry
		.register_async(
			group,
			FnServiceFactory::new("y", |_: &ServiceProvider| {
				let local = Rc::new(Local("y"));
				Ok(Some(ServiceInstance::new(local.clone()).provide::<dyn AsyncServiceImpl>(local)))
			})
			.interface::<dyn AsyncServiceImpl>(),
			FnAsyncProxyFactory::new(|_| ProxyInstance::new().provide::<dyn Identify>(Rc::new(IdentifyProxy)))
				.interface::<dyn Identify>(),
			ServicePriority(50),
		)
		.unwrap();

	let framework = ServiceFramework::launch(registry, config()).unwrap();
	let provider = framework.provider();
	assert!(matches!(
		provider.get::<dyn Identify>(),
		Err(ServiceError::MultipleProviders(id)) if id == hearth_service::ServiceId::of::<dyn Identify>()
	));
	assert_eq!(provider.get_from::<dyn Identify>(x).unwrap().who(), "x");
	assert_eq!(provider.get_from::<dyn Identify>(y).unwrap().who(), "y-proxy");

	let mut all = Vec::new();
	provider.get_all::<dyn Identify>(&mut all).unwrap();
	assert_eq!(all.len(), 2);
	framework.shutdown().unwrap();
}

#[test]
fn managed_thread_local_provider_is_invisible_to_main() {
	let mut registry = ServiceRegistry::new();
	let x = registry.register(identify_factory("x"), ServicePriority(100));
	let group = registry.create_group("ys");
	let y = registry.register_in(group, identify_factory("y"), ServicePriority(50)).unwrap();

	let framework = ServiceFramework::launch(registry, config()).unwrap();
	let provider = framework.provider();
	assert_eq!(provider.get::<dyn Identify>().unwrap().who(), "x");
	assert_eq!(provider.provider_ids(hearth_service::ServiceId::of::<dyn Identify>()), vec![x]);
	assert!(matches!(
		provider.get_from::<dyn Identify>(y),
		Err(ServiceError::UnknownService(_))
	));
	framework.shutdown().unwrap();
}
