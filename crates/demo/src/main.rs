//! Hearth demo binary.
//!
//! Runs a main-thread reporter that posts one line per frame to a logbook
//! service living on its own managed thread.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use hearth_host::{
	AsyncServiceImpl, AsyncServiceSender, FireAndForgetMessage, FnAsyncProxyFactory, HostConfig, ServiceFramework,
	ServiceRegistry,
};
use hearth_service::{FnServiceFactory, ProxyInstance, Service, ServiceInstance, ServicePriority, ServiceProvider};
use tracing::info;

/// Demo command line arguments.
#[derive(Parser, Debug)]
#[command(name = "hearth-demo")]
#[command(about = "Run hearth services on the main thread and a managed thread")]
struct Args {
	/// TOML host configuration
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Number of main loop iterations before shutdown
	#[arg(short, long, default_value_t = 10)]
	frames: u32,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

/// Public face of the logbook, usable from any thread.
trait Logbook {
	fn write(&self, line: String);
}

struct LogbookProxy(AsyncServiceSender);

impl Logbook for LogbookProxy {
	fn write(&self, line: String) {
		if let Err(error) = self.0.post(line) {
			tracing::warn!(%error, "demo.logbook.closed");
		}
	}
}

#[derive(Default)]
struct LogbookService {
	written: Cell<u64>,
}

impl Service for LogbookService {}

impl AsyncServiceImpl for LogbookService {
	fn process(&self, message: FireAndForgetMessage) -> hearth_service::Result<()> {
		let line = message.decode::<String>()?;
		self.written.set(self.written.get() + 1);
		let thread = std::thread::current();
		info!(thread = thread.name().unwrap_or("?"), n = self.written.get(), "{line}");
		Ok(())
	}
}

impl Drop for LogbookService {
	fn drop(&mut self) {
		info!(lines = self.written.get(), "demo.logbook.dropped");
	}
}

/// Posts one line to the logbook per frame.
#[derive(Default)]
struct Reporter {
	frame: Cell<u32>,
	logbook: RefCell<Option<Rc<dyn Logbook>>>,
}

impl Service for Reporter {
	fn link(&self, provider: &ServiceProvider) -> hearth_service::Result<()> {
		*self.logbook.borrow_mut() = Some(provider.get::<dyn Logbook>()?);
		Ok(())
	}

	fn update(&self) -> hearth_service::Result<()> {
		let frame = self.frame.get() + 1;
		self.frame.set(frame);
		if let Some(logbook) = self.logbook.borrow().as_ref() {
			logbook.write(format!("frame {frame}"));
		}
		Ok(())
	}
}

fn registry() -> anyhow::Result<ServiceRegistry> {
	let mut registry = ServiceRegistry::new();
	let io = registry.create_group("io");
	registry.register_async(
		io,
		FnServiceFactory::new("logbook", |_: &ServiceProvider| {
			let logbook = Rc::new(LogbookService::default());
			Ok(Some(ServiceInstance::new(logbook.clone()).provide::<dyn AsyncServiceImpl>(logbook)))
		})
		.interface::<dyn AsyncServiceImpl>(),
		FnAsyncProxyFactory::new(|sender| ProxyInstance::new().provide::<dyn Logbook>(Rc::new(LogbookProxy(sender))))
			.interface::<dyn Logbook>(),
		ServicePriority::NORMAL,
	)?;
	registry.register(
		FnServiceFactory::new("reporter", |_: &ServiceProvider| {
			let reporter = Rc::new(Reporter::default());
			Ok(Some(ServiceInstance::new(reporter.clone()).provide::<Reporter>(reporter)))
		})
		.interface::<Reporter>(),
		ServicePriority::NORMAL,
	);
	Ok(registry)
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let config = match &args.config {
		Some(path) => HostConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => HostConfig::default(),
	};
	info!(?config, frames = args.frames, "starting hearth-demo");

	let mut framework = ServiceFramework::launch(registry()?, config)?;
	for _ in 0..args.frames {
		if framework.is_quit_requested() {
			break;
		}
		framework.process_messages()?;
	}
	framework.shutdown()?;
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("HEARTH_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("hearth_host=trace,hearth_service=trace,debug")
			} else {
				EnvFilter::new("info")
			}
		});
	tracing_subscriber::fmt().with_env_filter(filter).with_thread_names(true).init();
}
