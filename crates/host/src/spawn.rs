use std::any::Any;
use std::thread::JoinHandle;

/// Spawns a named OS thread for a service group.
pub(crate) fn spawn_group_thread<F, R>(name: String, f: F) -> std::io::Result<JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(thread = %name, "host.spawn_thread");
	std::thread::Builder::new().name(name).spawn(f)
}

/// Extracts the human-readable text from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_string()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn named_thread_carries_name() {
		let handle = spawn_group_thread("hearth-test".to_string(), || std::thread::current().name().map(str::to_string)).unwrap();
		assert_eq!(handle.join().unwrap().as_deref(), Some("hearth-test"));
	}

	fn panic_payload(f: fn()) -> Box<dyn Any + Send> {
		std::thread::spawn(f).join().unwrap_err()
	}

	#[test]
	fn panic_message_reads_str_and_string() {
		assert_eq!(panic_message(panic_payload(|| panic!("static text")).as_ref()), "static text");
		assert_eq!(panic_message(panic_payload(|| panic!("formatted {}", 7)).as_ref()), "formatted 7");
		assert_eq!(
			panic_message(panic_payload(|| std::panic::panic_any(42_u32)).as_ref()),
			"non-string panic payload"
		);
	}
}
