use tracing_subscriber::EnvFilter;

/// Environment switch that turns on debug output.
pub const DEBUG_ENV: &str = "DEBUG";

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level comes from `-v` and `DEBUG=true`.
pub fn init_logging(verbose: u8) {
	let debug = debug_enabled(std::env::var(DEBUG_ENV).ok().as_deref());
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, debug)));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(verbose > 0 || debug)
		.with_writer(std::io::stderr)
		.try_init();
}

pub fn default_filter(verbose: u8, debug: bool) -> &'static str {
	match (verbose, debug) {
		(0, false) => "warn,squirrel=info",
		(0 | 1, _) => "warn,squirrel=debug",
		_ => "info,squirrel=trace",
	}
}

pub fn debug_enabled(value: Option<&str>) -> bool {
	value.is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn debug_flag_values() {
		assert!(debug_enabled(Some("true")));
		assert!(debug_enabled(Some("TRUE")));
		assert!(debug_enabled(Some("1")));
		assert!(!debug_enabled(Some("false")));
		assert!(!debug_enabled(None));
	}

	#[test]
	fn verbosity_raises_level() {
		assert_eq!(default_filter(0, false), "warn,squirrel=info");
		assert_eq!(default_filter(0, true), "warn,squirrel=debug");
		assert_eq!(default_filter(1, false), "warn,squirrel=debug");
		assert_eq!(default_filter(3, false), "info,squirrel=trace");
	}
}
