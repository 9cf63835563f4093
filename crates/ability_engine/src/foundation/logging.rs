//! Logging utilities
//!
//! The engine only emits through the `log` facade. Hosts pick the backend;
//! this helper wires up `env_logger` the way the arena does.

/// Initialize logging with a default filter, still overridable through `RUST_LOG`
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .is_test(cfg!(test))
        .try_init();
}
