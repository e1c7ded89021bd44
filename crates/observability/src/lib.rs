//! Tracing/logging setup shared by every bakehouse binary and test suite.

/// Initialize process-wide logging from the environment.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init() {
    tracing::init(tracing::LogConfig::from_env());
}

/// Initialize logging routed through the test harness's captured output.
pub fn init_for_tests() {
    tracing::init_for_tests();
}

/// Subscriber configuration (filter, output format).
pub mod tracing;
