//! Logging initialization

pub use log::{debug, error, info, trace, warn};

/// Initialize logging from the environment. Call once at startup.
pub fn init() {
    env_logger::init();
}

/// Initialize logging inside a test, capturing output per test.
/// Safe to call from every test; only the first call takes effect.
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
