//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Later calls are ignored, so both tests and binaries may call this.
pub fn init() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
