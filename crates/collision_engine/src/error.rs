//! Error types and the injected error accumulator
//!
//! API-level failures are returned as [`CollisionError`]. Failures that happen
//! on the worker thread have no caller to return to, so they are recorded in
//! an [`ErrorLog`] handed to the system at construction.

use std::sync::{Arc, Mutex, PoisonError};

use crate::collision::{ShapeId, ShapeValidationError};
use crate::config::ConfigError;
use crate::system::dump::DumpError;

/// Errors returned by the collision system API
#[derive(thiserror::Error, Debug)]
pub enum CollisionError {
    /// The worker has not been started
    #[error("collision system is not initialized")]
    NotInitialized,

    /// `initialize` was called on a running system
    #[error("collision system is already initialized")]
    AlreadyInitialized,

    /// A shape failed validation
    #[error("invalid shape: {0}")]
    InvalidShape(#[from] ShapeValidationError),

    /// Add flags contained unknown bits
    #[error("invalid add flags: {0:#x}")]
    InvalidAddFlags(u32),

    /// The world bound is inverted or not finite
    #[error("invalid world bounds")]
    InvalidWorldBounds,

    /// No live shape has this handle
    #[error("unknown shape {0}")]
    UnknownShape(ShapeId),

    /// The worker thread could not be started
    #[error("failed to spawn collision worker: {0}")]
    WorkerSpawn(std::io::Error),

    /// The configuration was rejected
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Dump or restore failed
    #[error("dump error: {0}")]
    Dump(#[from] DumpError),
}

/// Shared, thread-safe list of error messages
///
/// Cloning yields another handle to the same list. Every recorded message is
/// also emitted through `log::error!`.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message
    pub fn add_error_message(&self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{message}");
        self.lock().push(message);
    }

    /// Record any displayable error
    pub fn record(&self, error: &dyn std::error::Error) {
        self.add_error_message(error.to_string());
    }

    /// Number of recorded messages
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every recorded message, oldest first
    pub fn all_error_messages(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Most recent message
    pub fn last_error_message(&self) -> Option<String> {
        self.lock().last().cloned()
    }

    /// Forget every recorded message
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_log_is_shared_between_clones() {
        let log = ErrorLog::new();
        let other = log.clone();

        other.add_error_message("first");
        log.record(&CollisionError::NotInitialized);

        assert_eq!(log.count(), 2);
        assert_eq!(
            other.all_error_messages(),
            vec!["first".to_string(), "collision system is not initialized".to_string()]
        );
        assert_eq!(log.last_error_message().as_deref(), Some("collision system is not initialized"));

        log.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn test_error_log_across_threads() {
        let log = ErrorLog::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || log.add_error_message(format!("thread {i}")))
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }
        assert_eq!(log.count(), 4);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(CollisionError::InvalidAddFlags(0x10).to_string(), "invalid add flags: 0x10");
        assert_eq!(
            CollisionError::UnknownShape(ShapeId::none()).to_string(),
            "unknown shape shape#none"
        );
    }
}
