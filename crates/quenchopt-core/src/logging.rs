//! Injected logging for optimizers.
//!
//! Optimizers never write to a process-wide logger. They receive a
//! [`Logger`] through their configuration and report diagnostics through it.
//! Three implementations are provided:
//!
//! - [`NoOpLogger`]: discards everything (the default)
//! - [`TracingLogger`]: forwards to the `tracing` crate under the `quenchopt` target
//! - [`MemoryLogger`]: keeps every record in memory for later inspection

use parking_lot::Mutex;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Fine-grained diagnostics
    Debug,
    /// Progress information
    Info,
    /// Recoverable numerical trouble
    Warn,
    /// Run-terminating failures
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Sink for optimizer diagnostics.
///
/// Implementors only need [`Logger::log`]; the level-specific helpers
/// forward to it.
pub trait Logger: Debug + Send + Sync {
    /// Records a message at the given level.
    fn log(&self, level: Level, message: &str);

    /// Records a debug message.
    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    /// Records an informational message.
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Records a warning.
    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    /// Records an error.
    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Shared handle to a logger, as stored in optimizer configurations.
pub type SharedLogger = Arc<dyn Logger>;

/// A logger that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _level: Level, _message: &str) {}
}

/// A logger that forwards records to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "quenchopt", "{message}"),
            Level::Info => tracing::info!(target: "quenchopt", "{message}"),
            Level::Warn => tracing::warn!(target: "quenchopt", "{message}"),
            Level::Error => tracing::error!(target: "quenchopt", "{message}"),
        }
    }
}

/// A logger that stores every record in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    /// Creates an empty memory logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all records so far.
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().clone()
    }

    /// Returns the messages logged at `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Returns `true` if any record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    /// Discards all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        self.records.lock().push((level, message.to_owned()));
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Returns the default logger handle.
pub fn no_op() -> SharedLogger {
    Arc::new(NoOpLogger)
}
