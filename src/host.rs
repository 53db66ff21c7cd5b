//! Host Embedding
//!
//! When the service is embedded in a gateway process, origin decisions and
//! log emission belong to the host. [`Gateway`] is the facility the host
//! provides; [`EventLog`] routes component log lines either to `tracing` or
//! to the host.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

/// Prefix added to every line forwarded to a host log.
pub const LOG_PREFIX: &str = "[plugin-gravatar]";

// == Log Level ==
/// Severity understood by host log facilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

// == Gateway ==
/// Facilities offered by a host process that embeds this service.
pub trait Gateway: Send + Sync {
    /// Host decision on whether a client origin may use its endpoints.
    fn is_client_origin_allowed(&self, origin: &str) -> bool;

    /// Emits a log line through the host.
    fn log(&self, level: LogLevel, message: &str);
}

// == Event Log ==
/// Destination for component log lines, fixed at construction.
#[derive(Clone, Default)]
pub enum EventLog {
    /// Standalone: emit through `tracing`
    #[default]
    Tracing,
    /// Embedded: forward to the host
    Host(Arc<dyn Gateway>),
}

impl EventLog {
    pub fn debug(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Error, message);
    }

    fn emit(&self, level: LogLevel, message: impl fmt::Display) {
        match self {
            EventLog::Tracing => match level {
                LogLevel::Debug => debug!("{}", message),
                LogLevel::Info => info!("{}", message),
                LogLevel::Warn => warn!("{}", message),
                LogLevel::Error => error!("{}", message),
            },
            EventLog::Host(gateway) => {
                gateway.log(level, &format!("{} {}", LOG_PREFIX, message));
            }
        }
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLog::Tracing => f.write_str("EventLog::Tracing"),
            EventLog::Host(_) => f.write_str("EventLog::Host"),
        }
    }
}
