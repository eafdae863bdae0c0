use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Sink for per-request log lines; every line carries the request id.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str, request_id: &str);
}

/// Forwards to `tracing` events with a `request_id` field, dropping lines
/// below `min_level`.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    min_level: Level,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self {
            min_level: Level::Trace,
        }
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, msg: &str, request_id: &str) {
        if !self.enabled(level) {
            return;
        }
        match level {
            Level::Error => error!(request_id, "{}", msg),
            Level::Warn => warn!(request_id, "{}", msg),
            Level::Info => info!(request_id, "{}", msg),
            Level::Debug => debug!(request_id, "{}", msg),
            Level::Trace => trace!(request_id, "{}", msg),
        }
    }
}
