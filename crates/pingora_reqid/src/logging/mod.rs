pub mod logger;
pub mod logging_middleware;

pub use logger::{Level, Logger, TracingLogger};
pub use logging_middleware::LoggingMiddleware;
