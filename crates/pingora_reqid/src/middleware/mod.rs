#![allow(clippy::module_inception)]
pub mod middleware;
pub mod request_id_middleware;
pub mod tracing_middleware;

pub use middleware::{Middleware, compose};
pub use request_id_middleware::{REQUEST_ID, RequestIdMiddleware};
pub use tracing_middleware::TracingMiddleware;
