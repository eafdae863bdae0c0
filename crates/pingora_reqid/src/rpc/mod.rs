//! Request-id propagation for tonic RPC handlers.
//!
//! Unary calls keep their [`Scope`] in the `tonic::Request` extensions;
//! streaming calls expose it through [`ServerStream::scope`].

pub mod request_id_interceptor;
pub mod stream;
pub mod unary;

pub use request_id_interceptor::RequestIdInterceptor;
pub use stream::{
    BoxServerStream, ChannelServerStream, ScopedStream, ServerStream, StreamHandler,
    StreamInterceptor, compose_stream,
};
pub use unary::{UnaryHandler, UnaryInterceptor, compose_unary};

use crate::core::{Scope, context};

/// Metadata key for the request id. gRPC metadata keys are lowercase.
pub const REQUEST_ID_METADATA: &str = "x-request-id";

/// Scope attached to a unary request, if an interceptor bound one
pub fn scope<T>(req: &tonic::Request<T>) -> Option<&Scope> {
    req.extensions().get::<Scope>()
}

/// Request id bound to a unary request, `""` if none
pub fn request_id<T>(req: &tonic::Request<T>) -> &str {
    context::request_id(scope(req))
}
