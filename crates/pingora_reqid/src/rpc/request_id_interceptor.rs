use async_trait::async_trait;
use std::sync::Arc;
use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::service::Interceptor;
use tonic::{Request, Response, Status};

use super::stream::{BoxServerStream, ScopedStream, StreamHandler, StreamInterceptor};
use super::unary::{UnaryHandler, UnaryInterceptor};
use super::{REQUEST_ID_METADATA, scope};
use crate::core::context;
use crate::utils::request_id::RequestIdGenerator;

/// Request-id interceptor for unary and streaming RPCs.
///
/// Adopts a non-empty `x-request-id` metadata entry verbatim or writes a
/// freshly generated one, then binds the id into the call's [`crate::Scope`].
///
/// Registered with a tonic server through
/// [`tonic::service::InterceptorLayer`] (or `InterceptedService::new`) it
/// runs once per call, unary or streaming, before the generated service sees
/// the request. The scope then travels in the request extensions.
#[derive(Clone)]
pub struct RequestIdInterceptor {
    generator: Arc<RequestIdGenerator>,
}

impl RequestIdInterceptor {
    pub fn new(generator: Arc<RequestIdGenerator>) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &Arc<RequestIdGenerator> {
        &self.generator
    }

    fn resolve(&self, metadata: &mut MetadataMap) -> String {
        let existing = metadata
            .get(REQUEST_ID_METADATA)
            .filter(|v| !v.is_empty())
            .map(|v| String::from_utf8_lossy(v.as_encoded_bytes()).into_owned());
        if let Some(id) = existing {
            tracing::debug!(request_id = %id, "adopted caller request id");
            return id;
        }

        let id = self.generator.generate();
        match id.parse::<AsciiMetadataValue>() {
            Ok(value) => {
                metadata.insert(REQUEST_ID_METADATA, value);
            }
            Err(_) => {
                tracing::warn!(request_id = %id, "generated request id is not valid metadata");
            }
        }
        tracing::debug!(request_id = %id, "assigned request id");
        id
    }

    fn bind_request<T>(&self, req: &mut Request<T>) {
        let request_id = self.resolve(req.metadata_mut());
        let base = scope(req).cloned().unwrap_or_default();
        req.extensions_mut().insert(context::bind(&base, request_id));
    }
}

impl Interceptor for RequestIdInterceptor {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        self.bind_request(&mut req);
        Ok(req)
    }
}

#[async_trait]
impl<Req, Resp> UnaryInterceptor<Req, Resp> for RequestIdInterceptor
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn intercept(
        &self,
        mut req: Request<Req>,
        next: Arc<dyn UnaryHandler<Req, Resp>>,
    ) -> Result<Response<Resp>, Status> {
        self.bind_request(&mut req);
        next.call(req).await
    }
}

#[async_trait]
impl<I, O> StreamInterceptor<I, O> for RequestIdInterceptor
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn intercept(
        &self,
        stream: BoxServerStream<I, O>,
        next: Arc<dyn StreamHandler<I, O>>,
    ) -> Result<(), Status> {
        let mut metadata = stream.metadata().clone();
        let request_id = self.resolve(&mut metadata);
        let scope = context::bind(stream.scope(), request_id);
        next.handle(Box::new(ScopedStream::new(stream, scope, metadata)))
            .await
    }
}
