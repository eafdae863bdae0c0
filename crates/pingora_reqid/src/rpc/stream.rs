//! Server-streaming and bidirectional RPC shapes.
//!
//! A [`ServerStream`] is the handler's view of one live stream: its scope,
//! its metadata and the two message directions. Interceptors that need to
//! change what the handler sees wrap the stream in a decorator such as
//! [`ScopedStream`] instead of mutating it.

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream::BoxStream};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Status, metadata::MetadataMap};

use crate::core::Scope;

#[async_trait]
pub trait ServerStream: Send {
    type Inbound: Send + 'static;
    type Outbound: Send + 'static;

    /// Scope that lives as long as the stream
    fn scope(&self) -> &Scope;

    fn metadata(&self) -> &MetadataMap;

    /// Next client message, `None` once the client half-closes
    async fn recv(&mut self) -> Result<Option<Self::Inbound>, Status>;

    async fn send(&mut self, message: Self::Outbound) -> Result<(), Status>;
}

pub type BoxServerStream<I, O> = Box<dyn ServerStream<Inbound = I, Outbound = O>>;

#[async_trait]
impl<S: ServerStream + ?Sized> ServerStream for Box<S> {
    type Inbound = S::Inbound;
    type Outbound = S::Outbound;

    fn scope(&self) -> &Scope {
        (**self).scope()
    }

    fn metadata(&self) -> &MetadataMap {
        (**self).metadata()
    }

    async fn recv(&mut self) -> Result<Option<Self::Inbound>, Status> {
        (**self).recv().await
    }

    async fn send(&mut self, message: Self::Outbound) -> Result<(), Status> {
        (**self).send(message).await
    }
}

/// Decorator that substitutes scope and metadata and forwards messages to
/// the wrapped stream unchanged.
pub struct ScopedStream<S> {
    inner: S,
    scope: Scope,
    metadata: MetadataMap,
}

impl<S: ServerStream> ScopedStream<S> {
    pub fn new(inner: S, scope: Scope, metadata: MetadataMap) -> Self {
        Self {
            inner,
            scope,
            metadata,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: ServerStream> ServerStream for ScopedStream<S> {
    type Inbound = S::Inbound;
    type Outbound = S::Outbound;

    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    async fn recv(&mut self) -> Result<Option<Self::Inbound>, Status> {
        self.inner.recv().await
    }

    async fn send(&mut self, message: Self::Outbound) -> Result<(), Status> {
        self.inner.send(message).await
    }
}

/// [`ServerStream`] over a tonic request stream and an mpsc channel whose
/// receiving half is returned to tonic as the response stream.
pub struct ChannelServerStream<I, O> {
    inbound: BoxStream<'static, Result<I, Status>>,
    outbound: mpsc::Sender<Result<O, Status>>,
    metadata: MetadataMap,
    scope: Scope,
}

impl<I, O> ChannelServerStream<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<St>(
        metadata: MetadataMap,
        scope: Scope,
        inbound: St,
        outbound: mpsc::Sender<Result<O, Status>>,
    ) -> Self
    where
        St: Stream<Item = Result<I, Status>> + Send + 'static,
    {
        Self {
            inbound: inbound.boxed(),
            outbound,
            metadata,
            scope,
        }
    }

    /// Split a tonic streaming request into a handler-side stream and the
    /// response stream to hand back from the service method. A [`Scope`] in
    /// the request extensions is carried over.
    pub fn from_request<St>(
        request: Request<St>,
        buffer: usize,
    ) -> (Self, ReceiverStream<Result<O, Status>>)
    where
        St: Stream<Item = Result<I, Status>> + Send + 'static,
    {
        let (metadata, extensions, inbound) = request.into_parts();
        let scope = extensions.get::<Scope>().cloned().unwrap_or_default();
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(metadata, scope, inbound, tx), ReceiverStream::new(rx))
    }
}

#[async_trait]
impl<I, O> ServerStream for ChannelServerStream<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    type Inbound = I;
    type Outbound = O;

    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    async fn recv(&mut self) -> Result<Option<I>, Status> {
        self.inbound.next().await.transpose()
    }

    async fn send(&mut self, message: O) -> Result<(), Status> {
        self.outbound
            .send(Ok(message))
            .await
            .map_err(|_| Status::cancelled("response stream closed"))
    }
}

/// A streaming RPC endpoint; it owns the stream for its whole lifetime.
#[async_trait]
pub trait StreamHandler<I, O>: Send + Sync + 'static
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn handle(&self, stream: BoxServerStream<I, O>) -> Result<(), Status>;
}

#[async_trait]
pub trait StreamInterceptor<I, O>: Send + Sync + 'static
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn intercept(
        &self,
        stream: BoxServerStream<I, O>,
        next: Arc<dyn StreamHandler<I, O>>,
    ) -> Result<(), Status>;
}

struct InterceptedStream<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    interceptor: Arc<dyn StreamInterceptor<I, O>>,
    next: Arc<dyn StreamHandler<I, O>>,
}

#[async_trait]
impl<I, O> StreamHandler<I, O> for InterceptedStream<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn handle(&self, stream: BoxServerStream<I, O>) -> Result<(), Status> {
        self.interceptor.intercept(stream, Arc::clone(&self.next)).await
    }
}

/// Wrap `handler` in `interceptors`; the first interceptor is the outermost.
pub fn compose_stream<I, O>(
    interceptors: &[Arc<dyn StreamInterceptor<I, O>>],
    handler: Arc<dyn StreamHandler<I, O>>,
) -> Arc<dyn StreamHandler<I, O>>
where
    I: Send + 'static,
    O: Send + 'static,
{
    interceptors.iter().rev().fold(handler, |next, interceptor| {
        Arc::new(InterceptedStream {
            interceptor: Arc::clone(interceptor),
            next,
        })
    })
}
