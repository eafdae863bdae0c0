use crate::core::{Handler, Request, Response};
use crate::{error::WebError, middleware::Middleware};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{Instrument, info};

/// Opens a span per request carrying the scoped request id, so every event
/// emitted further down the chain is tagged with it.
///
/// Must sit inside [`super::RequestIdMiddleware`]; [`crate::App`] arranges that.
#[derive(Clone, Default)]
pub struct TracingMiddleware;

impl TracingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(&self, req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
        let span = tracing::info_span!(
            "request",
            request_id = req.request_id(),
            method = req.method().as_str(),
            path = req.path(),
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        );
        let span_for_record = span.clone();

        async move {
            info!("request started");
            let start_time = std::time::Instant::now();

            let res = next.handle(req).await;

            span_for_record.record("latency_ms", start_time.elapsed().as_millis() as u64);
            if let Ok(res) = &res {
                span_for_record.record("status", res.status.as_u16());
            }
            info!(ok = res.is_ok(), "request completed");
            res
        }
        .instrument(span)
        .await
    }
}
