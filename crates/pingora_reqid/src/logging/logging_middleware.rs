use crate::{
    core::{Handler, Request, Response},
    error::WebError,
    logging::{Level, Logger},
    middleware::Middleware,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Logs one completion line per request, tagged with the scoped request id
pub struct LoggingMiddleware {
    logger: Arc<dyn Logger>,
}

impl LoggingMiddleware {
    pub fn new<L: Logger + 'static>(logger: L) -> Self {
        Self {
            logger: Arc::new(logger),
        }
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
        let start_time = std::time::Instant::now();
        let method = req.method().clone();
        let path = req.path().to_string();
        let request_id = req.request_id().to_string();

        let res = next.handle(req).await;

        let elapsed = start_time.elapsed().as_millis();
        let (level, outcome) = match &res {
            Ok(r) => (Level::Info, r.status.as_u16().to_string()),
            Err(e) => (Level::Warn, format!("{} ({})", e.as_response_error().status_code().as_u16(), e)),
        };
        let msg = format!("{} {} -> {} in {}ms", method.as_str(), path, outcome, elapsed);
        self.logger.log(level, &msg, &request_id);

        res
    }
}
