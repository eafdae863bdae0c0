//! Request identifiers for Pingora HTTP handlers and tonic RPC services.
//!
//! Every request gets an `X-Request-Id`: the caller's value when it sent one,
//! otherwise `<host>/<token>-<counter>` from a shared [`RequestIdGenerator`].
//! The id is bound into the request's [`Scope`] and read back anywhere with
//! [`request_id`].

pub mod core;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod rpc;
pub mod utils;

// Re-export commonly used types at the crate root
pub use self::core::*;
pub use error::{GeneratorError, WebError};
pub use http::StatusCode;
pub use logging::*;
pub use middleware::*;
pub use utils::request_id::{GeneratorConfig, RequestIdGenerator};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::Response as HttpResponse;
use pingora::protocols::http::ServerSession;
use pingora::server::ShutdownWatch;
use pingora_core::apps::{HttpPersistentSettings, HttpServerApp, HttpServerOptions, ReusedHttpStream};
use pingora_http::ResponseHeader;
use std::sync::Arc;

/// Default cap on a buffered request body
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// HTTP host: a root handler behind the request-id layer and any user
/// middlewares.
pub struct App {
    handler: Arc<dyn Handler>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    generator: Arc<RequestIdGenerator>,
    max_body_size: usize,
}

/// Renders handler errors into responses while the request scope is still
/// at hand, so the error log line carries the request id.
struct RenderErrors;

#[async_trait]
impl Middleware for RenderErrors {
    async fn handle(&self, req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
        let request_id = req.request_id().to_string();
        match next.handle(req).await {
            Ok(res) => Ok(res),
            Err(e) => Ok(e.into_response(&request_id)),
        }
    }
}

impl App {
    /// The request-id layer is always installed first, i.e. outermost, so
    /// every middleware added later sees the bound id.
    pub fn new(handler: Arc<dyn Handler>, generator: Arc<RequestIdGenerator>) -> Self {
        let mut s = Self {
            handler,
            middlewares: Vec::new(),
            generator: Arc::clone(&generator),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        };
        s.use_middleware(RequestIdMiddleware::new(generator));
        s.use_middleware(RenderErrors);
        s
    }

    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn generator(&self) -> &Arc<RequestIdGenerator> {
        &self.generator
    }

    /// Connections whose request body grows past `size` bytes are dropped
    pub fn max_body_size(&mut self, size: usize) {
        self.max_body_size = size;
    }

    /// Handle a request end-to-end through middlewares and the root handler.
    pub async fn handle(&self, req: Request) -> Response {
        let entry = compose(&self.middlewares, Arc::clone(&self.handler));
        let mut response = match entry.handle(req).await {
            Ok(res) => res,
            Err(e) => e.into_response(""),
        };
        self.finalize_response_headers(&mut response);
        response
    }

    /// Set content-length unless the handler already framed the body
    fn finalize_response_headers(&self, response: &mut Response) {
        if response.headers.contains_key(http::header::CONTENT_LENGTH)
            || response
                .headers
                .contains_key(http::header::TRANSFER_ENCODING)
        {
            return;
        }
        response
            .headers
            .insert(http::header::CONTENT_LENGTH, http::HeaderValue::from(response.body.len()));
    }
}

/// `content-length > 0` or any `transfer-encoding`
fn body_hinted(headers: &http::HeaderMap) -> bool {
    let has_len = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0)
        > 0;
    has_len || headers.contains_key(http::header::TRANSFER_ENCODING)
}

/// Appends `chunk` unless that would take `buf` past `limit`
fn append_capped(buf: &mut BytesMut, chunk: &[u8], limit: usize) -> bool {
    if buf.len().saturating_add(chunk.len()) > limit {
        return false;
    }
    buf.extend_from_slice(chunk);
    true
}

#[async_trait]
impl HttpServerApp for App {
    async fn process_new_http(
        self: &Arc<Self>,
        mut http: ServerSession,
        shutdown: &ShutdownWatch,
    ) -> Option<ReusedHttpStream> {
        if !(http.read_request().await.ok()?) {
            return None;
        }
        if *shutdown.borrow() {
            http.set_keepalive(None);
        } else {
            http.set_keepalive(Some(60));
        }

        let reqh = http.req_header();
        let path = String::from_utf8_lossy(reqh.raw_path()).to_string();
        let is_head = reqh.method == Method::HEAD;

        // Raw header values are copied as-is so caller ids reach the chain untouched
        let mut req = Request::new(reqh.method.clone(), path);
        for (name, value) in reqh.headers.iter() {
            req.headers_mut().append(name.clone(), value.clone());
        }

        // Only read a body when the headers announce one
        if !is_head && body_hinted(req.headers()) {
            let mut body = BytesMut::new();
            loop {
                match http.read_request_body().await {
                    Ok(Some(chunk)) => {
                        if !append_capped(&mut body, &chunk, self.max_body_size) {
                            tracing::warn!(limit = self.max_body_size, "request body too large");
                            return None;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read request body");
                        return None;
                    }
                }
            }
            if !body.is_empty() {
                req = req.with_body(body.freeze());
            }
        }

        let res = self.handle(req).await;

        let mut builder = HttpResponse::builder().status(res.status);
        for (k, v) in res.headers.iter() {
            builder = builder.header(k, v);
        }
        let (parts, _) = builder.body(()).ok()?.into_parts();
        let resp_header: ResponseHeader = parts.into();
        if http
            .write_response_header(Box::new(resp_header))
            .await
            .is_err()
        {
            return None;
        }

        let body = if is_head { Bytes::new() } else { res.body };
        if http.write_response_body(body, true).await.is_err() {
            return None;
        }

        let persistent_settings = HttpPersistentSettings::for_session(&http);
        match http.finish().await {
            Ok(c) => c.map(|s| ReusedHttpStream::new(s, Some(persistent_settings))),
            Err(_) => None,
        }
    }

    fn h2_options(&self) -> Option<pingora::protocols::http::v2::server::H2Options> {
        None
    }

    fn server_options(&self) -> Option<&HttpServerOptions> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PREFIX: &str = "web-1/aZ3kQ9bQ1x";

    fn app(handler: Arc<dyn Handler>) -> App {
        App::new(handler, Arc::new(RequestIdGenerator::with_prefix(PREFIX)))
    }

    fn text(res: &Response) -> &str {
        std::str::from_utf8(&res.body).unwrap()
    }

    struct TestLogger(Arc<Mutex<Vec<String>>>);

    impl Logger for TestLogger {
        fn log(&self, _level: Level, msg: &str, request_id: &str) {
            self.0
                .lock()
                .unwrap()
                .push(format!("{}|{}", request_id, msg));
        }
    }

    #[tokio::test]
    async fn middleware_order_and_request_id() {
        // Appends its tag to x-trace on the way out
        struct Trace(&'static str);
        #[async_trait]
        impl Middleware for Trace {
            async fn handle(&self, req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
                assert!(!req.request_id().is_empty());
                let res = next.handle(req).await?;
                let current = res
                    .headers
                    .get("x-trace")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Ok(res.header("x-trace", format!("{}{}", current, self.0)))
            }
        }

        let handler = handler_fn(|req| {
            assert!(req.headers().contains_key("x-request-id"));
            Ok(Response::text(StatusCode::OK, req.request_id().to_string()))
        });
        let mut app = app(handler);
        app.use_middleware(Trace("A>"));
        app.use_middleware(Trace("B>"));

        let res = app.handle(Request::new(Method::GET, "/ok")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.headers.get("x-trace").unwrap(), "B>A>");
        assert_eq!(text(&res), format!("{PREFIX}-000001"));
    }

    #[tokio::test]
    async fn caller_request_id_reaches_the_handler() {
        let handler = handler_fn(|req| Ok(Response::text(StatusCode::OK, req.request_id().to_string())));
        let app = app(handler);

        let res = app
            .handle(Request::new(Method::GET, "/").header("X-Request-Id", "abc123"))
            .await;
        assert_eq!(text(&res), "abc123");
        assert_eq!(app.generator().issued(), 0);
    }

    #[tokio::test]
    async fn logger_receives_request_id() {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let handler = handler_fn(|_req| Ok(Response::text(StatusCode::OK, "ok")));
        let mut app = app(handler);
        app.use_middleware(LoggingMiddleware::new(TestLogger(logs.clone())));

        let _ = app.handle(Request::new(Method::GET, "/")).await;

        let entries = logs.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with(&format!("{PREFIX}-000001|GET / -> 200")));
    }

    #[test]
    fn body_is_read_only_when_announced() {
        let mut headers = http::HeaderMap::new();
        assert!(!body_hinted(&headers));
        headers.insert(http::header::CONTENT_LENGTH, http::HeaderValue::from(0u64));
        assert!(!body_hinted(&headers));
        headers.insert(http::header::CONTENT_LENGTH, http::HeaderValue::from(12u64));
        assert!(body_hinted(&headers));

        let mut chunked = http::HeaderMap::new();
        chunked.insert(
            http::header::TRANSFER_ENCODING,
            http::HeaderValue::from_static("chunked"),
        );
        assert!(body_hinted(&chunked));
    }

    #[test]
    fn body_buffer_stops_at_the_cap() {
        let mut buf = BytesMut::new();
        assert!(append_capped(&mut buf, b"hello", 8));
        assert!(append_capped(&mut buf, b"!!!", 8));
        assert!(!append_capped(&mut buf, b"x", 8));
        assert_eq!(buf.as_ref(), b"hello!!!");
    }

    #[tokio::test]
    async fn handler_errors_render_at_the_edge() {
        let handler = handler_fn(|_req| Err(error::simple(StatusCode::NOT_FOUND, "no such thing")));
        let app = app(handler);

        let res = app.handle(Request::new(Method::GET, "/missing")).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(text(&res), r#"{"error":"no such thing"}"#);
    }

    #[tokio::test]
    async fn request_share_data_flows_alongside_request_id() {
        struct PutNum;
        #[async_trait]
        impl Middleware for PutNum {
            async fn handle(&self, mut req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
                req.set_request_share_data(7u32);
                next.handle(req).await
            }
        }

        let handler = handler_fn(|req| {
            let n = req.get_request_share_data::<u32>().copied().unwrap_or_default();
            Ok(Response::text(StatusCode::OK, format!("{}:{}", n, req.request_id())))
        });
        let mut app = app(handler);
        app.use_middleware(PutNum);

        let res = app.handle(Request::new(Method::GET, "/n")).await;
        assert_eq!(text(&res), format!("7:{PREFIX}-000001"));
    }

    #[tokio::test]
    async fn app_sets_content_length() {
        let app = app(handler_fn(|_req| Ok(Response::text(StatusCode::OK, "hello world"))));
        let res = app.handle(Request::new(Method::GET, "/text")).await;

        assert_eq!(res.headers.get(http::header::CONTENT_LENGTH).unwrap(), "11");
        assert_eq!(
            res.headers.get(http::header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn app_respects_manual_content_length() {
        let app = app(handler_fn(|_req| {
            Ok(Response::text(StatusCode::OK, "hello").header("content-length", "999"))
        }));
        let res = app.handle(Request::new(Method::GET, "/manual")).await;
        assert_eq!(res.headers.get(http::header::CONTENT_LENGTH).unwrap(), "999");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_get_distinct_ids() {
        let app = Arc::new(app(handler_fn(|req| {
            Ok(Response::text(StatusCode::OK, req.request_id().to_string()))
        })));

        let mut tasks = Vec::new();
        for _ in 0..64 {
            let app = Arc::clone(&app);
            tasks.push(tokio::spawn(async move {
                let res = app.handle(Request::new(Method::GET, "/")).await;
                text(&res).to_string()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for t in tasks {
            assert!(ids.insert(t.await.unwrap()));
        }
        assert_eq!(ids.len(), 64);
    }
}
