use crate::{
    core::{Handler, Request, Response, context},
    error::WebError,
    middleware::Middleware,
    utils::request_id::RequestIdGenerator,
};
use http::{HeaderName, HeaderValue};
use std::sync::Arc;

/// Lowercase form of [`context::REQUEST_ID_HEADER`]; HTTP header names are
/// case-insensitive.
pub static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Adopts the caller's `X-Request-Id` or assigns a fresh one, then binds it
/// into the request scope for everything further down the chain.
#[derive(Clone)]
pub struct RequestIdMiddleware {
    generator: Arc<RequestIdGenerator>,
}

impl RequestIdMiddleware {
    pub fn new(generator: Arc<RequestIdGenerator>) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &Arc<RequestIdGenerator> {
        &self.generator
    }
}

#[async_trait::async_trait]
impl Middleware for RequestIdMiddleware {
    async fn handle(&self, mut req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
        // Caller-supplied values are trusted as-is, even if they are not UTF-8
        let existing = req
            .headers()
            .get(&REQUEST_ID)
            .filter(|v| !v.is_empty())
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        let request_id = match existing {
            Some(id) => {
                tracing::debug!(request_id = %id, "adopted caller request id");
                id
            }
            None => {
                let id = self.generator.generate();
                match HeaderValue::from_str(&id) {
                    Ok(value) => {
                        req.headers_mut().insert(REQUEST_ID.clone(), value);
                    }
                    Err(_) => {
                        tracing::warn!(request_id = %id, "generated request id is not a valid header value");
                    }
                }
                tracing::debug!(request_id = %id, "assigned request id");
                id
            }
        };

        let scope = context::bind(req.scope(), request_id);
        next.handle(req.with_scope(scope)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Method, handler_fn};
    use http::StatusCode;

    fn middleware() -> RequestIdMiddleware {
        RequestIdMiddleware::new(Arc::new(RequestIdGenerator::with_prefix("web-1/aZ3kQ9bQ1x")))
    }

    /// Echoes the header value and the scoped id as "header|scope".
    fn echo() -> Arc<dyn Handler> {
        handler_fn(|req| {
            let header = req
                .headers()
                .get("X-Request-Id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("<none>")
                .to_string();
            Ok(Response::text(StatusCode::OK, format!("{}|{}", header, req.request_id())))
        })
    }

    fn body(res: &Response) -> &str {
        std::str::from_utf8(&res.body).unwrap()
    }

    #[tokio::test]
    async fn keeps_caller_supplied_id() {
        let req = Request::new(Method::GET, "/").header("X-Request-Id", "abc123");
        let res = middleware().handle(req, echo()).await.unwrap();
        assert_eq!(body(&res), "abc123|abc123");
    }

    #[tokio::test]
    async fn trusts_malformed_ids_verbatim() {
        let req = Request::new(Method::GET, "/").header("x-request-id", "not an id; at all");
        let res = middleware().handle(req, echo()).await.unwrap();
        assert_eq!(body(&res), "not an id; at all|not an id; at all");
    }

    #[tokio::test]
    async fn trusts_non_utf8_ids_and_leaves_the_header_alone() {
        let mut req = Request::new(Method::GET, "/");
        req.headers_mut()
            .insert(REQUEST_ID.clone(), HeaderValue::from_bytes(b"ab\xffcd").unwrap());
        let raw = handler_fn(|req| {
            let raw = req
                .headers()
                .get(&REQUEST_ID)
                .map(|v| v.as_bytes().to_vec())
                .unwrap_or_default();
            Ok(Response::bytes(StatusCode::OK, raw).header("x-scoped-id", req.request_id()))
        });

        let mw = middleware();
        let res = mw.handle(req, raw).await.unwrap();
        assert_eq!(res.body.as_ref(), b"ab\xffcd");
        assert_eq!(res.headers["x-scoped-id"].as_bytes(), "ab\u{FFFD}cd".as_bytes());
        assert_eq!(mw.generator().issued(), 0);
    }

    #[tokio::test]
    async fn binds_generated_id_even_when_not_a_header_value() {
        let mw = RequestIdMiddleware::new(Arc::new(RequestIdGenerator::with_prefix("bad\nhost/x")));
        let res = mw
            .handle(Request::new(Method::GET, "/"), echo())
            .await
            .unwrap();
        assert_eq!(body(&res), "<none>|bad\nhost/x-000001");
        assert!(body(&res).ends_with("-000001"));
    }

    #[tokio::test]
    async fn generates_when_missing() {
        let mw = middleware();
        let res = mw
            .handle(Request::new(Method::GET, "/"), echo())
            .await
            .unwrap();
        assert_eq!(
            body(&res),
            "web-1/aZ3kQ9bQ1x-000001|web-1/aZ3kQ9bQ1x-000001"
        );
        assert_eq!(mw.generator().issued(), 1);
    }

    #[tokio::test]
    async fn generates_when_empty() {
        let req = Request::new(Method::GET, "/").header("x-request-id", "");
        let res = middleware().handle(req, echo()).await.unwrap();
        assert_eq!(
            body(&res),
            "web-1/aZ3kQ9bQ1x-000001|web-1/aZ3kQ9bQ1x-000001"
        );
    }

    #[tokio::test]
    async fn each_request_gets_the_next_id() {
        let mw = middleware();
        for n in 1..=3 {
            let res = mw
                .handle(Request::new(Method::GET, "/"), echo())
                .await
                .unwrap();
            let expected = format!("web-1/aZ3kQ9bQ1x-{:06}", n);
            assert_eq!(body(&res), format!("{}|{}", expected, expected));
        }
    }

    #[tokio::test]
    async fn handler_errors_pass_through_untouched() {
        let failing = handler_fn(|_req| Err(crate::error::simple(StatusCode::UNPROCESSABLE_ENTITY, "bad input")));
        let err = middleware()
            .handle(Request::new(Method::POST, "/"), failing)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(err.to_string(), "bad input");
    }

    #[tokio::test]
    async fn response_is_not_decorated() {
        let res = middleware()
            .handle(Request::new(Method::GET, "/"), echo())
            .await
            .unwrap();
        assert!(!res.headers.contains_key(&REQUEST_ID));
    }

    #[tokio::test]
    async fn outer_scope_values_survive_binding() {
        let mut req = Request::new(Method::GET, "/");
        req.set_request_share_data(7u32);
        let next = handler_fn(|req| {
            let n = req.get_request_share_data::<u32>().copied().unwrap_or_default();
            Ok(Response::text(StatusCode::OK, format!("{}:{}", n, req.request_id())))
        });
        let res = middleware().handle(req, next).await.unwrap();
        assert_eq!(body(&res), "7:web-1/aZ3kQ9bQ1x-000001");
    }
}
