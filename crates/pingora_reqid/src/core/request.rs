use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Uri};

use crate::core::Scope;
use crate::core::context;

#[derive(Debug)]
pub struct Request {
    pub inner: http::Request<Bytes>,
    scope: Scope, // request-level data, request id included
}

impl Request {
    pub fn new<M: Into<Method>, S: AsRef<str>>(method: M, path: S) -> Self {
        let mut inner = http::Request::new(Bytes::new());
        *inner.method_mut() = method.into();
        *inner.uri_mut() = path.as_ref().parse().unwrap_or_else(|_| Uri::from_static("/"));

        Self {
            inner,
            scope: Scope::new(),
        }
    }

    pub fn header<K, V>(mut self, k: K, v: V) -> Self
    where
        K: TryInto<http::HeaderName>,
        V: TryInto<HeaderValue>,
    {
        if let (Ok(key), Ok(value)) = (k.try_into(), v.try_into()) {
            self.inner.headers_mut().insert(key, value);
        }
        self
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        *self.inner.body_mut() = body.into();
        self
    }

    // Convenience accessors for the inner http::Request
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap<HeaderValue> {
        self.inner.headers_mut()
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    // --- Request scope ---
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Replace the request scope, e.g. with one derived from the current one
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn set_request_share_data<T: Send + Sync + 'static>(&mut self, value: T) {
        self.scope = self.scope.with(value);
    }

    pub fn get_request_share_data<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.scope.get::<T>()
    }

    /// Request identifier bound by the request-id middleware, `""` if none
    pub fn request_id(&self) -> &str {
        context::request_id(Some(&self.scope))
    }
}
