use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};

#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn text<S: Into<String>>(status: StatusCode, body: S) -> Self {
        let mut res = Self::new(status);
        res.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        res.body = Bytes::from(body.into().into_bytes());
        res
    }

    /// Construct an empty response with given status. Does not set content-type.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status)
    }

    /// Construct a raw bytes response. Does not set content-type.
    pub fn bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut res = Self::new(status);
        res.body = body.into();
        res
    }

    /// Construct a JSON response from any serializable value.
    pub fn json(status: StatusCode, value: impl serde::Serialize) -> Self {
        let mut res = Self::new(status);
        res.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        match serde_json::to_vec(&value) {
            Ok(bytes) => res.body = Bytes::from(bytes),
            Err(_) => {
                // serialization failed; return 500 with empty JSON body
                res.status = StatusCode::INTERNAL_SERVER_ERROR;
            }
        }
        res
    }

    pub fn header<K, V>(mut self, k: K, v: V) -> Self
    where
        K: TryInto<http::HeaderName>,
        V: TryInto<HeaderValue>,
    {
        if let (Ok(key), Ok(value)) = (k.try_into(), v.try_into()) {
            self.headers.insert(key, value);
        }
        self
    }
}
