use super::ResponseError;
use crate::core::Response;

/// Error returned by HTTP handlers, wrapping any [`ResponseError`].
#[derive(Debug)]
pub struct WebError {
    inner: Box<dyn ResponseError>,
}

impl WebError {
    /// Create a new WebError from any ResponseError
    #[track_caller]
    pub fn new<T: ResponseError + 'static>(err: T) -> Self {
        Self {
            inner: Box::new(err),
        }
    }

    /// Get a reference to the underlying ResponseError
    pub fn as_response_error(&self) -> &dyn ResponseError {
        &*self.inner
    }

    /// Convert this error into an HTTP response, logging it under `request_id`
    pub fn into_response(self, request_id: &str) -> Response {
        tracing::error!(
            request_id,
            status_code = %self.inner.status_code(),
            error = %self.inner,
            "handler failed",
        );

        // Generate the response
        self.inner.error_response()
    }
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl From<crate::error::SimpleError> for WebError {
    #[track_caller]
    fn from(err: crate::error::SimpleError) -> Self {
        Self::new(err)
    }
}

// Implement ResponseError for WebError to allow nested errors
impl ResponseError for WebError {
    fn status_code(&self) -> http::StatusCode {
        self.inner.status_code()
    }

    fn error_response(&self) -> Response {
        self.inner.error_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimpleError;
    use http::StatusCode;

    #[test]
    fn test_web_error_creation() {
        let simple_err = SimpleError::new(StatusCode::BAD_REQUEST, "Test error".to_string());
        let web_err = WebError::new(simple_err);

        assert_eq!(
            web_err.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(web_err.to_string(), "Test error");
    }

    #[test]
    fn test_into_response_renders_json_body() {
        let web_err = crate::error::simple(StatusCode::FORBIDDEN, "no access");
        let res = web_err.into_response("req-1");
        assert_eq!(res.status, StatusCode::FORBIDDEN);
        assert_eq!(res.body.as_ref(), br#"{"error":"no access"}"#);
    }

    #[test]
    fn test_web_error_from_conversion() {
        let simple_err = SimpleError::new(StatusCode::BAD_REQUEST, "Test error".to_string());
        let web_err: WebError = simple_err.into();

        assert_eq!(
            web_err.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
