use crate::core::Response;
use http::StatusCode;

/// Trait for converting handler errors into HTTP responses.
///
/// The request-id middleware never touches these; they travel back through
/// the chain unchanged and are rendered by [`crate::App`] at the edge.
pub trait ResponseError: std::error::Error + Send + Sync {
    /// Return the HTTP status code for this error.
    ///
    /// The default implementation returns 500 Internal Server Error.
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Generate an HTTP response for this error.
    ///
    /// The default implementation creates a simple JSON response.
    fn error_response(&self) -> Response {
        let error_body = serde_json::json!({
            "error": self.to_string()
        });

        Response::json(self.status_code(), &error_body)
    }
}
