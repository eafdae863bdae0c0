mod generator_error;
mod response_error;
mod web_error;

pub use generator_error::GeneratorError;
pub use response_error::ResponseError;
pub use web_error::WebError;

use http::StatusCode;

pub(crate) fn simple<T: std::fmt::Display>(status: StatusCode, msg: T) -> WebError {
    WebError::new(SimpleError::new(status, msg.to_string()))
}

/// 500 with a plain message
pub fn internal_error<T: std::fmt::Display>(msg: T) -> WebError {
    simple(StatusCode::INTERNAL_SERVER_ERROR, msg)
}

/// Status code plus message, for errors that need nothing more
#[derive(Debug)]
pub struct SimpleError {
    status: StatusCode,
    message: String,
}

impl SimpleError {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self { status, message }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SimpleError {}

impl ResponseError for SimpleError {
    fn status_code(&self) -> StatusCode {
        self.status
    }
}
