pub mod context;
pub mod handler;
pub mod request;
pub mod response;
pub mod scope;

pub use context::{REQUEST_ID_HEADER, RequestId, bind, request_id};
pub use handler::{Handler, ResultClosure, handler_fn};
pub use http::Method; // Use standard HTTP Method
pub use request::Request;
pub use response::Response;
pub use scope::Scope;
