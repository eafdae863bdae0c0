pub mod request_id;

pub use request_id::{FALLBACK_HOSTNAME, GeneratorConfig, RequestIdGenerator, TOKEN_LEN};
