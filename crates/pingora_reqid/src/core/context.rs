//! Carries the request identifier through a [`Scope`].

use std::fmt;
use std::sync::Arc;

use crate::core::Scope;

/// Header carrying the request identifier on the wire.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Identifier bound into a request's scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn new<S: Into<Arc<str>>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier bound into `scope`, if any
    pub fn from_scope(scope: &Scope) -> Option<&RequestId> {
        scope.get::<RequestId>()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Derive a scope carrying `id`. `scope` itself is not modified.
pub fn bind<I: Into<RequestId>>(scope: &Scope, id: I) -> Scope {
    scope.with(id.into())
}

/// The identifier bound into `scope`, or `""` when there is no scope or
/// nothing was bound.
pub fn request_id(scope: Option<&Scope>) -> &str {
    scope
        .and_then(RequestId::from_scope)
        .map(RequestId::as_str)
        .unwrap_or("")
}
