use std::fmt;

use http::StatusCode;

use crate::request::Request;

/// Request-scoped logger.
///
/// `RequestLog` borrows a [`Request`] so every event it emits carries the
/// request id and path. It is lifetime-bound to the request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RequestLog<'a> {
    request_id: &'a str,
    path: &'a str,
}

impl<'a> RequestLog<'a> {
    pub(crate) fn new(request: &'a Request) -> Self {
        Self {
            request_id: request.request_id(),
            path: request.path(),
        }
    }

    /// A guard let the request through to `view`.
    pub(crate) fn allowed(&self, guard: &str, view: &str) {
        tracing::debug!(
            request_id = %self.request_id,
            path = %self.path,
            guard,
            view,
            "guard passed"
        );
    }

    /// A guard short-circuited `view` with `status`.
    pub(crate) fn denied(&self, guard: &str, view: &str, status: StatusCode) {
        tracing::info!(
            request_id = %self.request_id,
            path = %self.path,
            guard,
            view,
            status = status.as_u16(),
            "guard rejected request"
        );
    }

    pub(crate) fn fixture_hit(&self, name: &str) {
        tracing::trace!(request_id = %self.request_id, fixture = name, "fixture cache hit");
    }

    pub(crate) fn fixture_computed(&self, name: &str) {
        tracing::debug!(
            request_id = %self.request_id,
            path = %self.path,
            fixture = name,
            "computed fixture"
        );
    }

    pub(crate) fn fixture_failed(&self, name: &str, error: &dyn fmt::Display) {
        tracing::warn!(
            request_id = %self.request_id,
            path = %self.path,
            fixture = name,
            error = %error,
            "fixture factory failed"
        );
    }

    /// Fixture arguments had to be resolved from the path (no dispatcher match yet).
    pub(crate) fn resolving_path(&self, urlconf: &str) {
        tracing::trace!(
            request_id = %self.request_id,
            path = %self.path,
            urlconf,
            "resolving path for fixture arguments"
        );
    }
}
