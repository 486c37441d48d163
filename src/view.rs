//! Views: the request handlers guards wrap.

use std::fmt;

use http::Response;

use crate::error::Error;
use crate::request::Request;
use crate::resolve::ViewArgs;

/// A request handler producing an `http::Response<B>`.
///
/// Views receive the request and the arguments the dispatcher resolved for
/// it. Implement this directly for handler structs, or use [`view_fn`] for
/// closures. [`Guarded`](crate::Guarded) views forward [`name`](View::name)
/// and [`doc`](View::doc) to the view they wrap, so tooling sees the
/// wrapped handler.
pub trait View<B>: Send + Sync {
    /// Handles the request.
    ///
    /// # Errors
    ///
    /// Whatever the handler fails with; guards propagate it unchanged.
    fn call(&self, request: &Request, args: &ViewArgs) -> Result<Response<B>, Error>;

    /// Name of the handler, for logs and introspection.
    fn name(&self) -> &str;

    /// Human-readable description of the handler.
    fn doc(&self) -> Option<&str> {
        None
    }
}

/// A view backed by a closure. See [`view_fn`].
#[derive(Clone)]
pub struct FnView<F> {
    name: String,
    doc: Option<String>,
    f: F,
}

/// Builds a named view from a closure.
///
/// # Examples
///
/// ```
/// use http::Response;
/// use request_guard::{view_fn, Request, View, ViewArgs};
///
/// let hello = view_fn("hello", |_, args: &ViewArgs| {
///     Ok(Response::new(format!("hello {}", args.kwarg("name").unwrap_or("world"))))
/// })
/// .with_doc("Greets the caller.");
///
/// let response = hello.call(&Request::new("req-1", "/hello/"), &ViewArgs::new())?;
/// assert_eq!(response.body(), "hello world");
/// assert_eq!(hello.name(), "hello");
/// # Ok::<(), request_guard::Error>(())
/// ```
pub fn view_fn<B, F>(name: impl Into<String>, f: F) -> FnView<F>
where
    F: Fn(&Request, &ViewArgs) -> Result<Response<B>, Error> + Send + Sync,
{
    FnView {
        name: name.into(),
        doc: None,
        f,
    }
}

impl<F> FnView<F> {
    /// Attaches a description.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

impl<B, F> View<B> for FnView<F>
where
    F: Fn(&Request, &ViewArgs) -> Result<Response<B>, Error> + Send + Sync,
{
    fn call(&self, request: &Request, args: &ViewArgs) -> Result<Response<B>, Error> {
        (self.f)(request, args)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

impl<F> fmt::Debug for FnView<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnView")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}
