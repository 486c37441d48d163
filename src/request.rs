use http::Extensions;

use crate::error::Error;
use crate::fixture::{FixtureAccessor, FixtureScope};
use crate::resolve::ResolverMatch;

/// An authenticated user or service principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Unique identifier for this principal
    pub id: String,
    /// Display name
    pub name: String,
}

impl Principal {
    /// Creates a principal.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One inbound request, as seen by guards and fixtures.
///
/// The host framework builds a `Request` and owns it for the whole
/// dispatch. Guards only read it; [`FixtureMiddleware`](crate::FixtureMiddleware)
/// attaches the request's fixture scope to this instance.
///
/// # Examples
///
/// ```
/// use request_guard::{Principal, Request};
///
/// let mut request = Request::new("req-1", "/articles/2024/");
/// assert!(!request.is_authenticated());
///
/// request.set_principal(Some(Principal::new("u1", "Alice")));
/// assert!(request.is_authenticated());
/// ```
#[derive(Debug)]
pub struct Request {
    request_id: String,
    path: String,
    urlconf: Option<String>,
    resolver_match: Option<ResolverMatch>,
    principal: Option<Principal>,
    extensions: Extensions,
}

impl Request {
    /// Creates a request for `path`. Everything else starts empty.
    pub fn new(request_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            path: path.into(),
            urlconf: None,
            resolver_match: None,
            principal: None,
            extensions: Extensions::new(),
        }
    }

    /// Builds a request from an `http` request.
    ///
    /// The path is taken from the URI and the extensions are copied. If an
    /// upstream layer stored a [`Principal`] or a [`ResolverMatch`] in the
    /// extensions they are picked up as well. Fixtures are never carried
    /// over: the new request starts without a scope of its own.
    pub fn from_http<B>(request_id: impl Into<String>, req: &http::Request<B>) -> Self {
        let mut request = Self::new(request_id, req.uri().path());
        request.principal = req.extensions().get::<Principal>().cloned();
        request.resolver_match = req.extensions().get::<ResolverMatch>().cloned();
        request.extensions = req.extensions().clone();
        request.extensions.remove::<FixtureScope>();
        request
    }

    /// Request identifier used for log correlation.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sets the authenticated principal.
    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// Returns the authenticated principal, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Login check: `true` if a principal is present.
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Overrides the URL configuration used to resolve this request.
    pub fn set_urlconf(&mut self, urlconf: Option<String>) {
        self.urlconf = urlconf;
    }

    /// The per-request URL configuration id, if overridden.
    pub fn urlconf(&self) -> Option<&str> {
        self.urlconf.as_deref()
    }

    /// Stores the dispatcher's resolution of this request.
    pub fn set_resolver_match(&mut self, resolver_match: Option<ResolverMatch>) {
        self.resolver_match = resolver_match;
    }

    /// The dispatcher's resolution of this request, if already done.
    pub fn resolver_match(&self) -> Option<&ResolverMatch> {
        self.resolver_match.as_ref()
    }

    /// Arbitrary values attached to this request.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable access to the attached values.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Returns `true` once fixtures have been attached by the middleware.
    pub fn has_fixtures(&self) -> bool {
        self.extensions.get::<FixtureScope>().is_some()
    }

    /// Returns the fixture accessor for this request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FixturesNotAttached`] if
    /// [`FixtureMiddleware::process_request`](crate::FixtureMiddleware::process_request)
    /// has not run for this request.
    pub fn fixtures(&self) -> Result<FixtureAccessor<'_>, Error> {
        self.extensions
            .get::<FixtureScope>()
            .map(|scope| FixtureAccessor::new(self, scope))
            .ok_or(Error::FixturesNotAttached)
    }
}
