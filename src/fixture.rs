//! Request fixtures: lazily computed, request-scoped values.
//!
//! [`FixtureMiddleware`] runs first for every request and attaches a fresh
//! [`FixtureScope`] to it. Guards and views then read fixtures through
//! [`Request::fixtures`](crate::Request::fixtures):
//!
//! ```text
//! Request (no fixtures)
//!   ↓ FixtureMiddleware::process_request
//! Request + FixtureScope (empty cache)
//!   ↓ request.fixtures()?.get::<T>("name")
//! cache hit → cached value
//! cache miss → resolve args → registry factory → store → value
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::cache::RequestCache;
use crate::error::Error;
use crate::logging::RequestLog;
use crate::registry::{FixtureRegistry, FixtureValue};
use crate::request::Request;
use crate::resolve::{UrlConfRegistry, ViewArgs};

/// Fixture state attached to one request.
///
/// Holds the request's own cache together with handles to the shared
/// registry and URL configurations.
#[derive(Clone)]
pub struct FixtureScope {
    cache: Arc<RequestCache>,
    registry: Arc<FixtureRegistry>,
    urlconfs: Arc<UrlConfRegistry>,
}

impl FixtureScope {
    /// The request's cache.
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }
}

impl fmt::Debug for FixtureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureScope")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Attaches fixture scopes to incoming requests.
///
/// Run [`process_request`](Self::process_request) before any guard or view.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use request_guard::{FixtureMiddleware, FixtureRegistry, Request, UrlConf, UrlConfRegistry};
///
/// let registry = Arc::new(FixtureRegistry::new());
/// registry.register("year", |args| args.kwarg("year").unwrap_or_default().parse::<u16>().ok());
///
/// let urls = UrlConf::new().route(r"^archive/(?P<year>\d{4})/$", "archive")?;
/// let middleware = FixtureMiddleware::new(registry, Arc::new(UrlConfRegistry::single(urls)));
///
/// let mut request = Request::new("req-1", "/archive/2024/");
/// middleware.process_request(&mut request);
///
/// let year = request.fixtures()?.get::<Option<u16>>("year")?;
/// assert_eq!(*year, Some(2024));
/// # Ok::<(), request_guard::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct FixtureMiddleware {
    registry: Arc<FixtureRegistry>,
    urlconfs: Arc<UrlConfRegistry>,
}

impl FixtureMiddleware {
    /// Creates the middleware over a shared registry and URL configurations.
    pub fn new(registry: Arc<FixtureRegistry>, urlconfs: Arc<UrlConfRegistry>) -> Self {
        Self { registry, urlconfs }
    }

    /// The shared fixture registry.
    pub fn registry(&self) -> &Arc<FixtureRegistry> {
        &self.registry
    }

    /// Attaches an empty fixture scope to `request`.
    ///
    /// Attachment happens once: a request that already carries a scope keeps
    /// it, along with everything cached so far.
    pub fn process_request(&self, request: &mut Request) {
        if request.has_fixtures() {
            tracing::trace!(request_id = %request.request_id(), "fixtures already attached");
            return;
        }
        let scope = FixtureScope {
            cache: Arc::new(RequestCache::new()),
            registry: Arc::clone(&self.registry),
            urlconfs: Arc::clone(&self.urlconfs),
        };
        request.extensions_mut().insert(scope);
    }
}

/// Reads fixtures for one request.
///
/// Obtained from [`Request::fixtures`](crate::Request::fixtures). Each
/// fixture is computed at most once per request; later reads return the
/// same value.
pub struct FixtureAccessor<'a> {
    request: &'a Request,
    scope: &'a FixtureScope,
}

impl<'a> FixtureAccessor<'a> {
    pub(crate) fn new(request: &'a Request, scope: &'a FixtureScope) -> Self {
        Self { request, scope }
    }

    /// Returns the fixture `name`, computing and caching it on first access.
    ///
    /// # Errors
    ///
    /// - [`Error::Resolution`] / [`Error::UnknownUrlConf`] if the request's
    ///   arguments cannot be resolved
    /// - [`Error::UnknownFixture`] if no factory is registered under `name`
    /// - [`Error::Fixture`] if the factory fails (nothing is cached)
    pub fn value(&self, name: &str) -> Result<FixtureValue, Error> {
        let log = RequestLog::new(self.request);

        if let Some(value) = self.scope.cache.get(name) {
            log.fixture_hit(name);
            return Ok(value);
        }

        self.scope.cache.get_or_try_insert_with(name, || {
            let args = self.resolved_args()?;
            let factory = self.scope.registry.get(name)?;
            match factory.call(&args) {
                Ok(value) => {
                    log.fixture_computed(name);
                    Ok(value)
                }
                Err(source) => {
                    log.fixture_failed(name, &source);
                    Err(Error::Fixture {
                        name: name.to_string(),
                        source,
                    })
                }
            }
        })
    }

    /// Returns the fixture `name` downcast to `T`.
    ///
    /// # Errors
    ///
    /// As [`value`](Self::value), plus [`Error::FixtureType`] if the
    /// fixture is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, Error> {
        self.value(name)?
            .downcast::<T>()
            .map_err(|_| Error::FixtureType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Returns `true` if `name` has already been computed for this request.
    pub fn is_cached(&self, name: &str) -> bool {
        self.scope.cache.contains(name)
    }

    /// The arguments fixture factories receive for this request.
    ///
    /// Uses the dispatcher's match when the request has one; otherwise
    /// resolves the path with the request's URL configuration, or the
    /// default one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] or [`Error::UnknownUrlConf`] when the
    /// fallback resolution fails.
    pub fn resolved_args(&self) -> Result<ViewArgs, Error> {
        if let Some(resolved) = self.request.resolver_match() {
            return Ok(resolved.args().clone());
        }

        let urlconfs = &self.scope.urlconfs;
        let urlconf = self.request.urlconf();
        RequestLog::new(self.request).resolving_path(urlconf.unwrap_or(urlconfs.default_id()));
        Ok(urlconfs.resolve(urlconf, self.request.path())?.into_args())
    }
}

impl fmt::Debug for FixtureAccessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureAccessor")
            .field("request_id", &self.request.request_id())
            .field("cache", &self.scope.cache)
            .finish()
    }
}
