//! URL resolution: turning a request path into view arguments.
//!
//! The host's dispatcher normally resolves the path once and stores the
//! [`ResolverMatch`] on the request. The fixture accessor reuses that match;
//! when it runs before dispatch (for example from middleware) it falls back
//! to resolving the path itself through a [`UrlConfRegistry`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::config::Settings;
use crate::error::Error;

/// Positional and keyword arguments extracted from a request path.
///
/// These are the arguments a dispatcher passes to a view, and the inputs
/// handed to every fixture factory. An optional group that did not take part
/// in the match still occupies its slot, so `arg(i)` always refers to the
/// same group of a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewArgs {
    args: Vec<Option<String>>,
    kwargs: BTreeMap<String, Option<String>>,
}

impl ViewArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an argument set from present values only.
    pub fn from_parts(args: Vec<String>, kwargs: BTreeMap<String, String>) -> Self {
        Self {
            args: args.into_iter().map(Some).collect(),
            kwargs: kwargs.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        }
    }

    /// Appends a positional argument.
    pub fn with_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Some(value.into()));
        self
    }

    /// Appends a positional slot for a group that did not match.
    pub fn with_missing_arg(mut self) -> Self {
        self.args.push(None);
        self
    }

    /// Adds (or replaces) a keyword argument.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), Some(value.into()));
        self
    }

    /// Adds (or replaces) a keyword argument whose group did not match.
    pub fn with_missing_kwarg(mut self, key: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), None);
        self
    }

    /// Positional arguments in group order; `None` marks an unmatched group.
    pub fn args(&self) -> &[Option<String>] {
        &self.args
    }

    /// Keyword arguments by group name; `None` marks an unmatched group.
    pub fn kwargs(&self) -> &BTreeMap<String, Option<String>> {
        &self.kwargs
    }

    /// Returns the positional argument at `index`, if its group matched.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index)?.as_deref()
    }

    /// Returns the keyword argument named `key`, if its group matched.
    pub fn kwarg(&self, key: &str) -> Option<&str> {
        self.kwargs.get(key)?.as_deref()
    }

    /// Returns `true` if the pattern has a group named `key`, matched or not.
    pub fn has_kwarg(&self, key: &str) -> bool {
        self.kwargs.contains_key(key)
    }

    /// Returns `true` if there are no arguments of either kind.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }
}

/// The outcome of resolving a path: the matched route and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverMatch {
    route: Option<String>,
    args: ViewArgs,
}

impl ResolverMatch {
    /// Creates a match for an optionally named route.
    pub fn new(route: Option<String>, args: ViewArgs) -> Self {
        Self { route, args }
    }

    /// Name of the matched route, if it has one.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Arguments extracted by the match.
    pub fn args(&self) -> &ViewArgs {
        &self.args
    }

    /// Consumes the match, returning its arguments.
    pub fn into_args(self) -> ViewArgs {
        self.args
    }
}

/// Resolves request paths to view arguments.
///
/// Implement this to plug a host framework's router in place of [`UrlConf`].
pub trait UrlResolver: Send + Sync {
    /// Resolves `path` (as received, including any leading `/`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if no route matches.
    fn resolve(&self, path: &str) -> Result<ResolverMatch, Error>;
}

struct Route {
    regex: Regex,
    name: Option<String>,
}

impl Route {
    fn extract(&self, path: &str) -> Option<ResolverMatch> {
        let caps = self.regex.captures(path)?;

        let mut args = ViewArgs::new();
        let named: Vec<&str> = self.regex.capture_names().flatten().collect();
        if named.is_empty() {
            args.args = caps
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect();
        } else {
            args.kwargs = named
                .into_iter()
                .map(|name| {
                    let value = caps.name(name).map(|m| m.as_str().to_string());
                    (name.to_string(), value)
                })
                .collect();
        }

        Some(ResolverMatch::new(self.name.clone(), args))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.regex.as_str())
            .field("name", &self.name)
            .finish()
    }
}

/// An ordered list of regex routes.
///
/// Patterns are matched against the path with its leading `/` removed, and
/// the first matching route wins. When a pattern has named groups, those
/// become keyword arguments and no positional arguments are produced;
/// otherwise every group becomes a positional argument. Groups that did not
/// take part in the match are kept as missing values.
///
/// # Examples
///
/// ```
/// use request_guard::{UrlConf, UrlResolver};
///
/// let conf = UrlConf::new()
///     .route(r"^articles/(?P<year>[0-9]{4})/$", "article-year")?
///     .route(r"^tags/([a-z]+)/$", "tag")?;
///
/// let m = conf.resolve("/articles/2024/")?;
/// assert_eq!(m.route(), Some("article-year"));
/// assert_eq!(m.args().kwarg("year"), Some("2024"));
///
/// let m = conf.resolve("/tags/rust/")?;
/// assert_eq!(m.args().arg(0), Some("rust"));
/// # Ok::<(), request_guard::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct UrlConf {
    routes: Vec<Route>,
}

impl UrlConf {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named route.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if `pattern` is not a valid regex.
    pub fn route(self, pattern: &str, name: impl Into<String>) -> Result<Self, Error> {
        self.push(pattern, Some(name.into()))
    }

    /// Appends a route without a name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if `pattern` is not a valid regex.
    pub fn unnamed_route(self, pattern: &str) -> Result<Self, Error> {
        self.push(pattern, None)
    }

    fn push(mut self, pattern: &str, name: Option<String>) -> Result<Self, Error> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.routes.push(Route { regex, name });
        Ok(self)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if there are no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl UrlResolver for UrlConf {
    fn resolve(&self, path: &str) -> Result<ResolverMatch, Error> {
        let relative = path.strip_prefix('/').unwrap_or(path);
        self.routes
            .iter()
            .find_map(|route| route.extract(relative))
            .ok_or_else(|| Error::Resolution {
                path: path.to_string(),
            })
    }
}

/// URL configurations by id, with one designated default.
///
/// A request may name its own configuration (see
/// [`Request::set_urlconf`](crate::Request::set_urlconf)); otherwise the
/// default from [`Settings::root_urlconf`] applies.
#[derive(Clone)]
pub struct UrlConfRegistry {
    default_id: String,
    confs: HashMap<String, Arc<dyn UrlResolver>>,
}

impl UrlConfRegistry {
    /// Creates an empty registry whose default id comes from `settings`.
    pub fn new(settings: &Settings) -> Self {
        Self {
            default_id: settings.root_urlconf().to_string(),
            confs: HashMap::new(),
        }
    }

    /// Creates a registry holding only `resolver`, registered as the default.
    pub fn single(resolver: impl UrlResolver + 'static) -> Self {
        Self::new(&Settings::default()).with_default(resolver)
    }

    /// Registers `resolver` under `id`, replacing any previous one.
    pub fn with(mut self, id: impl Into<String>, resolver: impl UrlResolver + 'static) -> Self {
        self.confs.insert(id.into(), Arc::new(resolver));
        self
    }

    /// Registers `resolver` under the default id.
    pub fn with_default(self, resolver: impl UrlResolver + 'static) -> Self {
        let id = self.default_id.clone();
        self.with(id, resolver)
    }

    /// The id used when a request carries no override.
    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// Resolves `path` with the configuration `urlconf`, or the default one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownUrlConf`] if the configuration id is not
    /// registered, or [`Error::Resolution`] if no route matches.
    pub fn resolve(&self, urlconf: Option<&str>, path: &str) -> Result<ResolverMatch, Error> {
        let id = urlconf.unwrap_or(&self.default_id);
        let resolver = self.confs.get(id).ok_or_else(|| Error::UnknownUrlConf {
            id: id.to_string(),
        })?;
        resolver.resolve(path)
    }
}

impl fmt::Debug for UrlConfRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.confs.keys().collect();
        ids.sort();
        f.debug_struct("UrlConfRegistry")
            .field("default_id", &self.default_id)
            .field("confs", &ids)
            .finish()
    }
}
