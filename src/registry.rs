//! Fixture registry: fixture names mapped to factory functions.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, FixtureError};
use crate::resolve::ViewArgs;

/// A computed fixture value.
///
/// Values are shared, so two reads of the same fixture within a request
/// return the same allocation.
pub type FixtureValue = Arc<dyn Any + Send + Sync>;

type FactoryFn = dyn Fn(&ViewArgs) -> Result<FixtureValue, FixtureError> + Send + Sync;

/// A fixture factory: computes a value from a request's resolved arguments.
#[derive(Clone)]
pub struct Factory {
    inner: Arc<FactoryFn>,
}

impl Factory {
    /// Wraps an infallible factory.
    pub fn new<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ViewArgs) -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |args: &ViewArgs| -> Result<FixtureValue, FixtureError> {
                Ok(Arc::new(f(args)))
            }),
        }
    }

    /// Wraps a factory that can fail.
    pub fn fallible<T, E, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<FixtureError>,
        F: Fn(&ViewArgs) -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |args: &ViewArgs| -> Result<FixtureValue, FixtureError> {
                f(args)
                    .map(|value| Arc::new(value) as FixtureValue)
                    .map_err(Into::into)
            }),
        }
    }

    /// Invokes the factory.
    pub fn call(&self, args: &ViewArgs) -> Result<FixtureValue, FixtureError> {
        (self.inner)(args)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory")
    }
}

/// Registered fixture factories by name.
///
/// One registry is typically built at startup and shared through an `Arc`
/// with the [`FixtureMiddleware`](crate::FixtureMiddleware). Registering a
/// name twice replaces the earlier factory; there is no removal.
///
/// # Examples
///
/// ```
/// use request_guard::FixtureRegistry;
///
/// let registry = FixtureRegistry::new();
/// registry.register("year", |args| args.kwarg("year").unwrap_or("").to_string());
///
/// assert!(registry.contains("year"));
/// assert!(registry.get("month").is_err());
/// ```
#[derive(Default)]
pub struct FixtureRegistry {
    factories: RwLock<HashMap<String, Factory>>,
}

impl FixtureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an infallible factory under `name`, replacing any previous one.
    pub fn register<T, F>(&self, name: impl Into<String>, f: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ViewArgs) -> T + Send + Sync + 'static,
    {
        self.insert(name.into(), Factory::new(f));
    }

    /// Registers a fallible factory under `name`, replacing any previous one.
    ///
    /// Errors returned by the factory surface as [`Error::Fixture`] and are
    /// never cached.
    pub fn register_fallible<T, E, F>(&self, name: impl Into<String>, f: F)
    where
        T: Any + Send + Sync,
        E: Into<FixtureError>,
        F: Fn(&ViewArgs) -> Result<T, E> + Send + Sync + 'static,
    {
        self.insert(name.into(), Factory::fallible(f));
    }

    /// Registers an already-built factory.
    pub fn insert(&self, name: String, factory: Factory) {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if factories.insert(name.clone(), factory).is_some() {
            tracing::debug!(fixture = %name, "replaced fixture factory");
        } else {
            tracing::trace!(fixture = %name, "registered fixture factory");
        }
    }

    /// Returns the factory for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFixture`] if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Factory, Error> {
        self.lookup(name).ok_or_else(|| Error::UnknownFixture {
            name: name.to_string(),
        })
    }

    /// Returns the factory for `name`, or `default` if there is none.
    ///
    /// The default is itself a factory, so it sees the same arguments a
    /// registered one would. Use [`get_or_value`](Self::get_or_value) for a
    /// constant.
    pub fn get_or(&self, name: &str, default: Factory) -> Factory {
        self.lookup(name).unwrap_or(default)
    }

    /// Returns the factory for `name`, or one that always yields `default`.
    ///
    /// ```
    /// use request_guard::{FixtureRegistry, ViewArgs};
    ///
    /// let registry = FixtureRegistry::new();
    /// let value = registry.get_or_value("missing", 42i32).call(&ViewArgs::new()).unwrap();
    /// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
    /// ```
    pub fn get_or_value<T>(&self, name: &str, default: T) -> Factory
    where
        T: Any + Clone + Send + Sync,
    {
        self.lookup(name)
            .unwrap_or_else(|| Factory::new(move |_: &ViewArgs| default.clone()))
    }

    /// Returns the factory for `name`, if registered.
    pub fn lookup(&self, name: &str) -> Option<Factory> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns `true` if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered fixture names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of registered fixtures.
    pub fn len(&self) -> usize {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FixtureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureRegistry")
            .field("names", &self.names())
            .finish()
    }
}
