use thiserror::Error;

/// Boxed error returned by fallible fixture factories.
pub type FixtureError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while guarding views or resolving fixtures.
#[derive(Debug, Error)]
pub enum Error {
    /// No factory is registered under the requested fixture name.
    #[error("unknown fixture '{name}'")]
    UnknownFixture {
        /// The fixture name that was looked up
        name: String,
    },

    /// URL resolution found no route matching the request path.
    #[error("no route matches path '{path}'")]
    Resolution {
        /// The path that failed to resolve
        path: String,
    },

    /// The request names a URL configuration that was never registered.
    #[error("unknown url configuration '{id}'")]
    UnknownUrlConf {
        /// The configuration id carried by the request or settings
        id: String,
    },

    /// A route pattern failed to compile.
    #[error("invalid route pattern '{pattern}'")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// A challenge header value is not a valid HTTP header value.
    #[error("invalid header value '{value}'")]
    InvalidHeader {
        /// The rejected value
        value: String,
    },

    /// A settings value could not be parsed.
    #[error("invalid value '{value}' for setting {key}")]
    InvalidSetting {
        /// Setting (environment variable) name
        key: &'static str,
        /// The rejected value
        value: String,
    },

    /// Fixtures were accessed before the middleware attached them.
    #[error("fixtures are not attached to this request")]
    FixturesNotAttached,

    /// A fixture value does not have the requested type.
    #[error("fixture '{name}' is not a {expected}")]
    FixtureType {
        /// Fixture name
        name: String,
        /// Type name that was requested
        expected: &'static str,
    },

    /// A fixture factory failed.
    #[error("fixture '{name}' failed")]
    Fixture {
        /// Fixture name
        name: String,
        /// Error returned by the factory
        #[source]
        source: FixtureError,
    },
}

impl Error {
    /// Returns `true` for [`Error::UnknownFixture`].
    pub fn is_unknown_fixture(&self) -> bool {
        matches!(self, Error::UnknownFixture { .. })
    }

    /// Returns `true` for [`Error::Resolution`].
    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::Resolution { .. })
    }
}
