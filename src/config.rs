//! Process-level settings.
//!
//! Settings are plain values handed to the components that need them; nothing
//! here is global. [`Settings::from_env`] is a convenience for hosts that
//! configure through the environment.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Environment variable naming the default URL configuration.
pub const ROOT_URLCONF_ENV: &str = "REQUEST_GUARD_ROOT_URLCONF";

/// Environment variable selecting the default authenticator.
pub const DEFAULT_AUTHENTICATOR_ENV: &str = "REQUEST_GUARD_DEFAULT_AUTHENTICATOR";

/// Id of the default URL configuration when none is configured.
pub const DEFAULT_ROOT_URLCONF: &str = "root";

/// Behaviour of the authenticator used by [`Authentication`](crate::Authentication)
/// when none is supplied.
///
/// The default, [`AnonymousOnly`](DefaultAuthenticator::AnonymousOnly), passes
/// a request only when it is **not** logged in. That means a guard built with
/// no explicit authenticator rejects every authenticated request with 401 and
/// lets anonymous ones through. Hosts that want "login required" must either
/// pick [`LoginRequired`](DefaultAuthenticator::LoginRequired) or pass their
/// own authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultAuthenticator {
    /// Pass iff the request has no authenticated principal.
    #[default]
    AnonymousOnly,
    /// Pass iff the request has an authenticated principal.
    LoginRequired,
}

impl DefaultAuthenticator {
    /// Returns the textual form accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultAuthenticator::AnonymousOnly => "anonymous-only",
            DefaultAuthenticator::LoginRequired => "login-required",
        }
    }
}

impl fmt::Display for DefaultAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefaultAuthenticator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anonymous-only" | "anonymous_only" => Ok(DefaultAuthenticator::AnonymousOnly),
            "login-required" | "login_required" => Ok(DefaultAuthenticator::LoginRequired),
            _ => Err(Error::InvalidSetting {
                key: DEFAULT_AUTHENTICATOR_ENV,
                value: s.to_string(),
            }),
        }
    }
}

/// Settings shared by the URL configuration registry and the guards.
///
/// # Examples
///
/// ```
/// use request_guard::{DefaultAuthenticator, Settings};
///
/// let settings = Settings::default()
///     .with_root_urlconf("api")
///     .with_default_authenticator(DefaultAuthenticator::LoginRequired);
///
/// assert_eq!(settings.root_urlconf(), "api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    root_urlconf: String,
    default_authenticator: DefaultAuthenticator,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_urlconf: DEFAULT_ROOT_URLCONF.to_string(),
            default_authenticator: DefaultAuthenticator::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the environment, keeping defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut settings = Settings::default();

        if let Some(id) = lookup(ROOT_URLCONF_ENV) {
            if id.trim().is_empty() {
                return Err(Error::InvalidSetting {
                    key: ROOT_URLCONF_ENV,
                    value: id,
                });
            }
            settings.root_urlconf = id;
        }
        if let Some(raw) = lookup(DEFAULT_AUTHENTICATOR_ENV) {
            settings.default_authenticator = raw.parse()?;
        }

        tracing::debug!(
            root_urlconf = %settings.root_urlconf,
            default_authenticator = %settings.default_authenticator,
            "loaded settings"
        );
        Ok(settings)
    }

    /// Sets the id of the default URL configuration.
    pub fn with_root_urlconf(mut self, id: impl Into<String>) -> Self {
        self.root_urlconf = id.into();
        self
    }

    /// Sets the authenticator used when a guard is built without one.
    pub fn with_default_authenticator(mut self, authenticator: DefaultAuthenticator) -> Self {
        self.default_authenticator = authenticator;
        self
    }

    /// Returns the id of the default URL configuration.
    pub fn root_urlconf(&self) -> &str {
        &self.root_urlconf
    }

    /// Returns the default authenticator polarity.
    pub fn default_authenticator(&self) -> DefaultAuthenticator {
        self.default_authenticator
    }
}
