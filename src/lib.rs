//! Declarative request guards and request-scoped fixtures.
//!
//! This crate wraps request handlers with composable checks and memoizes
//! per-request values:
//! - **Guards**: [`Authentication`] (401 + optional `WWW-Authenticate`) and
//!   [`Authorization`] (403) short-circuit a [`View`] when their predicate fails
//! - **Predicates**: boolean checks over a request, combined with
//!   [`predicate::or`], [`predicate::and`] and [`predicate::not`]
//! - **Fixtures**: named values computed from the request's resolved URL
//!   arguments by a factory in the [`FixtureRegistry`], at most once per request
//!
//! # Core Types
//!
//! - [`Request`]: the inbound request as seen by guards and fixtures
//! - [`FixtureMiddleware`]: attaches a fresh fixture cache to each request
//! - [`FixtureAccessor`]: reads (and lazily computes) fixtures
//! - [`Guarded`]: a view wrapped by a guard
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use http::{Response, StatusCode};
//! use request_guard::predicate::try_from_fn;
//! use request_guard::{
//!     authorization, view_fn, FixtureMiddleware, FixtureRegistry, Principal, Request, UrlConf,
//!     UrlConfRegistry, View,
//! };
//!
//! // Startup: fixtures and routes
//! let registry = Arc::new(FixtureRegistry::new());
//! registry.register("owner", |args| format!("user-{}", args.kwarg("user").unwrap_or("")));
//!
//! let urls = UrlConf::new().route(r"^users/(?P<user>\d+)/$", "profile")?;
//! let middleware = FixtureMiddleware::new(registry, Arc::new(UrlConfRegistry::single(urls)));
//!
//! // Only the profile owner may see it
//! let profile = authorization(try_from_fn(|req: &Request, _| {
//!     let owner = req.fixtures()?.get::<String>("owner")?;
//!     Ok(req.principal().is_some_and(|p| p.id == *owner))
//! }))
//! .wrap(view_fn("profile", |_, _| Ok(Response::new("profile".to_string()))));
//!
//! // Per request
//! let mut request = Request::new("req-1", "/users/7/");
//! request.set_principal(Some(Principal::new("user-7", "Ada")));
//! middleware.process_request(&mut request);
//!
//! let args = request.fixtures()?.resolved_args()?;
//! let response = profile.call(&request, &args)?;
//! assert_eq!(response.status(), StatusCode::OK);
//! # Ok::<(), request_guard::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod fixture;
mod guard;
mod logging;
pub mod predicate;
mod registry;
mod request;
mod resolve;
mod view;

pub use cache::RequestCache;
pub use config::{
    DefaultAuthenticator, Settings, DEFAULT_AUTHENTICATOR_ENV, DEFAULT_ROOT_URLCONF,
    ROOT_URLCONF_ENV,
};
pub use error::{Error, FixtureError};
pub use fixture::{FixtureAccessor, FixtureMiddleware, FixtureScope};
pub use guard::{
    authentication, authorization, forbidden_response, unauthorized_response, Authentication,
    Authorization, GuardKind, Guarded, ResponseFactory,
};
pub use predicate::Predicate;
pub use registry::{Factory, FixtureRegistry, FixtureValue};
pub use request::{Principal, Request};
pub use resolve::{ResolverMatch, UrlConf, UrlConfRegistry, UrlResolver, ViewArgs};
pub use view::{view_fn, FnView, View};
