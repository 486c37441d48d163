//! Authentication and authorization guards.
//!
//! A guard wraps a [`View`] with a [`Predicate`]. When the predicate passes
//! the view runs and its response is returned untouched; when it fails the
//! guard returns a failure response instead (401 for authentication, 403 for
//! authorization) without calling the view.
//!
//! Guards are themselves views, so they stack:
//!
//! ```
//! use http::{Response, StatusCode};
//! use request_guard::predicate::{from_fn, IsAuthenticated};
//! use request_guard::{view_fn, Authentication, Principal, Request, View, ViewArgs, authorization};
//!
//! let edit = view_fn("edit_article", |_, _| Ok(Response::new("edited".to_string())));
//! let is_editor = from_fn(|req: &Request, _: &ViewArgs| {
//!     req.principal().is_some_and(|p| p.id == "editor")
//! });
//!
//! let guarded = Authentication::new()
//!     .authenticator(IsAuthenticated)
//!     .www_authenticate("Bearer")?
//!     .wrap(authorization(is_editor).wrap(edit));
//!
//! let args = ViewArgs::new();
//! let anonymous = Request::new("req-1", "/articles/1/edit/");
//! assert_eq!(guarded.call(&anonymous, &args)?.status(), StatusCode::UNAUTHORIZED);
//!
//! let mut reader = Request::new("req-2", "/articles/1/edit/");
//! reader.set_principal(Some(Principal::new("reader", "Rita")));
//! assert_eq!(guarded.call(&reader, &args)?.status(), StatusCode::FORBIDDEN);
//!
//! let mut editor = Request::new("req-3", "/articles/1/edit/");
//! editor.set_principal(Some(Principal::new("editor", "Ed")));
//! assert_eq!(guarded.call(&editor, &args)?.body(), "edited");
//! # Ok::<(), request_guard::Error>(())
//! ```

use std::fmt;
use std::sync::Arc;

use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, Response, StatusCode};

use crate::config::{DefaultAuthenticator, Settings};
use crate::error::Error;
use crate::logging::RequestLog;
use crate::predicate::{IsAnonymous, IsAuthenticated, Predicate};
use crate::request::Request;
use crate::resolve::ViewArgs;
use crate::view::View;

/// Builds the failure response of a guard.
pub type ResponseFactory<B> = Arc<dyn Fn(&Request, &ViewArgs) -> Response<B> + Send + Sync>;

/// Builds an empty `401 Unauthorized` response.
pub fn unauthorized_response<B: Default>(_request: &Request, _args: &ViewArgs) -> Response<B> {
    status_response(StatusCode::UNAUTHORIZED)
}

/// Builds an empty `403 Forbidden` response.
pub fn forbidden_response<B: Default>(_request: &Request, _args: &ViewArgs) -> Response<B> {
    status_response(StatusCode::FORBIDDEN)
}

fn status_response<B: Default>(status: StatusCode) -> Response<B> {
    let mut response = Response::new(B::default());
    *response.status_mut() = status;
    response
}

/// Which kind of guard wraps a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Checks who the caller is; fails with 401
    Authentication,
    /// Checks what the caller may do; fails with 403
    Authorization,
}

impl GuardKind {
    /// Lower-case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardKind::Authentication => "authentication",
            GuardKind::Authorization => "authorization",
        }
    }
}

impl fmt::Display for GuardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Guard<B> {
    kind: GuardKind,
    predicate: Arc<dyn Predicate>,
    challenge: Option<HeaderValue>,
    response_factory: ResponseFactory<B>,
}

impl<B> Clone for Guard<B> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            predicate: Arc::clone(&self.predicate),
            challenge: self.challenge.clone(),
            response_factory: Arc::clone(&self.response_factory),
        }
    }
}

/// A view wrapped by a guard.
///
/// Produced by [`Authentication::wrap`], [`Authorization::wrap`] and
/// [`authentication`]. The binding between view, predicate, failure
/// response and challenge header is fixed at wrap time.
pub struct Guarded<V, B> {
    view: V,
    guard: Guard<B>,
}

impl<V, B> Guarded<V, B> {
    /// Which guard this is.
    pub fn kind(&self) -> GuardKind {
        self.guard.kind
    }

    /// The wrapped view.
    pub fn inner(&self) -> &V {
        &self.view
    }

    /// Unwraps the view.
    pub fn into_inner(self) -> V {
        self.view
    }
}

impl<V: View<B>, B> View<B> for Guarded<V, B> {
    fn call(&self, request: &Request, args: &ViewArgs) -> Result<Response<B>, Error> {
        let log = RequestLog::new(request);
        let guard = &self.guard;

        if guard.predicate.evaluate(request, args)? {
            log.allowed(guard.kind.as_str(), self.view.name());
            return self.view.call(request, args);
        }

        let mut response = (guard.response_factory)(request, args);
        if let Some(challenge) = &guard.challenge {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, challenge.clone());
        }
        log.denied(guard.kind.as_str(), self.view.name(), response.status());
        Ok(response)
    }

    fn name(&self) -> &str {
        self.view.name()
    }

    fn doc(&self) -> Option<&str> {
        self.view.doc()
    }
}

impl<V: Clone, B> Clone for Guarded<V, B> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<V: fmt::Debug, B> fmt::Debug for Guarded<V, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded")
            .field("kind", &self.guard.kind)
            .field("challenge", &self.guard.challenge)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

/// Authentication guard builder.
///
/// Without an explicit [`authenticator`](Self::authenticator) the guard uses
/// the [`DefaultAuthenticator`] from its settings. With default settings that
/// is [`DefaultAuthenticator::AnonymousOnly`]: only requests that are **not**
/// logged in pass, and authenticated requests get 401. Pass
/// [`IsAuthenticated`] (or pick [`DefaultAuthenticator::LoginRequired`]) to
/// require a login.
///
/// # Examples
///
/// ```
/// use http::{Response, StatusCode};
/// use request_guard::predicate::from_fn;
/// use request_guard::{view_fn, Authentication, Request, View, ViewArgs};
///
/// let view = view_fn("secret", |_, _| Ok(Response::new(String::from("ok"))));
/// let guarded = Authentication::new()
///     .authenticator(from_fn(|_, _| false))
///     .www_authenticate("Basic")?
///     .wrap(view);
///
/// let response = guarded.call(&Request::new("req-1", "/secret/"), &ViewArgs::new())?;
/// assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
/// assert_eq!(response.headers()["www-authenticate"], "Basic");
/// # Ok::<(), request_guard::Error>(())
/// ```
pub struct Authentication<B> {
    authenticator: Arc<dyn Predicate>,
    www_authenticate: Option<HeaderValue>,
    response_factory: ResponseFactory<B>,
}

impl<B: Default + 'static> Authentication<B> {
    /// Creates a guard with default settings: default authenticator, 401
    /// response, no challenge header.
    pub fn new() -> Self {
        Self::with_settings(&Settings::default())
    }

    /// Creates a guard whose default authenticator comes from `settings`.
    pub fn with_settings(settings: &Settings) -> Self {
        let authenticator: Arc<dyn Predicate> = match settings.default_authenticator() {
            DefaultAuthenticator::AnonymousOnly => Arc::new(IsAnonymous),
            DefaultAuthenticator::LoginRequired => Arc::new(IsAuthenticated),
        };
        Self {
            authenticator,
            www_authenticate: None,
            response_factory: Arc::new(unauthorized_response::<B>),
        }
    }
}

impl<B: Default + 'static> Default for Authentication<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Authentication<B> {
    /// Replaces the authenticator.
    pub fn authenticator(mut self, authenticator: impl Predicate + 'static) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }

    /// Sets the `WWW-Authenticate` challenge sent with failure responses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if `challenge` is not a valid header value.
    pub fn www_authenticate(mut self, challenge: &str) -> Result<Self, Error> {
        let value = HeaderValue::from_str(challenge).map_err(|_| Error::InvalidHeader {
            value: challenge.to_string(),
        })?;
        self.www_authenticate = Some(value);
        Ok(self)
    }

    /// Replaces the failure response builder.
    pub fn response_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Request, &ViewArgs) -> Response<B> + Send + Sync + 'static,
    {
        self.response_factory = Arc::new(factory);
        self
    }

    /// Wraps `view`. The builder can wrap any number of views.
    pub fn wrap<V: View<B>>(&self, view: V) -> Guarded<V, B> {
        Guarded {
            view,
            guard: Guard {
                kind: GuardKind::Authentication,
                predicate: Arc::clone(&self.authenticator),
                challenge: self.www_authenticate.clone(),
                response_factory: Arc::clone(&self.response_factory),
            },
        }
    }
}

impl<B> fmt::Debug for Authentication<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("www_authenticate", &self.www_authenticate)
            .finish_non_exhaustive()
    }
}

/// Wraps `view` in an authentication guard with default settings.
///
/// Same as `Authentication::new().wrap(view)`.
pub fn authentication<B, V>(view: V) -> Guarded<V, B>
where
    B: Default + 'static,
    V: View<B>,
{
    Authentication::new().wrap(view)
}

/// Authorization guard builder. See [`authorization`].
pub struct Authorization<B> {
    condition: Arc<dyn Predicate>,
    response_factory: ResponseFactory<B>,
}

/// Creates an authorization guard that passes when `condition` does.
///
/// Failures get an empty 403 unless a
/// [`response_factory`](Authorization::response_factory) is set, in which
/// case its response is returned exactly as built.
///
/// # Examples
///
/// ```
/// use http::{Response, StatusCode};
/// use request_guard::predicate::from_fn;
/// use request_guard::{authorization, view_fn, Request, View, ViewArgs};
///
/// let delete = view_fn("delete", |_, _| Ok(Response::new(String::from("deleted"))));
/// let guarded = authorization(from_fn(|_, args: &ViewArgs| args.kwarg("id") == Some("1")))
///     .wrap(delete);
///
/// let request = Request::new("req-1", "/items/2/");
/// let response = guarded.call(&request, &ViewArgs::new().with_kwarg("id", "2"))?;
/// assert_eq!(response.status(), StatusCode::FORBIDDEN);
/// # Ok::<(), request_guard::Error>(())
/// ```
pub fn authorization<B: Default + 'static>(condition: impl Predicate + 'static) -> Authorization<B> {
    Authorization {
        condition: Arc::new(condition),
        response_factory: Arc::new(forbidden_response::<B>),
    }
}

impl<B> Authorization<B> {
    /// Replaces the failure response builder.
    pub fn response_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Request, &ViewArgs) -> Response<B> + Send + Sync + 'static,
    {
        self.response_factory = Arc::new(factory);
        self
    }

    /// Wraps `view`. The builder can wrap any number of views.
    pub fn wrap<V: View<B>>(&self, view: V) -> Guarded<V, B> {
        Guarded {
            view,
            guard: Guard {
                kind: GuardKind::Authorization,
                predicate: Arc::clone(&self.condition),
                challenge: None,
                response_factory: Arc::clone(&self.response_factory),
            },
        }
    }
}

impl<B> fmt::Debug for Authorization<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{from_fn, try_from_fn};
    use crate::request::Principal;
    use crate::view::{view_fn, FnView};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Handler = fn(&Request, &ViewArgs) -> Result<Response<String>, Error>;

    fn ok_handler(_request: &Request, _args: &ViewArgs) -> Result<Response<String>, Error> {
        Ok(Response::new("ok".to_string()))
    }

    fn ok_view() -> FnView<Handler> {
        view_fn("ok_view", ok_handler as Handler).with_doc("Returns ok.")
    }

    fn request() -> Request {
        Request::new("req-guard", "/guarded/")
    }

    fn logged_in() -> Request {
        let mut request = request();
        request.set_principal(Some(Principal::new("u1", "Alice")));
        request
    }

    #[test]
    fn authentication_passes_view_output_through() {
        let guarded = Authentication::new()
            .authenticator(from_fn(|_, _| true))
            .www_authenticate("Basic")
            .unwrap()
            .wrap(ok_view());

        let response = guarded.call(&request(), &ViewArgs::new()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "ok");
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn authentication_failure_sends_challenge() {
        let guarded = Authentication::new()
            .authenticator(from_fn(|_, _| false))
            .www_authenticate("Basic")
            .unwrap()
            .wrap(ok_view());

        let response = guarded.call(&request(), &ViewArgs::new()).unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Basic");
        assert!(response.body().is_empty());
    }

    #[test]
    fn authentication_failure_without_challenge_has_no_header() {
        let guarded = Authentication::new()
            .authenticator(from_fn(|_, _| false))
            .wrap(ok_view());

        let response = guarded.call(&request(), &ViewArgs::new()).unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn challenge_is_added_to_custom_failure_response() {
        let guarded = Authentication::new()
            .authenticator(from_fn(|_, _| false))
            .www_authenticate("Bearer realm=\"api\"")
            .unwrap()
            .response_factory(|_, _| {
                let mut response = Response::new("login first".to_string());
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                response
            })
            .wrap(ok_view());

        let response = guarded.call(&request(), &ViewArgs::new()).unwrap();
        assert_eq!(response.body(), "login first");
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer realm=\"api\"");
    }

    #[test]
    fn invalid_challenge_is_rejected() {
        let result = Authentication::<String>::new().www_authenticate("bad\nvalue");
        assert!(matches!(result, Err(Error::InvalidHeader { .. })));
    }

    #[test]
    fn default_authenticator_admits_only_anonymous_requests() {
        let guarded = authentication(ok_view());

        let anonymous = guarded.call(&request(), &ViewArgs::new()).unwrap();
        assert_eq!(anonymous.status(), StatusCode::OK);

        let authenticated = guarded.call(&logged_in(), &ViewArgs::new()).unwrap();
        assert_eq!(authenticated.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn login_required_setting_flips_default() {
        let settings = Settings::default()
            .with_default_authenticator(DefaultAuthenticator::LoginRequired);
        let guarded = Authentication::with_settings(&settings).wrap(ok_view());

        assert_eq!(
            guarded.call(&request(), &ViewArgs::new()).unwrap().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            guarded.call(&logged_in(), &ViewArgs::new()).unwrap().status(),
            StatusCode::OK
        );
    }

    #[test]
    fn bare_and_builder_forms_match() {
        let bare = authentication(ok_view());
        let built = Authentication::new().wrap(ok_view());

        for req in [request(), logged_in()] {
            let a = bare.call(&req, &ViewArgs::new()).unwrap();
            let b = built.call(&req, &ViewArgs::new()).unwrap();
            assert_eq!(a.status(), b.status());
            assert_eq!(a.headers(), b.headers());
            assert_eq!(a.body(), b.body());
        }
    }

    #[test]
    fn authorization_default_is_forbidden() {
        let guarded = authorization(from_fn(|_, _| false)).wrap(ok_view());
        let response = guarded.call(&request(), &ViewArgs::new()).unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn authorization_custom_response_is_returned_unmodified() {
        let guarded = authorization(from_fn(|_, _| false))
            .response_factory(|_, _| {
                let mut response = Response::new("sentinel".to_string());
                *response.status_mut() = StatusCode::IM_A_TEAPOT;
                response
                    .headers_mut()
                    .insert("x-sentinel", HeaderValue::from_static("1"));
                response
            })
            .wrap(ok_view());

        let response = guarded.call(&request(), &ViewArgs::new()).unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.body(), "sentinel");
        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.headers()["x-sentinel"], "1");
    }

    #[test]
    fn failing_guard_never_calls_view() {
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&calls);
        let view = view_fn("counted", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Response::new(String::new()))
        });

        let guarded = authorization(from_fn(|_, _| false)).wrap(view);
        guarded.call(&request(), &ViewArgs::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn predicate_errors_propagate() {
        let guarded = authorization(try_from_fn(|_, _| Err(Error::FixturesNotAttached)))
            .wrap(ok_view());
        let result = guarded.call(&request(), &ViewArgs::new());
        assert!(matches!(result, Err(Error::FixturesNotAttached)));
    }

    #[test]
    fn guards_receive_resolved_args() {
        let guarded = authorization(from_fn(|_, args: &ViewArgs| args.kwarg("id") == Some("1")))
            .wrap(ok_view());

        let allowed = guarded
            .call(&request(), &ViewArgs::new().with_kwarg("id", "1"))
            .unwrap();
        let denied = guarded
            .call(&request(), &ViewArgs::new().with_kwarg("id", "2"))
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn guarded_view_keeps_identity() {
        let guarded = authorization(from_fn(|_, _| true)).wrap(ok_view());
        let stacked = Authentication::new().wrap(guarded);

        assert_eq!(stacked.name(), "ok_view");
        assert_eq!(stacked.doc(), Some("Returns ok."));
        assert_eq!(stacked.kind(), GuardKind::Authentication);
        assert_eq!(stacked.inner().kind(), GuardKind::Authorization);
    }

    #[test]
    fn one_builder_wraps_many_views() {
        let guard = authorization(from_fn(|req: &Request, _: &ViewArgs| req.is_authenticated()));
        let a = guard.wrap(ok_view());
        let b = guard.wrap(ok_view());

        assert_eq!(a.call(&logged_in(), &ViewArgs::new()).unwrap().status(), StatusCode::OK);
        assert_eq!(b.call(&request(), &ViewArgs::new()).unwrap().status(), StatusCode::FORBIDDEN);
    }
}
