use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::header::WWW_AUTHENTICATE;
use http::{Response, StatusCode};
use request_guard::predicate::{and, boxed, from_fn, not, or, Predicate};
use request_guard::{
    authentication, authorization, view_fn, Authentication, Error, Factory, FixtureMiddleware,
    FixtureRegistry, Request, UrlConf, UrlConfRegistry, View, ViewArgs,
};

fn urlconfs() -> Arc<UrlConfRegistry> {
    let conf = UrlConf::new()
        .route(r"^articles/(?P<id>\d+)/$", "article")
        .unwrap();
    Arc::new(UrlConfRegistry::single(conf))
}

fn request_for(path: &str, middleware: &FixtureMiddleware) -> Request {
    let mut request = Request::new(format!("req{}", path.replace('/', "-")), path);
    middleware.process_request(&mut request);
    request
}

#[test]
fn fixture_is_computed_once_per_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry = Arc::new(FixtureRegistry::new());
    registry.register("article", move |args: &ViewArgs| {
        counter.fetch_add(1, Ordering::SeqCst);
        format!("article #{}", args.kwarg("id").unwrap_or("?"))
    });
    let middleware = FixtureMiddleware::new(registry, urlconfs());

    let request = request_for("/articles/5/", &middleware);
    let first = request.fixtures().unwrap().get::<String>("article").unwrap();
    let second = request.fixtures().unwrap().get::<String>("article").unwrap();

    assert_eq!(*first, "article #5");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn fixture_cache_is_isolated_between_requests() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry = Arc::new(FixtureRegistry::new());
    registry.register("article", move |args: &ViewArgs| {
        counter.fetch_add(1, Ordering::SeqCst);
        args.kwarg("id").unwrap_or_default().to_string()
    });
    let middleware = FixtureMiddleware::new(registry, urlconfs());

    let r1 = request_for("/articles/5/", &middleware);
    let r2 = request_for("/articles/5/", &middleware);

    let a = r1.fixtures().unwrap().get::<String>("article").unwrap();
    assert!(!r2.fixtures().unwrap().is_cached("article"));
    let b = r2.fixtures().unwrap().get::<String>("article").unwrap();

    assert_eq!(a, b);
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn combinator_truth_table() {
    let request = Request::new("req-comb", "/");
    let args = ViewArgs::new();
    let eval = |p: &dyn Predicate| p.evaluate(&request, &args).unwrap();

    let p1 = || boxed(from_fn(|_, _| false));
    let p2 = || boxed(from_fn(|_, _| true));

    assert!(eval(&or([p1(), p2()])));
    assert!(!eval(&and([p1(), p2()])));
    assert!(eval(&not(p1())));
    assert!(!eval(&or([])));
    assert!(eval(&and([])));
}

#[test]
fn authentication_success_returns_view_output_unchanged() {
    let view = view_fn("detail", |_, _| {
        let mut response = Response::new("detail body".to_string());
        response
            .headers_mut()
            .insert("x-view", http::HeaderValue::from_static("detail"));
        Ok(response)
    });
    let guarded = Authentication::new()
        .authenticator(from_fn(|_, _| true))
        .www_authenticate("Basic")
        .unwrap()
        .wrap(view);

    let response = guarded
        .call(&Request::new("req-ok", "/detail/"), &ViewArgs::new())
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "detail body");
    assert_eq!(response.headers().len(), 1);
    assert_eq!(response.headers()["x-view"], "detail");
}

#[test]
fn authentication_failure_carries_challenge() {
    let view = view_fn("detail", |_, _| Ok(Response::new(String::new())));
    let guarded = Authentication::new()
        .authenticator(from_fn(|_, _| false))
        .www_authenticate("Basic")
        .unwrap()
        .wrap(view);

    let response = guarded
        .call(&Request::new("req-401", "/detail/"), &ViewArgs::new())
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[WWW_AUTHENTICATE], "Basic");
}

#[test]
fn authorization_failure_returns_custom_response_unmodified() {
    let view = view_fn("delete", |_, _| Ok(Response::new("deleted".to_string())));
    let guarded = authorization(from_fn(|_, _| false))
        .response_factory(|_, _| {
            let mut response = Response::new("sentinel".to_string());
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        })
        .wrap(view);

    let response = guarded
        .call(&Request::new("req-403", "/delete/"), &ViewArgs::new())
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body(), "sentinel");
    assert!(response.headers().is_empty());
}

#[test]
fn unknown_fixture_is_an_error_but_default_lookup_is_total() {
    let registry = Arc::new(FixtureRegistry::new());
    let middleware = FixtureMiddleware::new(Arc::clone(&registry), urlconfs());
    let request = request_for("/articles/1/", &middleware);

    let err = request.fixtures().unwrap().value("missing").unwrap_err();
    assert!(matches!(err, Error::UnknownFixture { ref name } if name == "missing"));
    assert!(registry.get("missing").is_err());

    let value = registry
        .get_or_value("missing", 42i32)
        .call(&ViewArgs::new())
        .unwrap();
    assert_eq!(value.downcast_ref::<i32>(), Some(&42));

    let no_args = Factory::new(|args: &ViewArgs| args.arg(0).is_none());
    let default = registry.get_or("missing", no_args);
    let value = default.call(&ViewArgs::new()).unwrap();
    assert_eq!(value.downcast_ref::<bool>(), Some(&true));
}

#[test]
fn bare_and_builder_authentication_behave_identically() {
    let make_view = || view_fn("page", |_, _| Ok(Response::new("page".to_string())));
    let bare = authentication(make_view());
    let built = Authentication::new().wrap(make_view());

    let mut authed = Request::new("req-authed", "/page/");
    authed.set_principal(Some(request_guard::Principal::new("u1", "Alice")));
    let anonymous = Request::new("req-anon", "/page/");

    for request in [&authed, &anonymous] {
        let a = bare.call(request, &ViewArgs::new()).unwrap();
        let b = built.call(request, &ViewArgs::new()).unwrap();
        assert_eq!(a.status(), b.status());
        assert_eq!(a.headers(), b.headers());
        assert_eq!(a.body(), b.body());
    }
}

#[test]
fn fixture_errors_inside_guards_propagate() {
    let middleware = FixtureMiddleware::new(Arc::new(FixtureRegistry::new()), urlconfs());
    let request = request_for("/unrouted/", &middleware);

    let guarded = authorization(request_guard::predicate::try_from_fn(|req: &Request, _| {
        let owner = req.fixtures()?.get::<String>("owner")?;
        Ok(!owner.is_empty())
    }))
    .wrap(view_fn("owned", |_, _| Ok(Response::new(String::new()))));

    let err = guarded.call(&request, &ViewArgs::new()).unwrap_err();
    assert!(err.is_resolution());
}
