//! Request predicates and their combinators.
//!
//! A predicate answers a yes/no question about a request and the arguments
//! the dispatcher resolved for it. The request is always passed explicitly,
//! so predicates written for plain function views and for method-shaped
//! views look the same.
//!
//! Combinators evaluate left to right and short-circuit. An error from any
//! sub-predicate stops evaluation and propagates unchanged.

use std::fmt;

use crate::error::Error;
use crate::request::Request;
use crate::resolve::ViewArgs;

/// A yes/no check over a request.
pub trait Predicate: Send + Sync {
    /// Evaluates the predicate.
    ///
    /// # Errors
    ///
    /// Whatever the predicate itself fails with (typically a fixture error).
    fn evaluate(&self, request: &Request, args: &ViewArgs) -> Result<bool, Error>;
}

impl<P: Predicate + ?Sized> Predicate for Box<P> {
    fn evaluate(&self, request: &Request, args: &ViewArgs) -> Result<bool, Error> {
        (**self).evaluate(request, args)
    }
}

/// A boxed predicate, as held by [`Or`] and [`And`].
pub type BoxPredicate = Box<dyn Predicate>;

/// Boxes a predicate for use in [`or`] / [`and`].
pub fn boxed(predicate: impl Predicate + 'static) -> BoxPredicate {
    Box::new(predicate)
}

/// Predicate built from an infallible closure. See [`from_fn`].
#[derive(Clone, Copy)]
pub struct FromFn<F>(F);

/// Builds a predicate from a closure returning `bool`.
///
/// # Examples
///
/// ```
/// use request_guard::predicate::{from_fn, Predicate};
/// use request_guard::{Request, ViewArgs};
///
/// let has_id = from_fn(|_, args: &ViewArgs| args.kwarg("id").is_some());
///
/// let request = Request::new("req-1", "/");
/// assert!(!has_id.evaluate(&request, &ViewArgs::new())?);
/// assert!(has_id.evaluate(&request, &ViewArgs::new().with_kwarg("id", "3"))?);
/// # Ok::<(), request_guard::Error>(())
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&Request, &ViewArgs) -> bool + Send + Sync,
{
    FromFn(f)
}

impl<F> Predicate for FromFn<F>
where
    F: Fn(&Request, &ViewArgs) -> bool + Send + Sync,
{
    fn evaluate(&self, request: &Request, args: &ViewArgs) -> Result<bool, Error> {
        Ok((self.0)(request, args))
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FromFn")
    }
}

/// Predicate built from a fallible closure. See [`try_from_fn`].
#[derive(Clone, Copy)]
pub struct TryFromFn<F>(F);

/// Builds a predicate from a closure returning `Result<bool, Error>`.
///
/// Use this when the check reads fixtures, so their errors propagate.
pub fn try_from_fn<F>(f: F) -> TryFromFn<F>
where
    F: Fn(&Request, &ViewArgs) -> Result<bool, Error> + Send + Sync,
{
    TryFromFn(f)
}

impl<F> Predicate for TryFromFn<F>
where
    F: Fn(&Request, &ViewArgs) -> Result<bool, Error> + Send + Sync,
{
    fn evaluate(&self, request: &Request, args: &ViewArgs) -> Result<bool, Error> {
        (self.0)(request, args)
    }
}

impl<F> fmt::Debug for TryFromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TryFromFn")
    }
}

/// Passes iff the request has an authenticated principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticated;

impl Predicate for IsAuthenticated {
    fn evaluate(&self, request: &Request, _args: &ViewArgs) -> Result<bool, Error> {
        Ok(request.is_authenticated())
    }
}

/// Passes iff the request has no authenticated principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAnonymous;

impl Predicate for IsAnonymous {
    fn evaluate(&self, request: &Request, _args: &ViewArgs) -> Result<bool, Error> {
        Ok(!request.is_authenticated())
    }
}

/// True iff any sub-predicate is true. See [`or`].
pub struct Or {
    predicates: Vec<BoxPredicate>,
}

/// Returns a predicate that is true iff at least one of `predicates` is.
///
/// Stops at the first true result. An empty list is false.
///
/// # Examples
///
/// ```
/// use request_guard::predicate::{boxed, from_fn, or, Predicate};
/// use request_guard::{Request, ViewArgs};
///
/// let either = or([
///     boxed(from_fn(|_, _| false)),
///     boxed(from_fn(|_, _| true)),
/// ]);
///
/// let request = Request::new("req-1", "/");
/// assert!(either.evaluate(&request, &ViewArgs::new())?);
/// # Ok::<(), request_guard::Error>(())
/// ```
pub fn or(predicates: impl IntoIterator<Item = BoxPredicate>) -> Or {
    Or {
        predicates: predicates.into_iter().collect(),
    }
}

impl Predicate for Or {
    fn evaluate(&self, request: &Request, args: &ViewArgs) -> Result<bool, Error> {
        for predicate in &self.predicates {
            if predicate.evaluate(request, args)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Debug for Or {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Or")
            .field("len", &self.predicates.len())
            .finish()
    }
}

/// True iff every sub-predicate is true. See [`and`].
pub struct And {
    predicates: Vec<BoxPredicate>,
}

/// Returns a predicate that is true iff all of `predicates` are.
///
/// Stops at the first false result. An empty list is true.
pub fn and(predicates: impl IntoIterator<Item = BoxPredicate>) -> And {
    And {
        predicates: predicates.into_iter().collect(),
    }
}

impl Predicate for And {
    fn evaluate(&self, request: &Request, args: &ViewArgs) -> Result<bool, Error> {
        for predicate in &self.predicates {
            if !predicate.evaluate(request, args)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for And {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("And")
            .field("len", &self.predicates.len())
            .finish()
    }
}

/// Negation of a predicate. See [`not`].
#[derive(Debug, Clone, Copy)]
pub struct Not<P>(P);

/// Returns a predicate that is true iff `predicate` is false.
pub fn not<P: Predicate>(predicate: P) -> Not<P> {
    Not(predicate)
}

impl<P: Predicate> Predicate for Not<P> {
    fn evaluate(&self, request: &Request, args: &ViewArgs) -> Result<bool, Error> {
        Ok(!self.0.evaluate(request, args)?)
    }
}

/// Fluent composition for predicates.
///
/// ```
/// use request_guard::predicate::{from_fn, IsAuthenticated, Predicate, PredicateExt};
/// use request_guard::{Request, ViewArgs};
///
/// let owner_or_public = IsAuthenticated.or(from_fn(|_, args: &ViewArgs| {
///     args.kwarg("visibility") == Some("public")
/// }));
///
/// let request = Request::new("req-1", "/");
/// let args = ViewArgs::new().with_kwarg("visibility", "public");
/// assert!(owner_or_public.evaluate(&request, &args)?);
/// # Ok::<(), request_guard::Error>(())
/// ```
pub trait PredicateExt: Predicate + Sized + 'static {
    /// `self || other`
    fn or(self, other: impl Predicate + 'static) -> Or {
        or([boxed(self), boxed(other)])
    }

    /// `self && other`
    fn and(self, other: impl Predicate + 'static) -> And {
        and([boxed(self), boxed(other)])
    }

    /// `!self`
    fn not(self) -> Not<Self> {
        not(self)
    }

    /// Boxes the predicate.
    fn boxed(self) -> BoxPredicate {
        boxed(self)
    }
}

impl<P: Predicate + Sized + 'static> PredicateExt for P {}
