//! Handler references, parameter specs and type erasure.
//!
//! # How handler methods are stored
//!
//! Routes and interceptors point at methods of many different owner types,
//! and the descriptor model has to keep them in one ordered list. So every
//! method is hidden behind a trait object (`dyn ErasedMethod`):
//!
//! ```text
//! fn show(&mut self, args: &Arguments) -> Result<String, E>   ← user writes this
//!        ↓ TypeDecl::method(decl, UserController::show)
//! show.into_erased(factory)                                   ← Action blanket impl
//!        ↓
//! Arc::new(MethodInvoker { factory, method: show })           ← heap-allocated wrapper
//!        ↓  stored in HandlerRef as Arc<dyn ErasedMethod>
//! handler.invoke(&args) at request time                       ← one vtable dispatch
//!        ↓
//! factory()? then show(&mut fresh_instance, &args)
//! ```
//!
//! The owner type is instantiated fresh for every invocation, so no mutable
//! state is shared between requests.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::binder::Arguments;
use crate::error::BoxError;
use crate::response::IntoBody;
use crate::value::{ContextKind, ParamType, Scalar};

// ── Parameter specs ───────────────────────────────────────────────────────────

/// Where a parameter wants its value to come from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Intent {
    /// A path template variable of this name.
    Path(String),
    /// A query or form parameter of this name.
    Query(String),
    /// The request body: raw text for `string`, form fields for structured types.
    Body,
    /// No annotation. Only context capabilities bind to untagged parameters.
    Untagged,
}

/// One declared handler parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub intent: Intent,
}

impl From<Scalar> for ParamType {
    fn from(scalar: Scalar) -> Self { Self::Scalar(scalar) }
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: impl Into<ParamType>, intent: Intent) -> Self {
        Self { name: name.into(), ty: ty.into(), intent }
    }

    /// `PATH(name)`: the parameter and the template variable share one name.
    pub fn path(name: &str, ty: impl Into<ParamType>) -> Self {
        Self::new(name, ty, Intent::Path(name.to_owned()))
    }

    /// `QUERY_OR_FORM(name)`.
    pub fn query(name: &str, ty: impl Into<ParamType>) -> Self {
        Self::new(name, ty, Intent::Query(name.to_owned()))
    }

    /// `BODY()`.
    pub fn body(name: &str, ty: impl Into<ParamType>) -> Self {
        Self::new(name, ty, Intent::Body)
    }

    pub fn context() -> Self {
        Self::new("context", ParamType::Context(ContextKind::Context), Intent::Untagged)
    }

    pub fn request() -> Self {
        Self::new("request", ParamType::Context(ContextKind::Request), Intent::Untagged)
    }

    pub fn response() -> Self {
        Self::new("response", ParamType::Context(ContextKind::Response), Intent::Untagged)
    }
}

// ── Invocation errors ─────────────────────────────────────────────────────────

/// Failure of one method invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The owner type could not be constructed (abstract, or its factory failed).
    #[error("instantiation failed: {0}")]
    Instantiation(#[source] BoxError),

    /// The method body returned an error.
    #[error("{0}")]
    Raised(#[source] BoxError),
}

// ── Erasure ───────────────────────────────────────────────────────────────────

/// Builds a fresh owner instance.
pub type Factory<T> = Arc<dyn Fn() -> Result<T, BoxError> + Send + Sync + 'static>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Action` trait.
#[doc(hidden)]
pub trait ErasedMethod: Send + Sync + 'static {
    fn instantiable(&self) -> bool;
    fn invoke(&self, args: &Arguments) -> Result<Option<String>, InvokeError>;
}

#[doc(hidden)]
pub type BoxedMethod = Arc<dyn ErasedMethod>;

/// Implemented for every method that can back a route or an interceptor.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure shaped like
///
/// ```text
/// fn name(&mut Owner, &Arguments) -> Result<impl IntoBody, impl Into<BoxError>>
/// ```
///
/// Sealed, like the rest of the erasure layer.
pub trait Action<T>: private::Sealed<T> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_erased(self, factory: Option<Factory<T>>) -> BoxedMethod;
}

mod private {
    pub trait Sealed<T> {}
}

impl<T, F, R, E> private::Sealed<T> for F
where
    T: 'static,
    F: Fn(&mut T, &Arguments) -> Result<R, E> + Send + Sync + 'static,
    R: IntoBody,
    E: Into<BoxError>,
{
}

impl<T, F, R, E> Action<T> for F
where
    T: 'static,
    F: Fn(&mut T, &Arguments) -> Result<R, E> + Send + Sync + 'static,
    R: IntoBody,
    E: Into<BoxError>,
{
    fn into_erased(self, factory: Option<Factory<T>>) -> BoxedMethod {
        Arc::new(MethodInvoker { factory, method: self })
    }
}

/// Holds the owner factory and the concrete method, bridging the typed world
/// to the trait-object world.
struct MethodInvoker<T, F> {
    factory: Option<Factory<T>>,
    method: F,
}

impl<T, F, R, E> ErasedMethod for MethodInvoker<T, F>
where
    T: 'static,
    F: Fn(&mut T, &Arguments) -> Result<R, E> + Send + Sync + 'static,
    R: IntoBody,
    E: Into<BoxError>,
{
    fn instantiable(&self) -> bool {
        self.factory.is_some()
    }

    fn invoke(&self, args: &Arguments) -> Result<Option<String>, InvokeError> {
        let factory = self.factory.as_ref()
            .ok_or_else(|| InvokeError::Instantiation("owner type is not instantiable".into()))?;
        let mut target = factory().map_err(InvokeError::Instantiation)?;

        (self.method)(&mut target, args)
            .map(IntoBody::into_body)
            .map_err(|e| InvokeError::Raised(e.into()))
    }
}

// ── HandlerRef ────────────────────────────────────────────────────────────────

/// Identity and signature of one callable method, plus the means to call it.
///
/// Immutable once built. Shared as `Arc<HandlerRef>` between the route table,
/// the aspect registry and in-flight requests.
pub struct HandlerRef {
    owner: String,
    method: String,
    params: Vec<ParamSpec>,
    target: BoxedMethod,
}

impl HandlerRef {
    /// `factory` is `None` for abstract owner types: such handlers are
    /// declared but never routed to.
    pub fn new<T: 'static>(
        owner: impl Into<String>,
        method: impl Into<String>,
        params: Vec<ParamSpec>,
        factory: Option<Factory<T>>,
        action: impl Action<T>,
    ) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            params,
            target: action.into_erased(factory),
        }
    }

    pub fn owner(&self) -> &str { &self.owner }
    pub fn method_name(&self) -> &str { &self.method }
    pub fn params(&self) -> &[ParamSpec] { &self.params }

    /// `<ownerType>.<methodName>`, the string execution globs match against.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner, self.method)
    }

    pub fn is_instantiable(&self) -> bool {
        self.target.instantiable()
    }

    /// Instantiates the owner fresh and calls the method.
    pub(crate) fn invoke(&self, args: &Arguments) -> Result<Option<String>, InvokeError> {
        self.target.invoke(args)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerRef({}.{})", self.owner, self.method)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counter {
        hits: usize,
    }

    impl Counter {
        fn bump(&mut self, _args: &Arguments) -> Result<String, BoxError> {
            self.hits += 1;
            Ok(self.hits.to_string())
        }
    }

    #[test]
    fn every_invocation_gets_a_fresh_instance() {
        let built = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&built);
        let factory: Factory<Counter> = Arc::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(Counter::default())
        });
        let handler = HandlerRef::new("app.Counter", "bump", vec![], Some(factory), Counter::bump);

        let args = Arguments::default();
        assert_eq!(handler.invoke(&args).unwrap().as_deref(), Some("1"));
        assert_eq!(handler.invoke(&args).unwrap().as_deref(), Some("1"));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn abstract_owner_cannot_be_invoked() {
        let handler = HandlerRef::new::<Counter>("app.Counter", "bump", vec![], None, Counter::bump);
        assert!(!handler.is_instantiable());
        assert!(matches!(handler.invoke(&Arguments::default()), Err(InvokeError::Instantiation(_))));
    }

    #[test]
    fn raised_errors_are_kept_apart_from_instantiation() {
        let factory: Factory<Counter> = Arc::new(|| Ok(Counter::default()));
        let handler = HandlerRef::new(
            "app.Counter",
            "fail",
            vec![],
            Some(factory),
            |_: &mut Counter, _: &Arguments| -> Result<(), BoxError> { Err("nope".into()) },
        );
        let err = handler.invoke(&Arguments::default()).unwrap_err();
        assert!(matches!(err, InvokeError::Raised(_)));
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn qualified_name_joins_owner_and_method() {
        let handler = HandlerRef::new::<Counter>("com.app.Counter", "bump", vec![], None, Counter::bump);
        assert_eq!(handler.qualified_name(), "com.app.Counter.bump");
    }
}
