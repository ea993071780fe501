//! Declaring handler and interceptor types.
//!
//! Nothing is scanned at runtime. Each owner type is declared once with a
//! [`TypeDecl`]: its qualified name, whether it is a controller, an aspect or
//! both, its route prefix, a factory, and its methods. A [`Discovery`] source
//! hands the resulting [`TypeDescriptor`]s to the pipeline at startup.
//!
//! ```rust
//! use switchyard::{Arguments, BoxError, Catalog, MethodDecl, ParamSpec, Scalar, TypeDecl};
//!
//! #[derive(Default)]
//! struct Users;
//!
//! impl Users {
//!     fn show(&mut self, args: &Arguments) -> Result<String, BoxError> {
//!         Ok(format!("user {}", args.require::<i32>("id")?))
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Audit;
//!
//! let catalog = Catalog::new()
//!     .with(
//!         TypeDecl::controller("com.app.Users", || Ok(Users))
//!             .route("/users")
//!             .method(
//!                 MethodDecl::get("show", "/{id:int}").param(ParamSpec::path("id", Scalar::Int)),
//!                 Users::show,
//!             ),
//!     )
//!     .with(
//!         TypeDecl::aspect("com.app.Audit", || Ok(Audit)).method(
//!             MethodDecl::new("log").before(["*.Users.*"]).param(ParamSpec::request()),
//!             |_: &mut Audit, _: &Arguments| -> Result<(), BoxError> { Ok(()) },
//!         ),
//!     );
//! ```

use std::sync::Arc;

use crate::descriptor::{InterceptorDescriptor, JoinPoint, RouteDescriptor};
use crate::error::{BoxError, Error};
use crate::handler::{Action, Factory, HandlerRef, ParamSpec};
use crate::method::Method;

/// Source of type descriptors, consulted once at startup.
///
/// A failure here is fatal: the pipeline is never built.
pub trait Discovery: Send + Sync {
    fn scan_types(&self) -> Result<Vec<TypeDescriptor>, Error>;
}

impl<F> Discovery for F
where
    F: Fn() -> Result<Vec<TypeDescriptor>, Error> + Send + Sync,
{
    fn scan_types(&self) -> Result<Vec<TypeDescriptor>, Error> {
        self()
    }
}

// ── Descriptors ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct MethodDescriptor {
    handler: Arc<HandlerRef>,
    route: Option<(Method, String)>,
    advice: Vec<(JoinPoint, Vec<String>)>,
}

/// A declared owner type, erased and ready for the descriptor model.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    name: String,
    controller: bool,
    aspect: bool,
    route: String,
    methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    pub fn name(&self) -> &str { &self.name }
    pub fn is_controller(&self) -> bool { self.controller }
    pub fn is_aspect(&self) -> bool { self.aspect }

    /// Route descriptors of a controller, in method declaration order.
    pub fn routes(&self) -> Vec<RouteDescriptor> {
        if !self.controller {
            return Vec::new();
        }
        self.methods.iter()
            .filter_map(|m| {
                let (verb, template) = m.route.as_ref()?;
                Some(RouteDescriptor::new(&*self.route, &**template, *verb, Arc::clone(&m.handler)))
            })
            .collect()
    }

    /// Interceptor descriptors of an aspect, in method declaration order.
    pub fn interceptors(&self) -> Vec<InterceptorDescriptor> {
        if !self.aspect {
            return Vec::new();
        }
        self.methods.iter()
            .flat_map(|m| {
                m.advice.iter().map(move |(join_point, globs)| {
                    InterceptorDescriptor::new(*join_point, globs.iter().cloned(), Arc::clone(&m.handler))
                })
            })
            .collect()
    }
}

// ── Declarations ──────────────────────────────────────────────────────────────

/// One method: its parameters, an optional route and its join points.
#[derive(Clone, Debug)]
pub struct MethodDecl {
    name: String,
    params: Vec<ParamSpec>,
    route: Option<(Method, String)>,
    advice: Vec<(JoinPoint, Vec<String>)>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: Vec::new(), route: None, advice: Vec::new() }
    }

    pub fn route(mut self, method: Method, template: impl Into<String>) -> Self {
        self.route = Some((method, template.into()));
        self
    }

    pub fn get(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name).route(Method::Get, template)
    }

    pub fn post(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name).route(Method::Post, template)
    }

    pub fn put(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name).route(Method::Put, template)
    }

    pub fn delete(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name).route(Method::Delete, template)
    }

    pub fn any(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name).route(Method::All, template)
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn advice<I, S>(mut self, join_point: JoinPoint, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.advice.push((join_point, globs.into_iter().map(Into::into).collect()));
        self
    }

    pub fn before<I: IntoIterator<Item = S>, S: Into<String>>(self, globs: I) -> Self {
        self.advice(JoinPoint::Before, globs)
    }

    pub fn after<I: IntoIterator<Item = S>, S: Into<String>>(self, globs: I) -> Self {
        self.advice(JoinPoint::After, globs)
    }

    pub fn around<I: IntoIterator<Item = S>, S: Into<String>>(self, globs: I) -> Self {
        self.advice(JoinPoint::Around, globs)
    }

    pub fn after_returning<I: IntoIterator<Item = S>, S: Into<String>>(self, globs: I) -> Self {
        self.advice(JoinPoint::AfterReturning, globs)
    }

    pub fn after_throwing<I: IntoIterator<Item = S>, S: Into<String>>(self, globs: I) -> Self {
        self.advice(JoinPoint::AfterThrowing, globs)
    }
}

/// Declaration of one owner type `T`.
pub struct TypeDecl<T> {
    name: String,
    controller: bool,
    aspect: bool,
    route: String,
    factory: Option<Factory<T>>,
    methods: Vec<MethodDescriptor>,
}

impl<T: 'static> TypeDecl<T> {
    fn new(name: impl Into<String>, factory: Option<Factory<T>>) -> Self {
        Self {
            name: name.into(),
            controller: false,
            aspect: false,
            route: String::new(),
            factory,
            methods: Vec::new(),
        }
    }

    /// A dispatchable type, constructed by `factory` once per invocation.
    pub fn controller<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let factory: Factory<T> = Arc::new(factory);
        Self::new(name, Some(factory)).as_controller()
    }

    /// A type supplying interceptors, constructed once per interceptor call.
    pub fn aspect<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let factory: Factory<T> = Arc::new(factory);
        Self::new(name, Some(factory)).as_aspect()
    }

    /// A controller that cannot be instantiated. Its routes are registered
    /// but never selected.
    pub fn abstract_controller(name: impl Into<String>) -> Self {
        Self::new(name, None).as_controller()
    }

    pub fn as_controller(mut self) -> Self {
        self.controller = true;
        self
    }

    pub fn as_aspect(mut self) -> Self {
        self.aspect = true;
        self
    }

    /// Per-type route template, prepended to every method template.
    pub fn route(mut self, prefix: impl Into<String>) -> Self {
        self.route = prefix.into();
        self
    }

    pub fn method(mut self, decl: MethodDecl, action: impl Action<T>) -> Self {
        let handler = HandlerRef::new(&*self.name, decl.name, decl.params, self.factory.clone(), action);
        self.methods.push(MethodDescriptor {
            handler: Arc::new(handler),
            route: decl.route,
            advice: decl.advice,
        });
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            name: self.name,
            controller: self.controller,
            aspect: self.aspect,
            route: self.route,
            methods: self.methods,
        }
    }
}

impl<T: 'static> From<TypeDecl<T>> for TypeDescriptor {
    fn from(decl: TypeDecl<T>) -> Self {
        decl.build()
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// In-process [`Discovery`] source: the types registered with it, in order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    types: Vec<TypeDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ty: impl Into<TypeDescriptor>) -> Self {
        self.push(ty);
        self
    }

    pub fn push(&mut self, ty: impl Into<TypeDescriptor>) {
        self.types.push(ty.into());
    }

    pub fn len(&self) -> usize { self.types.len() }
    pub fn is_empty(&self) -> bool { self.types.is_empty() }
}

impl Discovery for Catalog {
    fn scan_types(&self) -> Result<Vec<TypeDescriptor>, Error> {
        Ok(self.types.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::value::Scalar;

    struct Ctl;

    fn noop(_: &mut Ctl, _: &Arguments) -> Result<(), BoxError> { Ok(()) }

    #[test]
    fn controller_routes_concatenate_prefix_and_keep_order() {
        let ty = TypeDecl::controller("app.Users", || Ok(Ctl))
            .route("/users")
            .method(MethodDecl::get("index", ""), noop)
            .method(MethodDecl::new("helper"), noop)
            .method(MethodDecl::post("create", "/{id:int}").param(ParamSpec::path("id", Scalar::Int)), noop)
            .build();

        let routes = ty.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].template(), "/users");
        assert_eq!(routes[1].template(), "/users/{id:int}");
        assert_eq!(routes[1].method, Method::Post);
        assert_eq!(routes[1].handler.qualified_name(), "app.Users.create");
        assert_eq!(routes[1].handler.params().len(), 1);
        assert!(ty.interceptors().is_empty());
    }

    #[test]
    fn aspect_methods_may_declare_several_join_points() {
        let ty = TypeDecl::aspect("app.Audit", || Ok(Ctl))
            .method(MethodDecl::new("log").before(["*.show"]).after(["*.show", "*.index"]), noop)
            .build();

        let interceptors = ty.interceptors();
        assert_eq!(interceptors.len(), 2);
        assert_eq!(interceptors[0].join_point, JoinPoint::Before);
        assert_eq!(interceptors[1].globs, ["*.show", "*.index"]);
        assert!(ty.routes().is_empty());
    }

    #[test]
    fn unmarked_methods_of_non_controllers_do_not_route() {
        let ty = TypeDecl::aspect("app.Audit", || Ok(Ctl))
            .method(MethodDecl::get("stray", "/stray"), noop)
            .build();
        assert!(ty.routes().is_empty());

        let both = TypeDecl::aspect("app.Both", || Ok(Ctl))
            .as_controller()
            .method(MethodDecl::get("page", "/page").before(["*.other"]), noop)
            .build();
        assert_eq!(both.routes().len(), 1);
        assert_eq!(both.interceptors().len(), 1);
    }

    #[test]
    fn abstract_controllers_declare_uninstantiable_handlers() {
        let ty = TypeDecl::<Ctl>::abstract_controller("app.Base")
            .method(MethodDecl::get("index", "/"), noop)
            .build();
        assert!(!ty.routes()[0].handler.is_instantiable());
    }

    #[test]
    fn catalog_reports_types_in_registration_order() {
        let catalog = Catalog::new()
            .with(TypeDecl::controller("a.First", || Ok(Ctl)))
            .with(TypeDecl::aspect("a.Second", || Ok(Ctl)));
        let names: Vec<_> = catalog.scan_types().unwrap().iter().map(|t| t.name().to_owned()).collect();
        assert_eq!(names, ["a.First", "a.Second"]);
    }
}
