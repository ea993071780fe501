//! Descriptor model: routes, interceptors and per-request bindings.
//!
//! Route and interceptor descriptors are built once at startup and never
//! change afterwards. [`Binding`] and [`RouteMatch`] are created per request
//! and dropped with it.

use std::fmt;
use std::sync::Arc;

use crate::handler::HandlerRef;
use crate::method::Method;
use crate::value::Value;

/// A point in handler execution where interceptors run.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum JoinPoint {
    Before,
    After,
    Around,
    AfterReturning,
    AfterThrowing,
}

impl JoinPoint {
    pub const ALL: [JoinPoint; 5] = [
        Self::Before,
        Self::After,
        Self::Around,
        Self::AfterReturning,
        Self::AfterThrowing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before         => "BEFORE",
            Self::After          => "AFTER",
            Self::Around         => "AROUND",
            Self::AfterReturning => "AFTER_RETURNING",
            Self::AfterThrowing  => "AFTER_THROWING",
        }
    }
}

impl fmt::Display for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a [`Binding`] came from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SourceKind {
    Path,
    QueryOrForm,
    Body,
    Context,
}

/// A named value produced for one request.
#[derive(Clone, Debug)]
pub struct Binding {
    pub name: String,
    pub value: Value,
    pub source: SourceKind,
}

/// One routable handler method.
///
/// The effective template is `class_prefix` followed by `method_template`.
#[derive(Clone, Debug)]
pub struct RouteDescriptor {
    pub class_prefix: String,
    pub method_template: String,
    pub method: Method,
    pub handler: Arc<HandlerRef>,
}

impl RouteDescriptor {
    pub fn new(
        class_prefix: impl Into<String>,
        method_template: impl Into<String>,
        method: Method,
        handler: Arc<HandlerRef>,
    ) -> Self {
        Self {
            class_prefix: class_prefix.into(),
            method_template: method_template.into(),
            method,
            handler,
        }
    }

    pub fn template(&self) -> String {
        format!("{}{}", self.class_prefix, self.method_template)
    }
}

/// One interceptor method and the handlers it applies to.
#[derive(Clone, Debug)]
pub struct InterceptorDescriptor {
    pub join_point: JoinPoint,
    pub globs: Vec<String>,
    pub handler: Arc<HandlerRef>,
}

impl InterceptorDescriptor {
    pub fn new<I, S>(join_point: JoinPoint, globs: I, handler: Arc<HandlerRef>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            join_point,
            globs: globs.into_iter().map(Into::into).collect(),
            handler,
        }
    }
}

/// The routing result for one request.
#[derive(Clone, Debug)]
pub struct RouteMatch {
    pub handler: Arc<HandlerRef>,
    pub path_bindings: Vec<Binding>,
}
