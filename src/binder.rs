//! Parameter binding.
//!
//! Turns the raw data of one request into the ordered, typed argument list a
//! handler declared. Four sources each produce [`Binding`]s:
//!
//! | source   | feeds                                   | value                                   |
//! |----------|-----------------------------------------|-----------------------------------------|
//! | path     | `Intent::Path(name)`                    | template variable, typed by its suffix  |
//! | query    | `Intent::Query(name)`                   | first value, every value, or an object  |
//! | body     | `Intent::Body`                          | raw body text, or an object from params |
//! | context  | any `ParamType::Context(kind)` parameter| the capability itself, unconverted      |
//!
//! Each declared parameter then picks its binding. A parameter nothing binds
//! to gets an absent value; that is not an error. Request parameters no
//! handler parameter asks for are ignored.

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::{Binding, SourceKind};
use crate::error::{BindingError, BoxError};
use crate::handler::{Intent, ParamSpec};
use crate::params::Params;
use crate::request::{Context, Request};
use crate::response::ResponseHandle;
use crate::value::{ContextKind, FromValue, ParamType, Scalar, Value};

// ── Capabilities ──────────────────────────────────────────────────────────────

/// The ambient objects available to one request for type-based injection.
#[derive(Clone)]
pub struct Capabilities {
    pub context: Arc<Context>,
    pub request: Arc<Request>,
    pub response: ResponseHandle,
}

impl Capabilities {
    pub fn new(context: Arc<Context>, request: Arc<Request>, response: ResponseHandle) -> Self {
        Self { context, request, response }
    }

    fn value(&self, kind: ContextKind) -> Value {
        match kind {
            ContextKind::Context  => Value::Context(Arc::clone(&self.context)),
            ContextKind::Request  => Value::Request(Arc::clone(&self.request)),
            ContextKind::Response => Value::Response(self.response.clone()),
        }
    }
}

// ── Arguments ─────────────────────────────────────────────────────────────────

/// The ordered argument list handed to a handler or interceptor: one slot per
/// declared parameter, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    slots: Vec<(String, Option<Value>)>,
}

impl Arguments {
    pub fn len(&self) -> usize { self.slots.len() }
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// The value bound to the parameter called `name`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.slots.iter().find(|(n, _)| n == name)?.1.as_ref()
    }

    /// The value in position `index`.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.slots.get(index)?.1.as_ref()
    }

    /// Typed read. `None` when the slot is absent or has another shape.
    pub fn get<T: FromValue>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(T::from_value)
    }

    /// Like [`get`](Self::get), for handlers that treat absence as failure.
    pub fn require<T: FromValue>(&self, name: &str) -> Result<T, BoxError> {
        self.get(name).ok_or_else(|| format!("missing argument `{name}`").into())
    }

    /// A structured parameter object.
    pub fn object<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.value(name)? {
            Value::Object(obj) => Arc::clone(obj).downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.slots.iter().map(|(n, v)| (n.as_str(), v.as_ref()))
    }
}

// ── Binder ────────────────────────────────────────────────────────────────────

/// Binds request data to a declared signature. Stateless.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    pub fn new() -> Self {
        Self
    }

    /// Produces the handler's arguments. The first malformed literal aborts
    /// the whole step.
    pub fn bind(
        &self,
        signature: &[ParamSpec],
        path_bindings: &[Binding],
        caps: &Capabilities,
    ) -> Result<Arguments, BindingError> {
        let request = &caps.request;

        let mut bindings = path_bindings.to_vec();
        bindings.extend(query_bindings(signature, request.params())?);
        bindings.extend(body_bindings(signature, request)?);
        bindings.extend(context_bindings(signature, caps));

        let args = assemble(signature, &bindings)?;
        debug!(declared = signature.len(), produced = bindings.len(), "arguments bound");
        Ok(args)
    }

    /// Interceptor arguments: only context capabilities, picked by declared
    /// type. Every other parameter is absent.
    pub fn bind_ambient(&self, signature: &[ParamSpec], caps: &Capabilities) -> Arguments {
        let slots = signature.iter()
            .map(|spec| {
                let value = match spec.ty {
                    ParamType::Context(kind) => Some(caps.value(kind)),
                    _ => None,
                };
                (spec.name.clone(), value)
            })
            .collect();
        Arguments { slots }
    }
}

fn query_bindings(signature: &[ParamSpec], params: &Params) -> Result<Vec<Binding>, BindingError> {
    let mut out = Vec::new();
    for spec in signature {
        let Intent::Query(name) = &spec.intent else { continue };

        let value = match spec.ty {
            ParamType::Scalar(scalar) => match params.first(name) {
                Some(raw) => scalar.parse(name, raw)?,
                None => continue,
            },
            ParamType::Array(scalar) => match params.values(name) {
                Some(raws) => scalar.parse_all(name, raws)?,
                None => continue,
            },
            ParamType::Structured(ty) => ty.build(params)?,
            ParamType::Context(_) => continue,
        };
        out.push(Binding { name: name.clone(), value, source: SourceKind::QueryOrForm });
    }
    Ok(out)
}

/// `BODY()` on a structured type reads form/query parameters, not the body
/// text. Only a `string` parameter receives the raw body.
fn body_bindings(signature: &[ParamSpec], request: &Request) -> Result<Vec<Binding>, BindingError> {
    let mut out = Vec::new();
    for spec in signature.iter().filter(|s| s.intent == Intent::Body) {
        let value = match spec.ty {
            ParamType::Scalar(Scalar::Str) => Value::Str(request.body().to_owned()),
            ParamType::Structured(ty) => ty.build(request.params())?,
            _ => continue,
        };
        out.push(Binding { name: spec.name.clone(), value, source: SourceKind::Body });
    }
    Ok(out)
}

fn context_bindings(signature: &[ParamSpec], caps: &Capabilities) -> Vec<Binding> {
    signature.iter()
        .filter_map(|spec| match spec.ty {
            ParamType::Context(kind) => Some(Binding {
                name: spec.name.clone(),
                value: caps.value(kind),
                source: SourceKind::Context,
            }),
            _ => None,
        })
        .collect()
}

fn assemble(signature: &[ParamSpec], bindings: &[Binding]) -> Result<Arguments, BindingError> {
    let mut slots = Vec::with_capacity(signature.len());
    for spec in signature {
        let chosen = bindings.iter().find(|b| selects(spec, b));
        let value = chosen
            .map(|b| b.value.clone().coerce(&spec.name, &spec.ty))
            .transpose()?;
        slots.push((spec.name.clone(), value));
    }
    Ok(Arguments { slots })
}

fn selects(spec: &ParamSpec, binding: &Binding) -> bool {
    if matches!(spec.ty, ParamType::Context(_)) {
        return binding.source == SourceKind::Context && binding.name == spec.name;
    }
    match &spec.intent {
        Intent::Path(name)  => binding.source == SourceKind::Path && &binding.name == name,
        Intent::Query(name) => binding.source == SourceKind::QueryOrForm && &binding.name == name,
        Intent::Body        => binding.source == SourceKind::Body && binding.name == spec.name,
        Intent::Untagged    => false,
    }
}
