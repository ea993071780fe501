//! Declared parameter types and the values bound to them.
//!
//! A handler declares what it wants through [`ParamType`]; the binder
//! produces a [`Value`] of the matching shape. Handlers read values back out
//! with [`FromValue`], usually through [`Arguments::get`](crate::Arguments::get).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::BindingError;
use crate::params::{FromParam, FromParams, Params};
use crate::request::{Context, Request};
use crate::response::ResponseHandle;

// ── Declared types ────────────────────────────────────────────────────────────

/// Primitive parameter types. `Int` is 32-bit, `Long` 64-bit, `Float` single
/// precision, `Double` double precision.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scalar {
    Bool,
    Int,
    Long,
    Float,
    Double,
    Str,
}

impl Scalar {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool   => "bool",
            Self::Int    => "int",
            Self::Long   => "long",
            Self::Float  => "float",
            Self::Double => "double",
            Self::Str    => "string",
        }
    }

    /// Converts one raw literal. `name` only feeds the error message.
    pub fn parse(self, name: &str, raw: &str) -> Result<Value, BindingError> {
        Ok(match self {
            Self::Bool   => Value::Bool(bool::from_param(name, raw)?),
            Self::Int    => Value::Int(i32::from_param(name, raw)?),
            Self::Long   => Value::Long(i64::from_param(name, raw)?),
            Self::Float  => Value::Float(f32::from_param(name, raw)?),
            Self::Double => Value::Double(f64::from_param(name, raw)?),
            Self::Str    => Value::Str(raw.to_owned()),
        })
    }

    /// Converts every element of a multi-valued parameter.
    pub fn parse_all(self, name: &str, raws: &[String]) -> Result<Value, BindingError> {
        fn each<T: FromParam>(name: &str, raws: &[String]) -> Result<Vec<T>, BindingError> {
            raws.iter().map(|raw| T::from_param(name, raw)).collect()
        }

        Ok(match self {
            Self::Bool   => Value::BoolArray(each(name, raws)?),
            Self::Int    => Value::IntArray(each(name, raws)?),
            Self::Long   => Value::LongArray(each(name, raws)?),
            Self::Float  => Value::FloatArray(each(name, raws)?),
            Self::Double => Value::DoubleArray(each(name, raws)?),
            Self::Str    => Value::StrArray(raws.to_vec()),
        })
    }
}

/// The ambient capabilities a parameter can ask for by type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContextKind {
    Context,
    Request,
    Response,
}

/// A structured parameter object, built from the request parameter bag by
/// its [`FromParams`] implementation.
#[derive(Clone, Copy)]
pub struct StructuredType {
    name: &'static str,
    build: fn(&Params) -> Result<Value, BindingError>,
}

impl StructuredType {
    pub fn of<T: FromParams>() -> Self {
        Self { name: std::any::type_name::<T>(), build: build_object::<T> }
    }

    pub fn name(&self) -> &'static str { self.name }

    pub(crate) fn build(&self, params: &Params) -> Result<Value, BindingError> {
        (self.build)(params)
    }
}

fn build_object<T: FromParams>(params: &Params) -> Result<Value, BindingError> {
    Ok(Value::Object(Arc::new(T::from_params(params)?)))
}

impl fmt::Debug for StructuredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StructuredType").field(&self.name).finish()
    }
}

impl PartialEq for StructuredType {
    fn eq(&self, other: &Self) -> bool { self.name == other.name }
}

/// The declared type of one handler parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamType {
    Scalar(Scalar),
    Array(Scalar),
    Structured(StructuredType),
    Context(ContextKind),
}

impl ParamType {
    pub fn structured<T: FromParams>() -> Self {
        Self::Structured(StructuredType::of::<T>())
    }
}

// ── Values ────────────────────────────────────────────────────────────────────

/// A bound argument value.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    BoolArray(Vec<bool>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StrArray(Vec<String>),
    Object(Arc<dyn Any + Send + Sync>),
    Context(Arc<Context>),
    Request(Arc<Request>),
    Response(ResponseHandle),
}

impl Value {
    /// Fits an already-produced value to the parameter it is bound to.
    ///
    /// Untyped strings are parsed into the declared scalar and numbers widen.
    /// Any other scalar goes back through its literal text, so `{id:float}`
    /// bound to an `int` parameter accepts `3` and rejects `3.5`. A single
    /// scalar bound to an array parameter becomes a one-element array.
    pub(crate) fn coerce(self, name: &str, ty: &ParamType) -> Result<Value, BindingError> {
        match *ty {
            ParamType::Scalar(target) => self.coerce_scalar(name, target),
            ParamType::Array(element) => self.coerce_array(name, element),
            ParamType::Structured(_) | ParamType::Context(_) => Ok(self),
        }
    }

    fn coerce_scalar(self, name: &str, target: Scalar) -> Result<Value, BindingError> {
        if self.scalar() == Some(target) {
            return Ok(self);
        }
        Ok(match (self, target) {
            (Self::Str(raw), _)                 => target.parse(name, &raw)?,
            (Self::Int(v), Scalar::Long)        => Self::Long(v.into()),
            (Self::Int(v), Scalar::Float)       => Self::Float(v as f32),
            (Self::Int(v), Scalar::Double)      => Self::Double(v.into()),
            (Self::Float(v), Scalar::Double)    => Self::Double(v.into()),
            (other, _) => match other.literal() {
                Some(text) => target.parse(name, &text)?,
                None => {
                    debug!(param = name, value = ?other, expected = target.name(), "value does not fit parameter");
                    other
                }
            },
        })
    }

    fn coerce_array(self, name: &str, element: Scalar) -> Result<Value, BindingError> {
        if let Some(text) = self.literal() {
            return element.parse_all(name, &[text]);
        }
        if self.element() != Some(element) {
            debug!(param = name, value = ?self, expected = element.name(), "value does not fit array parameter");
        }
        Ok(self)
    }

    fn scalar(&self) -> Option<Scalar> {
        Some(match self {
            Self::Bool(_)   => Scalar::Bool,
            Self::Int(_)    => Scalar::Int,
            Self::Long(_)   => Scalar::Long,
            Self::Float(_)  => Scalar::Float,
            Self::Double(_) => Scalar::Double,
            Self::Str(_)    => Scalar::Str,
            _ => return None,
        })
    }

    fn element(&self) -> Option<Scalar> {
        Some(match self {
            Self::BoolArray(_)   => Scalar::Bool,
            Self::IntArray(_)    => Scalar::Int,
            Self::LongArray(_)   => Scalar::Long,
            Self::FloatArray(_)  => Scalar::Float,
            Self::DoubleArray(_) => Scalar::Double,
            Self::StrArray(_)    => Scalar::Str,
            _ => return None,
        })
    }

    /// Text form of a scalar value.
    fn literal(&self) -> Option<String> {
        match self {
            Self::Bool(v)   => Some(v.to_string()),
            Self::Int(v)    => Some(v.to_string()),
            Self::Long(v)   => Some(v.to_string()),
            Self::Float(v)  => Some(v.to_string()),
            Self::Double(v) => Some(v.to_string()),
            Self::Str(v)    => Some(v.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v)        => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v)         => f.debug_tuple("Int").field(v).finish(),
            Self::Long(v)        => f.debug_tuple("Long").field(v).finish(),
            Self::Float(v)       => f.debug_tuple("Float").field(v).finish(),
            Self::Double(v)      => f.debug_tuple("Double").field(v).finish(),
            Self::Str(v)         => f.debug_tuple("Str").field(v).finish(),
            Self::BoolArray(v)   => f.debug_tuple("BoolArray").field(v).finish(),
            Self::IntArray(v)    => f.debug_tuple("IntArray").field(v).finish(),
            Self::LongArray(v)   => f.debug_tuple("LongArray").field(v).finish(),
            Self::FloatArray(v)  => f.debug_tuple("FloatArray").field(v).finish(),
            Self::DoubleArray(v) => f.debug_tuple("DoubleArray").field(v).finish(),
            Self::StrArray(v)    => f.debug_tuple("StrArray").field(v).finish(),
            Self::Object(_)      => f.write_str("Object(..)"),
            Self::Context(c)     => f.debug_tuple("Context").field(&c.name()).finish(),
            Self::Request(r)     => write!(f, "Request({} {})", r.method(), r.path()),
            Self::Response(_)    => f.write_str("Response(..)"),
        }
    }
}

// ── FromValue ─────────────────────────────────────────────────────────────────

/// Typed read access to a bound [`Value`].
///
/// Returns `None` when the value has a different shape.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_value {
    ($ty:ty, $($variant:ident)|+) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    $(Value::$variant(v) => Some(v.clone().into()),)+
                    _ => None,
                }
            }
        }
    };
}

from_value!(bool,             Bool);
from_value!(i32,              Int);
from_value!(i64,              Long | Int);
from_value!(f32,              Float);
from_value!(f64,              Double | Float);
from_value!(String,           Str);
from_value!(Vec<bool>,        BoolArray);
from_value!(Vec<i32>,         IntArray);
from_value!(Vec<i64>,         LongArray);
from_value!(Vec<f32>,         FloatArray);
from_value!(Vec<f64>,         DoubleArray);
from_value!(Vec<String>,      StrArray);
from_value!(Arc<Context>,     Context);
from_value!(Arc<Request>,     Request);
from_value!(ResponseHandle,   Response);
