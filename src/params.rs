//! Query/form parameter multimap and literal conversion.

use std::collections::HashMap;

use crate::error::BindingError;

/// Request parameters. A name may carry several values (`tag=a&tag=b`),
/// kept in arrival order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    entries: HashMap<String, Vec<String>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `application/x-www-form-urlencoded` text, e.g. a query string.
    pub fn from_urlencoded(input: &str) -> Self {
        let mut params = Self::new();
        params.extend_urlencoded(input);
        params
    }

    /// Appends every pair from urlencoded text. Form bodies and query strings
    /// share one bag.
    pub fn extend_urlencoded(&mut self, input: &str) {
        for (name, value) in url::form_urlencoded::parse(input.as_bytes()) {
            self.append(name.into_owned(), value.into_owned());
        }
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(name.into()).or_default().push(value.into());
    }

    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)?.first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Converts the first value of `name`, if present.
    ///
    /// This is the building block for [`FromParams`] implementations:
    ///
    /// ```rust
    /// use switchyard::{BindingError, FromParams, Params};
    ///
    /// #[derive(Default)]
    /// struct Signup { name: String, age: i32 }
    ///
    /// impl FromParams for Signup {
    ///     fn from_params(p: &Params) -> Result<Self, BindingError> {
    ///         let mut s = Signup::default();
    ///         if let Some(v) = p.field("name")? { s.name = v; }
    ///         if let Some(v) = p.field("age")?  { s.age = v; }
    ///         Ok(s)
    ///     }
    /// }
    /// ```
    pub fn field<T: FromParam>(&self, name: &str) -> Result<Option<T>, BindingError> {
        self.first(name).map(|raw| T::from_param(name, raw)).transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.append(name, value);
        }
        params
    }
}

// ── Literal conversion ────────────────────────────────────────────────────────

/// Conversion of one raw request literal. Malformed input is a
/// [`BindingError::Conversion`].
pub trait FromParam: Sized {
    fn from_param(name: &str, raw: &str) -> Result<Self, BindingError>;
}

macro_rules! from_param_number {
    ($($ty:ty => $label:literal),+ $(,)?) => {$(
        impl FromParam for $ty {
            fn from_param(name: &str, raw: &str) -> Result<Self, BindingError> {
                raw.parse().map_err(|_| BindingError::conversion(name, raw, $label))
            }
        }
    )+};
}

from_param_number! {
    i32 => "int",
    i64 => "long",
    f32 => "float",
    f64 => "double",
}

/// `true` / `false`, ASCII case-insensitive.
impl FromParam for bool {
    fn from_param(name: &str, raw: &str) -> Result<Self, BindingError> {
        if raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(BindingError::conversion(name, raw, "bool"))
        }
    }
}

impl FromParam for String {
    fn from_param(_name: &str, raw: &str) -> Result<Self, BindingError> {
        Ok(raw.to_owned())
    }
}

/// A structured parameter object assembled field by field from the request
/// parameter bag. Fields without a same-named parameter keep whatever the
/// implementation defaults them to.
pub trait FromParams: Sized + Send + Sync + 'static {
    fn from_params(params: &Params) -> Result<Self, BindingError>;
}
