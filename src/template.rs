//! Path templates.
//!
//! A template is literal text with variable markers: `{name}`, `{name:int}`,
//! `{name:float}` or `{name:re:<pattern>}`. Matching is weak:
//!
//! 1. the request path must start with the literal text before the first
//!    marker (or with the whole template when there is no marker);
//! 2. from the first marker's byte offset on, the request path is split on
//!    `/` and values are assigned to variables by position.
//!
//! Trailing segments are not checked against the rest of the template.
//!
//! ```text
//! template  /users/{id:int}/posts/{slug}
//! prefix    /users/
//! path      /users/42/posts/hello   →  ["42", "posts", "hello"]
//!                                       id = 42, slug = "posts"
//! ```

use regex::Regex;
use thiserror::Error;

use crate::descriptor::{Binding, SourceKind};
use crate::error::BindingError;
use crate::value::{Scalar, Value};

/// A route template that cannot be parsed.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("route template `{template}` has an unclosed `{{`")]
    Unclosed { template: String },

    #[error("route template `{template}` has a `}}` without a matching `{{`")]
    Unopened { template: String },

    #[error("route template `{template}` has a variable without a name")]
    Unnamed { template: String },

    #[error("route template `{template}` declares `{name}` more than once")]
    Duplicate { template: String, name: String },

    #[error("route template `{template}`: invalid pattern for `{name}`: {source}")]
    Pattern {
        template: String,
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Declared type of a template variable.
#[derive(Clone, Debug)]
pub enum VarKind {
    Str,
    Int,
    Float,
    /// Value must fully match `pattern`.
    Regex { pattern: String, regex: Regex },
    /// Unrecognised suffix: the value passes through as a string.
    Other(String),
}

#[derive(Clone, Debug)]
pub struct Variable {
    name: String,
    kind: VarKind,
}

impl Variable {
    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> &VarKind { &self.kind }

    fn convert(&self, raw: &str) -> Result<Value, BindingError> {
        match &self.kind {
            VarKind::Str | VarKind::Other(_) => Ok(Value::Str(raw.to_owned())),
            VarKind::Int => Scalar::Int.parse(&self.name, raw),
            VarKind::Float => Scalar::Float.parse(&self.name, raw),
            VarKind::Regex { pattern, regex } => {
                if regex.is_match(raw) {
                    Ok(Value::Str(raw.to_owned()))
                } else {
                    Err(BindingError::Constraint {
                        name: self.name.clone(),
                        value: raw.to_owned(),
                        pattern: pattern.clone(),
                    })
                }
            }
        }
    }
}

/// A parsed route template.
#[derive(Clone, Debug)]
pub struct PathTemplate {
    raw: String,
    /// Byte offset of the first `{`, if any.
    var_start: Option<usize>,
    variables: Vec<Variable>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut var_start = None;
        let mut specs = Vec::new();
        let mut depth = 0usize;
        let mut current = String::new();

        // Brace depth is tracked so `re:` patterns may use `{n}` quantifiers.
        for (i, c) in template.char_indices() {
            match c {
                '{' => {
                    if depth == 0 {
                        var_start.get_or_insert(i);
                    } else {
                        current.push(c);
                    }
                    depth += 1;
                }
                '}' => {
                    if depth == 0 {
                        return Err(TemplateError::Unopened { template: template.to_owned() });
                    }
                    depth -= 1;
                    if depth == 0 {
                        specs.push(std::mem::take(&mut current));
                    } else {
                        current.push(c);
                    }
                }
                _ if depth > 0 => current.push(c),
                _ => {}
            }
        }
        if depth != 0 {
            return Err(TemplateError::Unclosed { template: template.to_owned() });
        }

        let mut variables: Vec<Variable> = Vec::with_capacity(specs.len());
        for spec in specs {
            let var = parse_variable(template, &spec)?;
            if variables.iter().any(|v| v.name == var.name) {
                return Err(TemplateError::Duplicate { template: template.to_owned(), name: var.name });
            }
            variables.push(var);
        }

        Ok(Self { raw: template.to_owned(), var_start, variables })
    }

    pub fn as_str(&self) -> &str { &self.raw }

    pub fn variables(&self) -> &[Variable] { &self.variables }

    /// Literal text a request path must start with.
    pub fn prefix(&self) -> &str {
        match self.var_start {
            Some(start) => &self.raw[..start],
            None => &self.raw,
        }
    }

    pub fn matches_prefix(&self, path: &str) -> bool {
        path.starts_with(self.prefix())
    }

    /// Raw positional values, one per `/`-delimited segment from the first
    /// marker's offset on. Empty inner segments are kept; an empty trailing
    /// segment is not.
    pub fn segments<'p>(&self, path: &'p str) -> Vec<&'p str> {
        let Some(start) = self.var_start else { return Vec::new() };
        let rest = path.get(start..).unwrap_or("");

        let mut values: Vec<&str> = rest.split('/').collect();
        if values.last().is_some_and(|last| last.is_empty()) {
            values.pop();
        }
        values
    }

    /// Extracts and converts every variable that has a positional value.
    ///
    /// Variables beyond the available segments stay unbound.
    pub fn bind(&self, path: &str) -> Result<Vec<Binding>, BindingError> {
        self.variables.iter()
            .zip(self.segments(path))
            .map(|(var, raw)| {
                Ok(Binding {
                    name: var.name.clone(),
                    value: var.convert(raw)?,
                    source: SourceKind::Path,
                })
            })
            .collect()
    }
}

fn parse_variable(template: &str, spec: &str) -> Result<Variable, TemplateError> {
    let (name, suffix) = match spec.split_once(':') {
        Some((name, suffix)) => (name, Some(suffix)),
        None => (spec, None),
    };
    if name.is_empty() {
        return Err(TemplateError::Unnamed { template: template.to_owned() });
    }

    let kind = match suffix {
        None => VarKind::Str,
        Some("int") => VarKind::Int,
        Some("float") => VarKind::Float,
        Some(other) => match other.strip_prefix("re:") {
            Some(pattern) => {
                let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    TemplateError::Pattern { template: template.to_owned(), name: name.to_owned(), source }
                })?;
                VarKind::Regex { pattern: pattern.to_owned(), regex }
            }
            None => VarKind::Other(other.to_owned()),
        },
    };

    Ok(Variable { name: name.to_owned(), kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FromValue;

    fn names(t: &PathTemplate) -> Vec<&str> {
        t.variables().iter().map(Variable::name).collect()
    }

    #[test]
    fn literal_template_is_its_own_prefix() {
        let t = PathTemplate::parse("/health").unwrap();
        assert_eq!(t.prefix(), "/health");
        assert!(t.matches_prefix("/health"));
        assert!(t.matches_prefix("/healthz/deep"));
        assert!(t.bind("/health").unwrap().is_empty());
    }

    #[test]
    fn prefix_stops_at_first_marker() {
        let t = PathTemplate::parse("/users/{id:int}/posts/{slug}").unwrap();
        assert_eq!(t.prefix(), "/users/");
        assert_eq!(names(&t), ["id", "slug"]);
        assert_eq!(t.segments("/users/42/posts/hello"), ["42", "posts", "hello"]);
    }

    #[test]
    fn int_variable_converts() {
        let t = PathTemplate::parse("/users/{id:int}").unwrap();
        let bound = t.bind("/users/42").unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].name, "id");
        assert_eq!(i32::from_value(&bound[0].value), Some(42));
        assert_eq!(bound[0].source, SourceKind::Path);

        let err = t.bind("/users/abc").unwrap_err();
        assert!(matches!(err, BindingError::Conversion { expected: "int", .. }));
    }

    #[test]
    fn float_variable_converts() {
        let t = PathTemplate::parse("/price/{amount:float}").unwrap();
        let bound = t.bind("/price/9.5").unwrap();
        assert_eq!(f32::from_value(&bound[0].value), Some(9.5));
        assert!(t.bind("/price/cheap").is_err());
    }

    #[test]
    fn regex_variable_with_quantifiers() {
        let t = PathTemplate::parse("/items/{sku:re:[A-Z]{3}[0-9]{4}}").unwrap();
        assert_eq!(names(&t), ["sku"]);

        let bound = t.bind("/items/ABC1234").unwrap();
        assert_eq!(String::from_value(&bound[0].value).as_deref(), Some("ABC1234"));

        let err = t.bind("/items/abc1234").unwrap_err();
        assert!(matches!(err, BindingError::Constraint { .. }));
        // Full match, not containment.
        assert!(t.bind("/items/ABC12345").is_err());
    }

    #[test]
    fn unknown_suffix_passes_through() {
        let t = PathTemplate::parse("/files/{name:path}").unwrap();
        assert!(matches!(t.variables()[0].kind(), VarKind::Other(s) if s == "path"));
        let bound = t.bind("/files/readme").unwrap();
        assert_eq!(bound[0].name, "name");
        assert_eq!(String::from_value(&bound[0].value).as_deref(), Some("readme"));
    }

    #[test]
    fn segment_splitting_edges() {
        let t = PathTemplate::parse("/a/{x}").unwrap();
        assert_eq!(t.segments("/a/1/"), ["1"]);
        assert_eq!(t.segments("/a/1//2"), ["1", "", "2"]);
        assert!(t.segments("/a/").is_empty());
        assert!(t.segments("/a").is_empty());
    }

    #[test]
    fn missing_segments_leave_variables_unbound() {
        let t = PathTemplate::parse("/a/{x}/{y}").unwrap();
        let bound = t.bind("/a/1").unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].name, "x");
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(PathTemplate::parse("/a/{x"), Err(TemplateError::Unclosed { .. })));
        assert!(matches!(PathTemplate::parse("/a/x}"), Err(TemplateError::Unopened { .. })));
        assert!(matches!(PathTemplate::parse("/a/{:int}"), Err(TemplateError::Unnamed { .. })));
        assert!(matches!(PathTemplate::parse("/a/{x}/{x}"), Err(TemplateError::Duplicate { .. })));
        assert!(matches!(PathTemplate::parse("/a/{x:re:(}"), Err(TemplateError::Pattern { .. })));
    }
}
