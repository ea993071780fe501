//! Inbound request and the application context capability.

use std::collections::HashMap;

use crate::method::Method;
use crate::params::Params;

/// An inbound request as the pipeline sees it.
///
/// The transport adapter builds one per request; tests build them directly
/// with [`Request::builder`].
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    params: Params,
    body: String,
}

impl Request {
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            method,
            path: path.into(),
            headers: Vec::new(),
            params: Params::new(),
            body: String::new(),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn params(&self) -> &Params { &self.params }

    /// The full request body as text.
    pub fn body(&self) -> &str { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a query/form parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.first(name)
    }
}

/// Builder for [`Request`]. Obtain via [`Request::builder`].
pub struct RequestBuilder {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    params: Params,
    body: String,
}

impl RequestBuilder {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.append(name, value);
        self
    }

    /// Appends every pair of an urlencoded string (`a=1&b=2`).
    pub fn query(mut self, query: &str) -> Self {
        self.params.extend_urlencoded(query);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            headers: self.headers,
            params: self.params,
            body: self.body,
        }
    }
}

/// Process-wide request-processing context: a name and read-only string
/// attributes. Built once at startup and shared by every request.
#[derive(Clone, Debug, Default)]
pub struct Context {
    name: String,
    attributes: HashMap<String, String>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: HashMap::new() }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
