//! HTTP verb as a typed enum.
//!
//! Routes are declared against one of six verbs or [`Method::All`], which
//! matches any of them. Wire methods outside this set (HEAD, PATCH, WebDAV…)
//! are rejected by the transport adapter with `405 Method Not Allowed` before
//! they reach the pipeline.

use std::fmt;
use std::str::FromStr;

/// A routable HTTP verb.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Options,
    Trace,
    /// Route-side wildcard. Never produced by parsing a request.
    All,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get     => "GET",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Delete  => "DELETE",
            Self::Options => "OPTIONS",
            Self::Trace   => "TRACE",
            Self::All     => "ALL",
        }
    }

    /// True when a route declared with `self` accepts a request made with `requested`.
    pub fn accepts(self, requested: Method) -> bool {
        self == Self::All || self == requested
    }
}

/// Parses an uppercase request method. Case-sensitive per RFC 9110 §9.1.
///
/// `"ALL"` is not a wire method and does not parse.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET"     => Ok(Self::Get),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "DELETE"  => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "TRACE"   => Ok(Self::Trace),
            _         => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
