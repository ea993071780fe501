//! Error types.
//!
//! Two families:
//!
//! - [`Error`] surfaces startup and infrastructure failures: a malformed route
//!   template, an invalid execution glob, discovery or configuration failing,
//!   binding to a port.
//! - [`DispatchError`] is the outcome of one failed request. The transport
//!   adapter turns it into a status code via [`DispatchError::status`].

use http::StatusCode;
use thiserror::Error;

use crate::descriptor::JoinPoint;
use crate::handler::InvokeError;
use crate::method::Method;
use crate::template::TemplateError;

/// Error type returned by user factories, handlers and interceptors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Startup and infrastructure failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("invalid execution glob `{glob}`: {source}")]
    Glob {
        glob: String,
        #[source]
        source: regex::Error,
    },

    #[error("discovery failed: {0}")]
    Discovery(#[source] BoxError),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid listen address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// A request literal that does not convert to its declared type.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BindingError {
    #[error("cannot convert `{name}` value {value:?} to {expected}")]
    Conversion {
        name: String,
        value: String,
        expected: &'static str,
    },

    #[error("`{name}` value {value:?} does not match `{pattern}`")]
    Constraint {
        name: String,
        value: String,
        pattern: String,
    },
}

impl BindingError {
    pub(crate) fn conversion(name: &str, value: &str, expected: &'static str) -> Self {
        Self::Conversion { name: name.to_owned(), value: value.to_owned(), expected }
    }
}

/// Why a single request could not be dispatched.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no route for {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error("binding failed: {0}")]
    Binding(#[from] BindingError),

    #[error("cannot instantiate `{handler}`: {source}")]
    HandlerInstantiation {
        handler: String,
        #[source]
        source: BoxError,
    },

    /// The handler itself raised. AFTER_THROWING interceptors have already run.
    #[error("handler `{handler}` failed: {source}")]
    HandlerInvocation {
        handler: String,
        #[source]
        source: BoxError,
    },

    #[error("{join_point} interceptor `{interceptor}` failed: {source}")]
    Interceptor {
        interceptor: String,
        join_point: JoinPoint,
        #[source]
        source: InvokeError,
    },
}

impl DispatchError {
    /// The HTTP status the transport should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Binding(_)           => StatusCode::BAD_REQUEST,
            _                          => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
