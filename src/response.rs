//! Outbound response capability and the [`IntoBody`] conversion trait.
//!
//! Handlers return a string body (or nothing). Interceptors and handlers that
//! need more, a status code or a header, ask for a [`ResponseHandle`] parameter
//! and write through it. Everything is collected into one [`Reply`] once the
//! pipeline finishes.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use parking_lot::Mutex;
use tracing::warn;

// ── Reply ─────────────────────────────────────────────────────────────────────

/// The response produced by a successful dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Default for Reply {
    fn default() -> Self {
        Self { status: StatusCode::OK, headers: Vec::new(), body: String::new() }
    }
}

impl Reply {
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status;

        let headers = res.headers_mut();
        for (name, value) in &self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => { headers.append(name, value); }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        }
        res
    }
}

// ── ResponseHandle ────────────────────────────────────────────────────────────

/// Shared, request-scoped handle to the response under construction.
///
/// Cloning is cheap; every clone writes to the same response. A handle never
/// outlives the request that created it.
#[derive(Clone, Default)]
pub struct ResponseHandle(Arc<Mutex<Reply>>);

impl ResponseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, status: StatusCode) {
        self.0.lock().status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.0.lock().status
    }

    pub fn header(&self, name: &str, value: &str) {
        self.0.lock().headers.push((name.to_owned(), value.to_owned()));
    }

    /// Appends text to the response body.
    pub fn write(&self, text: &str) {
        self.0.lock().body.push_str(text);
    }

    /// Snapshot of everything written so far.
    pub fn snapshot(&self) -> Reply {
        self.0.lock().clone()
    }
}

// ── IntoBody ──────────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into an optional body string.
///
/// `None` means "no body": nothing is appended to the response.
pub trait IntoBody {
    fn into_body(self) -> Option<String>;
}

impl IntoBody for String {
    fn into_body(self) -> Option<String> { Some(self) }
}

impl IntoBody for &'static str {
    fn into_body(self) -> Option<String> { Some(self.to_owned()) }
}

impl IntoBody for Option<String> {
    fn into_body(self) -> Option<String> { self }
}

impl IntoBody for () {
    fn into_body(self) -> Option<String> { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_response() {
        let a = ResponseHandle::new();
        let b = a.clone();
        a.write("hello ");
        b.write("world");
        b.set_status(StatusCode::CREATED);
        let reply = a.snapshot();
        assert_eq!(reply.body, "hello world");
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    #[test]
    fn http_conversion_defaults_content_type_and_skips_bad_headers() {
        let reply = Reply {
            status: StatusCode::ACCEPTED,
            headers: vec![("x-id".into(), "7".into()), ("bad header".into(), "v".into())],
            body: "ok".into(),
        };
        let res = reply.into_http();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert_eq!(res.headers()["x-id"], "7");
        assert_eq!(res.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(res.headers().len(), 2);
    }
}
