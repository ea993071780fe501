//! HTTP transport adapter and graceful shutdown.
//!
//! The adapter turns each wire request into a [`Request`], hands it to the
//! [`Pipeline`] on tokio's blocking pool, and turns the outcome back into an
//! HTTP response:
//!
//! | outcome                         | status |
//! |---------------------------------|--------|
//! | reply                           | whatever the reply carries (200 by default) |
//! | unsupported wire method         | 405 |
//! | unreadable body                 | 400 |
//! | path not UTF-8 once decoded     | 400 |
//! | [`DispatchError`]               | [`DispatchError::status`] |
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::method::Method;
use crate::params::Params;
use crate::pipeline::Pipeline;
use crate::request::Request;
use crate::response::Reply;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string. Use
    /// [`Server::from_config`] to get an error instead.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use switchyard::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, Error> {
        Ok(Self { addr: config.socket_addr()? })
    }

    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Serves until SIGTERM or Ctrl-C, then drains in-flight connections.
    pub async fn serve(self, pipeline: Arc<Pipeline>) -> Result<(), Error> {
        self.serve_with_shutdown(pipeline, shutdown_signal()).await
    }

    /// Serves until `shutdown` resolves, then drains in-flight connections.
    pub async fn serve_with_shutdown<S>(self, pipeline: Arc<Pipeline>, shutdown: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, routes = pipeline.routes().len(), "switchyard listening");

        // Tracks every connection task so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown is checked first so a signal stops accepting at once,
                // even with connections still queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&pipeline);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| handle(Arc::clone(&pipeline), req));

                        // `auto::Builder` speaks HTTP/1.1 and HTTP/2, whichever
                        // the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set does not grow without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("switchyard stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

type HttpResponse = http::Response<Full<Bytes>>;

fn status_only(status: StatusCode) -> HttpResponse {
    Reply { status, ..Reply::default() }.into_http()
}

/// Translates one wire request, runs it through the pipeline and translates
/// the result back. Every failure becomes a status code, so hyper never sees
/// an error.
async fn handle<B>(pipeline: Arc<Pipeline>, req: http::Request<B>) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let Ok(method) = req.method().as_str().parse::<Method>() else {
        debug!(method = %req.method(), "unsupported method");
        return Ok(status_only(StatusCode::METHOD_NOT_ALLOWED));
    };

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
        Err(e) => {
            debug!("failed to read request body: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
    };

    // Routing and path variables work on the decoded path.
    let path = match urlencoding::decode(parts.uri.path()) {
        Ok(path) => path.into_owned(),
        Err(e) => {
            debug!(path = parts.uri.path(), "request path is not valid UTF-8: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
    };

    let mut params = Params::from_urlencoded(parts.uri.query().unwrap_or(""));
    if is_form(&parts.headers) {
        params.extend_urlencoded(&body);
    }

    let mut builder = Request::builder(method, path).params(params);
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            builder = builder.header(name.as_str(), value);
        }
    }
    let request = builder.body(body).build();

    // Handlers are synchronous; keep them off the reactor threads.
    let outcome = tokio::task::spawn_blocking(move || pipeline.dispatch(request)).await;
    let response = match outcome {
        Ok(Ok(reply)) => reply.into_http(),
        Ok(Err(e)) => status_only(e.status()),
        Err(e) => {
            error!("dispatch task failed: {e}");
            status_only(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    Ok(response)
}

/// Media types compare case-insensitively and parameters (`; charset=..`)
/// are ignored.
fn is_form(headers: &http::HeaderMap) -> bool {
    headers.get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C). On
/// Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::discovery::{Catalog, MethodDecl, TypeDecl};
    use crate::error::BoxError;
    use crate::handler::ParamSpec;
    use crate::request::Context;
    use crate::value::Scalar;

    struct Echo;

    impl Echo {
        fn show(&mut self, args: &Arguments) -> Result<String, BoxError> {
            Ok(format!("{}:{}", args.require::<i32>("id")?, args.get::<String>("q").unwrap_or_default()))
        }

        fn body(&mut self, args: &Arguments) -> Result<String, BoxError> {
            args.require::<String>("text")
        }

        fn person(&mut self, args: &Arguments) -> Result<String, BoxError> {
            args.require::<String>("name")
        }
    }

    fn pipeline() -> Arc<Pipeline> {
        let catalog = Catalog::new().with(
            TypeDecl::controller("t.Echo", || Ok(Echo))
                .route("/echo")
                .method(
                    MethodDecl::get("person", "/people/{name}").param(ParamSpec::path("name", Scalar::Str)),
                    Echo::person,
                )
                .method(
                    MethodDecl::get("show", "/{id:int}")
                        .param(ParamSpec::path("id", Scalar::Int))
                        .param(ParamSpec::query("q", Scalar::Str)),
                    Echo::show,
                )
                .method(MethodDecl::post("body", "").param(ParamSpec::body("text", Scalar::Str)), Echo::body),
        );
        Arc::new(Pipeline::from_discovery(&catalog, Context::new("test")).unwrap())
    }

    fn request(method: &str, uri: &str, body: &str) -> http::Request<Full<Bytes>> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from(body.to_owned())))
            .unwrap()
    }

    async fn body_of(res: HttpResponse) -> String {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn query_and_path_reach_the_handler() {
        let res = handle(pipeline(), request("GET", "/echo/7?q=hi", "")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body_of(res).await, "7:hi");
    }

    #[tokio::test]
    async fn form_body_is_merged_into_params() {
        let res = handle(pipeline(), request("GET", "/echo/7", "q=from-form")).await.unwrap();
        assert_eq!(body_of(res).await, "7:from-form");
    }

    #[tokio::test]
    async fn form_media_type_ignores_case_and_parameters() {
        let with_type = |content_type: &'static str| {
            http::Request::builder()
                .uri("/echo/7")
                .header(CONTENT_TYPE, content_type)
                .body(Full::new(Bytes::from_static(b"q=mixed")))
                .unwrap()
        };

        let res = handle(pipeline(), with_type("Application/X-WWW-Form-Urlencoded; charset=UTF-8")).await.unwrap();
        assert_eq!(body_of(res).await, "7:mixed");

        let res = handle(pipeline(), with_type("text/plain")).await.unwrap();
        assert_eq!(body_of(res).await, "7:");
    }

    #[tokio::test]
    async fn path_variables_bind_decoded() {
        let res = handle(pipeline(), request("GET", "/echo/people/bob%20smith", "")).await.unwrap();
        assert_eq!(body_of(res).await, "bob smith");

        let res = handle(pipeline(), request("GET", "/echo/people/caf%C3%A9", "")).await.unwrap();
        assert_eq!(body_of(res).await, "café");

        let res = handle(pipeline(), request("GET", "/echo/people/%FF", "")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn raw_body_binds_to_string_parameter() {
        let res = handle(pipeline(), request("POST", "/echo", "a=b")).await.unwrap();
        assert_eq!(body_of(res).await, "a=b");
    }

    #[tokio::test]
    async fn failures_map_to_status_codes() {
        let p = pipeline();
        let res = handle(Arc::clone(&p), request("GET", "/nowhere", "")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = handle(Arc::clone(&p), request("GET", "/echo/abc", "")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = handle(p, request("PATCH", "/echo/1", "")).await.unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn from_config_rejects_bad_addresses() {
        let config = ServerConfig { addr: "not an address".into() };
        assert!(matches!(Server::from_config(&config), Err(Error::Addr { .. })));
        let config = ServerConfig::default();
        assert_eq!(Server::from_config(&config).unwrap().addr().port(), 3000);
    }
}
