//! The per-request invocation pipeline.
//!
//! ```text
//! ROUTE ──NotFound──────────────────────────────────────────▶ error (404)
//!   │
//! BIND ───BindingError──────────────────────────────────────▶ error (400)
//!   │
//! AROUND (enter) → BEFORE → HANDLER ──raised──▶ AFTER_THROWING ──▶ error (500)
//!                              │
//!                              ▼
//!                 AFTER_RETURNING → AFTER → AROUND (exit) ──▶ reply
//! ```
//!
//! On the failure path AFTER_RETURNING, AFTER and the exit half of AROUND do
//! not run. An interceptor that fails, in any phase, aborts the request on
//! the spot.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, info_span, warn};

use crate::aspect::{AspectRegistry, Interceptors};
use crate::binder::{Capabilities, ParameterBinder};
use crate::descriptor::JoinPoint;
use crate::discovery::Discovery;
use crate::error::{DispatchError, Error};
use crate::handler::InvokeError;
use crate::request::{Context, Request};
use crate::response::{Reply, ResponseHandle};
use crate::router::RouteTable;

/// Routes, interceptors and the binder, frozen for the life of the process.
///
/// `Pipeline` holds no per-request state, so one instance behind an `Arc`
/// serves every worker thread.
pub struct Pipeline {
    routes: RouteTable,
    aspects: AspectRegistry,
    binder: ParameterBinder,
    context: Arc<Context>,
}

impl Pipeline {
    pub fn new(routes: RouteTable, aspects: AspectRegistry, context: Context) -> Self {
        Self {
            routes,
            aspects,
            binder: ParameterBinder::new(),
            context: Arc::new(context),
        }
    }

    /// Builds the whole descriptor model from one discovery pass.
    ///
    /// Routes and interceptors keep the order discovery reports types and
    /// methods in.
    pub fn from_discovery(discovery: &dyn Discovery, context: Context) -> Result<Self, Error> {
        let types = discovery.scan_types()?;

        let mut routes = RouteTable::new();
        let mut aspects = AspectRegistry::new();
        for ty in &types {
            for route in ty.routes() {
                routes.register(route)?;
            }
            for interceptor in ty.interceptors() {
                aspects.register(interceptor)?;
            }
        }

        info!(
            types = types.len(),
            routes = routes.len(),
            interceptors = aspects.len(),
            "descriptor model built",
        );
        Ok(Self::new(routes, aspects, context))
    }

    pub fn routes(&self) -> &RouteTable { &self.routes }
    pub fn aspects(&self) -> &AspectRegistry { &self.aspects }
    pub fn context(&self) -> &Context { &self.context }

    /// Runs one request through the pipeline.
    pub fn dispatch(&self, request: Request) -> Result<Reply, DispatchError> {
        let span = info_span!("dispatch", method = %request.method(), path = request.path());
        let _enter = span.enter();

        let result = self.run(request);
        match &result {
            Ok(reply) => debug!(status = reply.status.as_u16(), "dispatched"),
            Err(e) => warn!(status = e.status().as_u16(), error = %e, "dispatch failed"),
        }
        result
    }

    fn run(&self, request: Request) -> Result<Reply, DispatchError> {
        let matched = self.routes.resolve(request.path(), request.method())?;
        let handler = &matched.handler;

        let caps = Capabilities::new(Arc::clone(&self.context), Arc::new(request), ResponseHandle::new());
        let args = self.binder.bind(handler.params(), &matched.path_bindings, &caps)?;
        let selected = self.aspects.resolve_for_handler(handler);

        self.advise(&selected, JoinPoint::Around, &caps)?;
        self.advise(&selected, JoinPoint::Before, &caps)?;

        let body = match handler.invoke(&args) {
            Ok(body) => body,
            Err(InvokeError::Instantiation(source)) => {
                return Err(DispatchError::HandlerInstantiation { handler: handler.qualified_name(), source });
            }
            Err(InvokeError::Raised(source)) => {
                self.advise(&selected, JoinPoint::AfterThrowing, &caps)?;
                return Err(DispatchError::HandlerInvocation { handler: handler.qualified_name(), source });
            }
        };

        self.advise(&selected, JoinPoint::AfterReturning, &caps)?;
        self.advise(&selected, JoinPoint::After, &caps)?;
        self.advise(&selected, JoinPoint::Around, &caps)?;

        if let Some(body) = body {
            caps.response.write(&body);
        }
        Ok(caps.response.snapshot())
    }

    fn advise(&self, selected: &Interceptors, join_point: JoinPoint, caps: &Capabilities) -> Result<(), DispatchError> {
        for interceptor in selected.get(join_point) {
            debug!(%join_point, interceptor = %interceptor.qualified_name(), "interceptor");
            let args = self.binder.bind_ambient(interceptor.params(), caps);
            interceptor.invoke(&args).map_err(|source| DispatchError::Interceptor {
                interceptor: interceptor.qualified_name(),
                join_point,
                source,
            })?;
        }
        Ok(())
    }
}

/// Single-flight initialisation of a [`Pipeline`].
///
/// However many threads ask at once, discovery runs once and everyone gets
/// the same pipeline. A failed attempt is not cached; the next call retries.
pub struct Bootstrap<D> {
    discovery: D,
    context: Context,
    cell: OnceCell<Arc<Pipeline>>,
}

impl<D: Discovery> Bootstrap<D> {
    pub fn new(discovery: D, context: Context) -> Self {
        Self { discovery, context, cell: OnceCell::new() }
    }

    pub fn pipeline(&self) -> Result<Arc<Pipeline>, Error> {
        self.cell
            .get_or_try_init(|| {
                Pipeline::from_discovery(&self.discovery, self.context.clone()).map(Arc::new)
            })
            .map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}
