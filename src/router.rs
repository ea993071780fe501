//! Ordered route table.
//!
//! Routes are tried in registration order and the first one whose literal
//! prefix and verb both match wins. There is no specificity ranking: register
//! `/users/{id}` before `/users` and the former shadows the latter for every
//! path starting with `/users/`.

use std::sync::Arc;

use tracing::debug;

use crate::descriptor::{RouteDescriptor, RouteMatch};
use crate::error::DispatchError;
use crate::method::Method;
use crate::template::{PathTemplate, TemplateError};

struct Route {
    descriptor: RouteDescriptor,
    template: PathTemplate,
}

/// The application's routes, in priority order.
///
/// Build it once at startup. After that it is only read, from any number of
/// threads at once.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Only the template syntax is validated.
    pub fn register(&mut self, descriptor: RouteDescriptor) -> Result<(), TemplateError> {
        let template = PathTemplate::parse(&descriptor.template())?;
        self.routes.push(Route { descriptor, template });
        Ok(())
    }

    pub fn len(&self) -> usize { self.routes.len() }
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    pub fn descriptors(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().map(|r| &r.descriptor)
    }

    /// Finds the handler for `path` + `method` and extracts its path variables.
    ///
    /// Routes whose owner type is not instantiable are skipped. A conversion
    /// failure on the first matching route is reported as is; later routes
    /// are not tried.
    pub fn resolve(&self, path: &str, method: Method) -> Result<RouteMatch, DispatchError> {
        for route in &self.routes {
            let descriptor = &route.descriptor;
            if !descriptor.handler.is_instantiable() {
                continue;
            }
            if !descriptor.method.accepts(method) || !route.template.matches_prefix(path) {
                continue;
            }

            let path_bindings = route.template.bind(path)?;
            debug!(
                template = route.template.as_str(),
                handler = %descriptor.handler.qualified_name(),
                "route matched",
            );
            return Ok(RouteMatch { handler: Arc::clone(&descriptor.handler), path_bindings });
        }

        Err(DispatchError::RouteNotFound { method, path: path.to_owned() })
    }
}
