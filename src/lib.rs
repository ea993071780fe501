//! # switchyard
//!
//! A small dispatch engine: an incoming request goes in, one handler method
//! is picked, its arguments are bound from the path, query, form, body and
//! ambient context, and interceptors declared against join points run around
//! it.
//!
//! ## The pieces
//!
//! - [`RouteTable`]: ordered, prefix-based route selection with typed path
//!   templates (`{id:int}`, `{x:float}`, `{code:re:[a-z]{2}}`)
//! - [`AspectRegistry`]: interceptors selected by execution globs such as
//!   `*.UserController.*`
//! - [`ParameterBinder`]: typed argument binding, no reflection
//! - [`Pipeline`]: the per-request protocol tying the three together
//! - [`Server`]: a hyper transport adapter with graceful shutdown
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use switchyard::{
//!     Arguments, Bootstrap, BoxError, Catalog, Config, MethodDecl, ParamSpec, Scalar, Server,
//!     TypeDecl,
//! };
//!
//! struct Users;
//!
//! impl Users {
//!     fn show(&mut self, args: &Arguments) -> Result<String, BoxError> {
//!         Ok(format!(r#"{{"id":{}}}"#, args.require::<i32>("id")?))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("switchyard.toml")?;
//!     let catalog = Catalog::new().with(
//!         TypeDecl::controller("app.Users", || Ok(Users))
//!             .route("/users")
//!             .method(
//!                 MethodDecl::get("show", "/{id:int}").param(ParamSpec::path("id", Scalar::Int)),
//!                 Users::show,
//!             ),
//!     );
//!
//!     let pipeline = Bootstrap::new(catalog, config.context.build()).pipeline()?;
//!     Server::from_config(&config.server)?.serve(pipeline).await?;
//!     Ok(())
//! }
//! ```

mod aspect;
mod binder;
mod config;
mod descriptor;
mod discovery;
mod error;
mod handler;
mod method;
mod params;
mod pipeline;
mod request;
mod response;
mod router;
mod server;
mod template;
mod value;

pub use aspect::{AspectRegistry, Glob, Interceptors};
pub use binder::{Arguments, Capabilities, ParameterBinder};
pub use config::{Config, ContextConfig, ServerConfig};
pub use descriptor::{Binding, InterceptorDescriptor, JoinPoint, RouteDescriptor, RouteMatch, SourceKind};
pub use discovery::{Catalog, Discovery, MethodDecl, TypeDecl, TypeDescriptor};
pub use error::{BindingError, BoxError, DispatchError, Error};
pub use handler::{Action, Factory, HandlerRef, Intent, InvokeError, ParamSpec};
pub use method::Method;
pub use params::{FromParam, FromParams, Params};
pub use pipeline::{Bootstrap, Pipeline};
pub use request::{Context, Request, RequestBuilder};
pub use response::{IntoBody, Reply, ResponseHandle};
pub use router::RouteTable;
pub use server::Server;
pub use template::{PathTemplate, TemplateError, VarKind, Variable};
pub use value::{ContextKind, FromValue, ParamType, Scalar, StructuredType, Value};
