//! Minimal switchyard example: a user controller and an audit aspect.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic [switchyard.toml]
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl 'http://localhost:3000/users/search?tag=admin&tag=ops'
//!   curl -X POST http://localhost:3000/users -d 'name=alice&age=31'
//!   curl http://localhost:3000/users/abc        # 400, `id` is not an int
//!   curl -X DELETE http://localhost:3000/users/7 # 500, AFTER_THROWING runs

use std::sync::Arc;

use http::StatusCode;
use switchyard::{
    Arguments, Bootstrap, BindingError, BoxError, Catalog, Config, Context, FromParams, MethodDecl,
    ParamSpec, ParamType, Params, Request, ResponseHandle, Scalar, Server, TypeDecl,
};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let catalog = Catalog::new()
        .with(
            TypeDecl::controller("demo.UserController", || Ok(UserController))
                .route("/users")
                .method(
                    MethodDecl::get("search", "/search")
                        .param(ParamSpec::query("tag", ParamType::Array(Scalar::Str))),
                    UserController::search,
                )
                .method(
                    MethodDecl::get("show", "/{id:int}")
                        .param(ParamSpec::path("id", Scalar::Int))
                        .param(ParamSpec::context()),
                    UserController::show,
                )
                .method(
                    MethodDecl::post("create", "")
                        .param(ParamSpec::body("signup", ParamType::structured::<Signup>()))
                        .param(ParamSpec::response()),
                    UserController::create,
                )
                .method(MethodDecl::delete("remove", "/{id:int}"), UserController::remove),
        )
        .with(
            TypeDecl::aspect("demo.Audit", || Ok(Audit))
                .method(
                    MethodDecl::new("enter").before(["demo.UserController.*"]).param(ParamSpec::request()),
                    Audit::enter,
                )
                .method(MethodDecl::new("failed").after_throwing(["*.remove"]), Audit::failed),
        );

    let bootstrap = Bootstrap::new(catalog, config.context.build());
    let pipeline = bootstrap.pipeline()?;

    Server::from_config(&config.server)?.serve(pipeline).await?;
    Ok(())
}

struct UserController;

impl UserController {
    // GET /users/search?tag=a&tag=b
    fn search(&mut self, args: &Arguments) -> Result<String, BoxError> {
        let tags = args.get::<Vec<String>>("tag").unwrap_or_default();
        Ok(format!(r#"{{"tags":{tags:?}}}"#))
    }

    // GET /users/{id:int}
    fn show(&mut self, args: &Arguments) -> Result<String, BoxError> {
        let id = args.require::<i32>("id")?;
        let ctx = args.require::<Arc<Context>>("context")?;
        Ok(format!(r#"{{"id":{id},"app":"{}"}}"#, ctx.name()))
    }

    // POST /users, form encoded
    fn create(&mut self, args: &Arguments) -> Result<String, BoxError> {
        let signup = args.object::<Signup>("signup").ok_or("missing signup")?;
        let response = args.require::<ResponseHandle>("response")?;
        response.set_status(StatusCode::CREATED);
        response.header("location", "/users/99");
        Ok(format!(r#"{{"name":"{}","age":{}}}"#, signup.name, signup.age))
    }

    fn remove(&mut self, _: &Arguments) -> Result<(), BoxError> {
        Err("users are forever".into())
    }
}

#[derive(Default)]
struct Signup {
    name: String,
    age: i32,
}

impl FromParams for Signup {
    fn from_params(p: &Params) -> Result<Self, BindingError> {
        let mut s = Signup::default();
        if let Some(v) = p.field("name")? { s.name = v; }
        if let Some(v) = p.field("age")?  { s.age = v; }
        Ok(s)
    }
}

struct Audit;

impl Audit {
    fn enter(&mut self, args: &Arguments) -> Result<(), BoxError> {
        let request = args.require::<Arc<Request>>("request")?;
        tracing::info!(method = %request.method(), path = request.path(), "audit");
        Ok(())
    }

    fn failed(&mut self, _: &Arguments) -> Result<(), BoxError> {
        tracing::warn!("handler failed");
        Ok(())
    }
}
