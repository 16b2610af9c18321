//! A minimal HTTP router with radix-tree path matching.
//!
//! This library routes HTTP requests to handlers through one compressed
//! prefix tree per method, with a focus on simplicity, correctness, and
//! performance.
//!
//! # Features
//!
//! - Route patterns with static segments, `:name` parameters and terminal
//!   `*name` catch-alls
//! - Parameters delivered to handlers as an ordered list, in the order the
//!   wildcards appear in the matched path
//! - Trailing-slash redirects (301 for GET, 308 otherwise) and
//!   case-insensitive path recovery over a canonicalized path
//! - HTTP-correct method negotiation: automatic OPTIONS, 405 with an
//!   `Allow` header, implicit HEAD served by the GET handler
//! - Nested routing with prefix trimming, a file-serving adapter, and
//!   router chaining through the not-found fallback
//! - A small async HTTP server wiring parsed requests into the router
//!
//! # Examples
//!
//! ## Routing
//!
//! ```
//! use microroute_rs::{HttpResponse, Router, StatusCode};
//!
//! let mut router = Router::new();
//!
//! router.get("/user/:name", |_req, params| async move {
//!     let name = params.by_name("name").unwrap_or("world").to_string();
//!     Ok(HttpResponse::new(StatusCode::Ok)
//!         .with_content_type("text/plain")
//!         .with_body_string(format!("Hello, {name}!")))
//! }).unwrap();
//!
//! router.get("/src/*filepath", |_req, params| async move {
//!     let file = params.by_name("filepath").unwrap_or("/").to_string();
//!     Ok(HttpResponse::new(StatusCode::Ok)
//!         .with_content_type("text/plain")
//!         .with_body_string(file))
//! }).unwrap();
//! ```
//!
//! ## Serving
//!
//! ```no_run
//! use microroute_rs::{HttpResponse, HttpServer, Router, ServerConfig, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.get("/", |_req, _params| async {
//!         Ok(HttpResponse::new(StatusCode::Ok)
//!             .with_content_type("text/plain")
//!             .with_body_string("Welcome!"))
//!     })?;
//!
//!     let server = HttpServer::new(ServerConfig::default(), router);
//!     server.start().await?;
//!     Ok(())
//! }
//! ```
//!
//! See the `demos` directory for complete runnable examples.

// Export the parser module
pub mod parser;

// Export the router module
pub mod router;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use router::{
    clean_path, error_handler, plain_handler, route_handler, strip_leading_segments, with_params,
    ErrorHandler, Handler, HandlerFuture, Param, Params, RouteError, RouteHandler, Router,
    MATCHED_ROUTE_PATH,
};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ServerConfig, StatusCode};
