//! HTTP request routing.
//!
//! A compressed prefix tree per HTTP method maps request paths to handlers,
//! capturing `:name` and `*name` wildcard segments along the way. The
//! [`Router`] wraps the trees with HTTP-correct dispatch: trailing-slash and
//! case-insensitive redirects, implicit HEAD, automatic OPTIONS, 405
//! negotiation and 404 fallback.

mod adapters;
mod core;
mod error;
mod handler;
mod node;
mod params;
mod path;
mod tests;

// Re-export public items
pub use adapters::strip_leading_segments;
pub use core::Router;
pub use error::RouteError;
pub use handler::{
    error_handler, plain_handler, route_handler, with_params, ErrorHandler, Handler,
    HandlerFuture, RouteHandler,
};
pub use params::{Param, Params, MATCHED_ROUTE_PATH};
pub use path::clean_path;
