//! HTTP server implementation for microroute-rs.
//!
//! This module provides a simple, efficient HTTP server implementation that
//! reads requests off accepted connections and dispatches them through a
//! [`Router`](crate::router::Router).

mod response;
mod config;
mod error;
mod http_server;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::HttpServer;
