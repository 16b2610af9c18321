//! Handler types and adapters.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::HttpRequest;
use crate::router::params::Params;
use crate::server::{Error, HttpResponse};

/// Type alias for a boxed future that returns a Result<HttpResponse, Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// A route handler: receives the request and the ordered list of parameters
/// captured from the matched route pattern.
pub type RouteHandler = Arc<dyn Fn(HttpRequest, Params) -> HandlerFuture + Send + Sync>;

/// A plain handler: receives only the request. Used for fallbacks (not
/// found, method not allowed, global OPTIONS) and for nested handlers that
/// read captured parameters off the request instead.
pub type Handler = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// A recovery handler invoked with the error a route handler returned.
/// It must produce a response; there is nothing left to fall back to.
pub type ErrorHandler =
    Arc<dyn Fn(HttpRequest, Error) -> Pin<Box<dyn Future<Output = HttpResponse> + Send>> + Send + Sync>;

/// Wrap an async function taking a request and its captured parameters into
/// a [`RouteHandler`].
pub fn route_handler<F, Fut>(f: F) -> RouteHandler
where
    F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |request, params| Box::pin(f(request, params)))
}

/// Wrap an async function taking only a request into a [`Handler`].
pub fn plain_handler<F, Fut>(f: F) -> Handler
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// Wrap an async recovery function into an [`ErrorHandler`].
pub fn error_handler<F, Fut>(f: F) -> ErrorHandler
where
    F: Fn(HttpRequest, Error) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |request, error| Box::pin(f(request, error)))
}

/// Adapt a plain handler into a route handler. Captured parameters are
/// stored on the request so the inner handler can read them with
/// [`HttpRequest::param`].
pub fn with_params(handler: Handler) -> RouteHandler {
    Arc::new(move |mut request: HttpRequest, params: Params| {
        if !params.is_empty() {
            request.params = params;
        }
        handler(request)
    })
}
