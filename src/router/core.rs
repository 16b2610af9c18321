//! Route registration and request dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use log::{debug, error};

use crate::parser::{HttpRequest, Method};
use crate::router::error::RouteError;
use crate::router::handler::{route_handler, ErrorHandler, Handler, RouteHandler};
use crate::router::node::Node;
use crate::router::params::{count_params, Param, Params, MATCHED_ROUTE_PATH};
use crate::router::path::clean_path;
use crate::server::{Error, HttpResponse, StatusCode};

/// An HTTP request router backed by one radix tree per method.
///
/// Routes are registered up front and looked up on every request. Lookup is
/// read-only and freely concurrent; registration takes `&mut self` and must
/// complete before the router is shared with the server. The trees are not
/// safe for mutation while requests are being dispatched.
///
/// # Examples
///
/// ```
/// use microroute_rs::{HttpResponse, Router, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/user/:name", |_req, params| async move {
///     let name = params.by_name("name").unwrap_or("stranger").to_string();
///     Ok(HttpResponse::new(StatusCode::Ok)
///         .with_content_type("text/plain")
///         .with_body_string(format!("Hello, {name}!")))
/// }).unwrap();
/// ```
pub struct Router {
    trees: HashMap<Method, Node<RouteHandler>>,

    /// Redirect to the route with (without) a trailing slash when only that
    /// variant exists: 301 for GET, 308 for everything else.
    pub redirect_trailing_slash: bool,

    /// When no route matches, clean the path and retry case-insensitively;
    /// redirect to the recovered canonical path on success.
    pub redirect_fixed_path: bool,

    /// Answer requests whose path is served by other methods with 405 and
    /// an `Allow` header instead of 404.
    pub handle_method_not_allowed: bool,

    /// Answer OPTIONS requests automatically. Explicitly registered OPTIONS
    /// routes take priority.
    pub handle_options: bool,

    /// Record the matched route pattern as a parameter named
    /// [`MATCHED_ROUTE_PATH`] in front of the captured parameters.
    pub save_matched_route_path: bool,

    /// Called when no route matches. Defaults to a plain 404.
    pub not_found: Option<Handler>,

    /// Called on 405 after the `Allow` header is decided. Defaults to a
    /// plain 405 with the standard reason phrase.
    pub method_not_allowed: Option<Handler>,

    /// Called on automatic OPTIONS responses instead of the empty 200.
    pub global_options: Option<Handler>,

    /// Called with the error a handler returned. Defaults to a plain 500
    /// carrying the error message.
    pub error_handler: Option<ErrorHandler>,

    /// Largest number of parameters any registered route can capture.
    max_params: usize,

    /// Cached `Allow` value for server-wide OPTIONS requests.
    global_allowed: String,
}

impl Router {
    /// Create a router with path auto-correction, trailing-slash redirects,
    /// automatic OPTIONS and 405 handling enabled.
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
            save_matched_route_path: false,
            not_found: None,
            method_not_allowed: None,
            global_options: None,
            error_handler: None,
            max_params: 0,
            global_allowed: String::new(),
        }
    }

    /// Register `handler` for the given method and route pattern.
    ///
    /// The pattern must begin with '/'. Segments starting with ':' match one
    /// path segment and are captured under the name that follows; a final
    /// segment starting with '*' captures the rest of the path including its
    /// leading '/'.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handler: RouteHandler,
    ) -> Result<(), RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath(path.to_owned()));
        }

        let handler = if self.save_matched_route_path {
            let route = path.to_owned();
            let inner = handler;
            Arc::new(move |request: HttpRequest, mut params: Params| {
                params.prepend(Param::new(MATCHED_ROUTE_PATH, route.clone()));
                inner(request, params)
            }) as RouteHandler
        } else {
            handler
        };

        let root = self.trees.entry(method).or_insert_with(Node::new);
        root.insert(path, handler)?;

        let mut params = count_params(path);
        if self.save_matched_route_path {
            params += 1;
        }
        self.max_params = self.max_params.max(params);
        self.refresh_global_allowed();
        Ok(())
    }

    /// Register the same handler for several methods at once. An empty
    /// method list means [`Method::ALL`].
    pub fn handle_all(
        &mut self,
        path: &str,
        handler: RouteHandler,
        methods: &[Method],
    ) -> Result<(), RouteError> {
        let methods = if methods.is_empty() {
            &Method::ALL[..]
        } else {
            methods
        };
        for &method in methods {
            self.handle(method, path, handler.clone())?;
        }
        Ok(())
    }

    /// Shortcut for [`Router::handle`] with [`Method::GET`].
    pub fn get<F, Fut>(&mut self, path: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(Method::GET, path, route_handler(handler))
    }

    /// Shortcut for [`Router::handle`] with [`Method::HEAD`].
    pub fn head<F, Fut>(&mut self, path: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(Method::HEAD, path, route_handler(handler))
    }

    /// Shortcut for [`Router::handle`] with [`Method::POST`].
    pub fn post<F, Fut>(&mut self, path: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(Method::POST, path, route_handler(handler))
    }

    /// Shortcut for [`Router::handle`] with [`Method::PUT`].
    pub fn put<F, Fut>(&mut self, path: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(Method::PUT, path, route_handler(handler))
    }

    /// Shortcut for [`Router::handle`] with [`Method::PATCH`].
    pub fn patch<F, Fut>(&mut self, path: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(Method::PATCH, path, route_handler(handler))
    }

    /// Shortcut for [`Router::handle`] with [`Method::DELETE`].
    pub fn delete<F, Fut>(&mut self, path: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(Method::DELETE, path, route_handler(handler))
    }

    /// Shortcut for [`Router::handle`] with [`Method::OPTIONS`].
    pub fn options<F, Fut>(&mut self, path: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(HttpRequest, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(Method::OPTIONS, path, route_handler(handler))
    }

    /// Probe the tree for `method` and `path` without dispatching.
    ///
    /// Returns the registered handler, the captured parameters, and the
    /// trailing-slash recommendation.
    pub fn lookup(&self, method: Method, path: &str) -> (Option<RouteHandler>, Params, bool) {
        let mut params = Params::with_reserve(self.max_params);
        match self.trees.get(&method) {
            Some(root) => {
                let (handler, tsr) = root.get_value(path, Some(&mut params));
                (handler.cloned(), params, tsr)
            }
            None => (None, params, false),
        }
    }

    /// List the registered route patterns, sorted ascending, per method.
    /// With `method` set, only that method's patterns are returned.
    pub fn list_paths(&self, method: Option<Method>) -> HashMap<Method, Vec<String>> {
        let mut out = HashMap::new();
        for (&m, root) in &self.trees {
            if method.is_some_and(|want| want != m) {
                continue;
            }
            let mut paths = Vec::new();
            root.collect_paths("", &mut paths);
            paths.sort_unstable();
            out.insert(m, paths);
        }
        out
    }

    /// Dispatch a request and produce exactly one response.
    ///
    /// The request walks the state machine described on the crate: tree
    /// match, trailing-slash redirect, case-insensitive path recovery,
    /// implicit HEAD, automatic OPTIONS, 405, and finally 404.
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        if let Some(response) = self.try_serve(&request, request.method).await {
            return response;
        }

        // No HEAD handler was set up; retry as if this were a GET request.
        // The transport discards the response body.
        if request.method == Method::HEAD {
            if let Some(response) = self.try_serve(&request, Method::GET).await {
                return response;
            }
        }

        let (path, _) = split_path_query(&request.path);

        if request.method == Method::OPTIONS && self.handle_options {
            let allow = self.allowed(path, Method::OPTIONS);
            if !allow.is_empty() {
                if let Some(handler) = &self.global_options {
                    let response = self.invoke_plain(handler, request).await;
                    return with_allow(response, &allow);
                }
                return HttpResponse::new(StatusCode::Ok).with_header("Allow", allow);
            }
        } else if self.handle_method_not_allowed {
            let allow = self.allowed(path, request.method);
            if !allow.is_empty() {
                if let Some(handler) = &self.method_not_allowed {
                    let response = self.invoke_plain(handler, request).await;
                    return with_allow(response, &allow);
                }
                return HttpResponse::new(StatusCode::MethodNotAllowed)
                    .with_header("Allow", allow)
                    .with_content_type("text/plain")
                    .with_body_string(StatusCode::MethodNotAllowed.reason_phrase());
            }
        }

        debug!("no route for {} {}", request.method, request.path);
        match &self.not_found {
            Some(handler) => self.invoke_plain(handler, request).await,
            None => HttpResponse::new(StatusCode::NotFound)
                .with_content_type("text/plain")
                .with_body_string(StatusCode::NotFound.reason_phrase()),
        }
    }

    /// Attempt to serve the request from the tree of `method`. Returns None
    /// when neither a handler nor a redirect applies.
    async fn try_serve(&self, request: &HttpRequest, method: Method) -> Option<HttpResponse> {
        let root = self.trees.get(&method)?;
        let (path, query) = split_path_query(&request.path);

        let mut params = Params::with_reserve(self.max_params);
        let (handler, tsr) = root.get_value(path, Some(&mut params));

        if let Some(handler) = handler {
            let handler = handler.clone();
            // parameters captured by an enclosing router come first
            let params = if request.params.is_empty() {
                params
            } else {
                let mut merged = request.params.clone();
                merged.extend(params);
                merged
            };
            let response = match handler(request.clone(), params).await {
                Ok(response) => response,
                Err(err) => self.recover(request.clone(), err).await,
            };
            return Some(response);
        }

        if method != Method::CONNECT && path != "/" {
            if tsr && self.redirect_trailing_slash {
                let fixed = if path.len() > 1 && path.ends_with('/') {
                    path[..path.len() - 1].to_owned()
                } else {
                    format!("{path}/")
                };
                return Some(redirect(method, fixed, query));
            }

            if self.redirect_fixed_path {
                let cleaned = clean_path(path);
                if let Some(fixed) =
                    root.find_case_insensitive_path(&cleaned, self.redirect_trailing_slash)
                {
                    return Some(redirect(method, fixed, query));
                }
            }
        }

        None
    }

    async fn invoke_plain(&self, handler: &Handler, request: HttpRequest) -> HttpResponse {
        match handler(request.clone()).await {
            Ok(response) => response,
            Err(err) => self.recover(request, err).await,
        }
    }

    /// Recovery point for handler errors: the request still gets exactly one
    /// response.
    async fn recover(&self, request: HttpRequest, err: Error) -> HttpResponse {
        error!(
            "handler error for {} {}: {err}",
            request.method, request.path
        );
        match &self.error_handler {
            Some(handler) => handler(request, err).await,
            None => HttpResponse::new(StatusCode::InternalServerError)
                .with_content_type("text/plain")
                .with_body_string(format!("Internal server error: {err}")),
        }
    }

    /// The value for an `Allow` header on `path`: every method other than
    /// `req_method` whose tree matches the path, plus OPTIONS, sorted
    /// ascending. `"*"` answers for the whole server from the cache. An
    /// empty string means no other method matches.
    pub fn allowed(&self, path: &str, req_method: Method) -> String {
        if path == "*" {
            return self.global_allowed.clone();
        }

        let mut allow: Vec<&'static str> = Vec::new();
        for (&method, root) in &self.trees {
            if method == req_method || method == Method::OPTIONS {
                continue;
            }
            let (handler, _) = root.get_value(path, None);
            if handler.is_some() {
                allow.push(method.as_str());
            }
        }

        if allow.is_empty() {
            return String::new();
        }
        allow.push(Method::OPTIONS.as_str());
        allow.sort_unstable();
        allow.join(", ")
    }

    fn refresh_global_allowed(&mut self) {
        let mut methods: Vec<&'static str> = self
            .trees
            .keys()
            .filter(|&&m| m != Method::OPTIONS)
            .map(|m| m.as_str())
            .collect();

        if methods.is_empty() {
            self.global_allowed.clear();
            return;
        }
        methods.push(Method::OPTIONS.as_str());
        methods.sort_unstable();
        self.global_allowed = methods.join(", ");
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a request target into its path and query parts.
pub(crate) fn split_path_query(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

/// Build a permanent redirect: 301 for GET, 308 for everything else, so
/// non-GET requests are replayed with the same method.
fn redirect(method: Method, mut location: String, query: Option<&str>) -> HttpResponse {
    if let Some(query) = query {
        location.push('?');
        location.push_str(query);
    }
    let status = if method == Method::GET {
        StatusCode::MovedPermanently
    } else {
        StatusCode::PermanentRedirect
    };
    debug!("redirecting {method} request to {location}");
    HttpResponse::new(status).with_header("Location", location)
}

/// Add the `Allow` header to a fallback handler's response unless the
/// handler already chose its own value.
fn with_allow(mut response: HttpResponse, allow: &str) -> HttpResponse {
    if !response.headers.contains_key("Allow") {
        response
            .headers
            .insert("Allow".to_string(), allow.to_string());
    }
    response
}
