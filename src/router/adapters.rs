//! Adapters gluing handlers, nested routers and file serving onto the core.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use crate::parser::{HttpRequest, Method};
use crate::router::core::{split_path_query, Router};
use crate::router::error::RouteError;
use crate::router::handler::{Handler, RouteHandler};
use crate::router::params::Params;
use crate::router::path::clean_path;
use crate::server::{Error, HttpResponse, StatusCode};

impl Router {
    /// Mount `handler` under a catch-all route, trimming the prefix from the
    /// path before each request reaches it.
    ///
    /// The pattern must end with `/*filepath`, or with `/*` which is
    /// expanded to it. The handler sees the request path rewritten to the
    /// captured remainder, with all captured parameters stored on the
    /// request: a pattern `/a/b/*filepath` receiving `/a/b/foo` passes on a
    /// request for `/foo`.
    ///
    /// An empty method list mounts the handler for [`Method::ALL`].
    pub fn sub_router(
        &mut self,
        path: &str,
        handler: Handler,
        methods: &[Method],
    ) -> Result<(), RouteError> {
        let full = if let Some(stripped) = path.strip_suffix("/*") {
            format!("{stripped}/*filepath")
        } else if path.ends_with("/*filepath") {
            path.to_owned()
        } else {
            return Err(RouteError::MalformedWildcard(path.to_owned()));
        };

        let wrapped: RouteHandler = Arc::new(move |mut request: HttpRequest, params: Params| {
            let sub_path = params.by_name("filepath").unwrap_or("").to_owned();
            let (_, query) = split_path_query(&request.path);
            request.path = match query {
                Some(query) => format!("{sub_path}?{query}"),
                None => sub_path,
            };
            request.params = params;
            handler(request)
        });

        self.handle_all(&full, wrapped, methods)
    }

    /// Serve files from `root` under a catch-all route, for GET and HEAD.
    ///
    /// The pattern must end with `/*filepath`; the captured remainder is
    /// canonicalized and resolved below `root`, so requests cannot escape
    /// the directory. Missing files answer 404.
    pub fn serve_files(
        &mut self,
        path: &str,
        root: impl Into<PathBuf>,
    ) -> Result<(), RouteError> {
        if !path.ends_with("/*filepath") {
            return Err(RouteError::MalformedWildcard(path.to_owned()));
        }

        let root: PathBuf = root.into();
        let handler: RouteHandler = Arc::new(move |request: HttpRequest, params: Params| {
            let root = root.clone();
            let rel = params.by_name("filepath").unwrap_or("").to_owned();
            Box::pin(async move { serve_file(root, rel, request.method).await })
        });

        self.handle(Method::GET, path, handler.clone())?;
        self.handle(Method::HEAD, path, handler)
    }

    /// Make this router usable as a plain handler, e.g. as another router's
    /// `not_found` fallback.
    pub fn into_handler(self: Arc<Self>) -> Handler {
        Arc::new(move |request: HttpRequest| {
            let router = Arc::clone(&self);
            Box::pin(async move { Ok(router.dispatch(request).await) })
        })
    }
}

/// Wrap `handler` so that `count` leading path segments are dropped from the
/// request before it is delegated: with `count` = 2, a request for
/// `/a/b/c/d` is passed on as `/c/d`. The original request is not modified;
/// the handler receives an adjusted copy.
pub fn strip_leading_segments(count: usize, handler: Handler) -> Handler {
    if count == 0 {
        return handler;
    }

    Arc::new(move |mut request: HttpRequest| {
        let (path, query) = split_path_query(&request.path);

        let mut p = path;
        let mut remaining = count;
        while remaining > 0 && !p.is_empty() {
            // the path always starts with a leading '/'
            match p[1..].find('/') {
                Some(slash) if slash > 0 => p = &p[slash + 1..],
                _ => p = "",
            }
            remaining -= 1;
        }

        request.path = match query {
            Some(query) => format!("{p}?{query}"),
            None => p.to_owned(),
        };
        handler(request)
    })
}

async fn serve_file(root: PathBuf, rel: String, method: Method) -> Result<HttpResponse, Error> {
    let cleaned = clean_path(&rel);
    let full = root.join(cleaned.trim_start_matches('/'));

    match tokio::fs::read(&full).await {
        Ok(bytes) => {
            let response = HttpResponse::new(StatusCode::Ok)
                .with_content_type(content_type_for(&full));
            if method == Method::HEAD {
                Ok(response.with_header("Content-Length", bytes.len().to_string()))
            } else {
                Ok(response.with_body_bytes(bytes))
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("file not found: {}", full.display());
            Ok(HttpResponse::new(StatusCode::NotFound)
                .with_content_type("text/plain")
                .with_body_string(format!("Not found: {cleaned}")))
        }
        Err(err) => Err(Error::IoError(err)),
    }
}

/// A content type guessed from the file extension.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
