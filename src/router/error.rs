//! Error types for route registration.

use thiserror::Error;

/// Errors that can occur while registering a route.
///
/// All of these signal programmer misuse of the routing API and should be
/// treated as fatal during application startup.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The route path does not begin with '/'.
    #[error("route path must begin with '/': {0:?}")]
    InvalidPath(String),

    /// The same method and path were registered twice.
    #[error("a handler is already registered for path: {0:?}")]
    Duplicate(String),

    /// The route disagrees with an existing route about the wildcard at the
    /// same position, or a catch-all clashes with existing routes at its
    /// segment root.
    #[error("route conflicts with an existing wildcard segment: {0:?}")]
    WildcardConflict(String),

    /// A wildcard segment is syntactically invalid: not at a segment start,
    /// unnamed, sharing a segment with another wildcard, or a catch-all that
    /// is not the final segment.
    #[error("malformed wildcard segment in route: {0:?}")]
    MalformedWildcard(String),
}
