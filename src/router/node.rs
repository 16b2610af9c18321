//! Compressed prefix tree keyed by URL path.
//!
//! Each edge label is a string fragment; the concatenation of labels from the
//! root to a node spells a registered route. Parameter segments (`:name`) and
//! catch-all segments (`*name`) live in a dedicated wildcard slot per node,
//! separate from the static children.

use crate::router::error::RouteError;
use crate::router::params::{Param, Params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// An ordinary path fragment.
    Static,
    /// A `:name` segment matching exactly one path segment.
    Param,
    /// A `*name` segment matching the remainder of the path.
    CatchAll,
}

pub(crate) struct Node<T> {
    /// Path fragment common to all routes passing through this node.
    pub(crate) prefix: String,
    pub(crate) kind: NodeKind,
    /// Dispatch bytes, mirroring the static children one to one.
    pub(crate) indices: Vec<u8>,
    /// Static children, sorted by priority in descending order.
    pub(crate) children: Vec<Node<T>>,
    /// The parameter or catch-all subtree, at most one per node.
    pub(crate) wild_child: Option<Box<Node<T>>>,
    /// Number of routes passing through this node; governs sibling order.
    pub(crate) priority: u32,
    pub(crate) value: Option<T>,
}

impl<T> Node<T> {
    pub(crate) fn new() -> Self {
        Self {
            prefix: String::new(),
            kind: NodeKind::Static,
            indices: Vec::new(),
            children: Vec::new(),
            wild_child: None,
            priority: 0,
            value: None,
        }
    }

    /// Register `value` under the route pattern `path`.
    pub(crate) fn insert(&mut self, path: &str, value: T) -> Result<(), RouteError> {
        validate_route(path)?;

        // first route in this tree claims the root outright
        if self.prefix.is_empty()
            && self.children.is_empty()
            && self.wild_child.is_none()
            && self.value.is_none()
        {
            *self = Self::build_chain(path, value);
            return Ok(());
        }

        self.priority += 1;
        Self::insert_into(self, path, path, value)
    }

    /// One step of the tree walk performed by [`insert`](Self::insert),
    /// recursing into a child instead of looping so that each mutable borrow
    /// of the tree is scoped to its own call frame.
    fn insert_into(current: &mut Self, rest: &str, path: &str, value: T) -> Result<(), RouteError> {
        let common = longest_common_prefix(rest, &current.prefix);

        // a dispatch byte matched but the first code points differ; the
        // routes cannot share a first-byte slot
        if common == 0 && !current.prefix.is_empty() {
            return Err(RouteError::WildcardConflict(path.to_owned()));
        }

        // the route diverges inside this node's prefix: split the edge
        if common < current.prefix.len() {
            let split = Node {
                prefix: current.prefix[common..].to_owned(),
                kind: NodeKind::Static,
                indices: std::mem::take(&mut current.indices),
                children: std::mem::take(&mut current.children),
                wild_child: current.wild_child.take(),
                priority: current.priority - 1,
                value: current.value.take(),
            };
            current.indices = vec![split.prefix.as_bytes()[0]];
            current.children = vec![split];
            current.prefix.truncate(common);
        }

        // the route terminates at this node
        if common == rest.len() {
            if current.value.is_some() {
                return Err(RouteError::Duplicate(path.to_owned()));
            }
            current.value = Some(value);
            return Ok(());
        }

        let rest = &rest[common..];
        let next = rest.as_bytes()[0];

        if next == b':' || next == b'*' {
            let token = wildcard_token(rest);

            // an existing wildcard child must spell the same wildcard
            if current.wild_child.is_some() {
                if current.wild_child.as_deref().map(|w| w.prefix.as_str()) != Some(token) {
                    return Err(RouteError::WildcardConflict(path.to_owned()));
                }
                let wild = current.wild_child.as_deref_mut().unwrap();
                wild.priority += 1;
                return Self::insert_into(wild, rest, path, value);
            }

            if !current.prefix.ends_with('/') {
                return Err(RouteError::MalformedWildcard(path.to_owned()));
            }
            if next == b'*' {
                // this segment root already carries routes of its own
                return Err(RouteError::WildcardConflict(path.to_owned()));
            }
            current.wild_child = Some(Box::new(Self::build_chain(rest, value)));
            return Ok(());
        }

        // a catch-all owns everything below this node; statics would
        // shadow it
        if current
            .wild_child
            .as_deref()
            .is_some_and(|w| w.kind == NodeKind::CatchAll)
        {
            return Err(RouteError::WildcardConflict(path.to_owned()));
        }

        // descend into the static child for this byte
        if let Some(pos) = current.indices.iter().position(|&c| c == next) {
            let pos = current.bump_child(pos);
            return Self::insert_into(&mut current.children[pos], rest, path, value);
        }

        // no child matches: append a fresh subtree
        current.indices.push(next);
        current.children.push(Self::build_chain(rest, value));
        Ok(())
    }

    /// Build the node chain for a route suffix with no existing tree to merge
    /// into. Every node on the chain carries priority 1.
    fn build_chain(suffix: &str, value: T) -> Self {
        match find_wildcard(suffix) {
            None => Node {
                prefix: suffix.to_owned(),
                priority: 1,
                value: Some(value),
                ..Node::new()
            },
            Some((0, token, false)) => {
                let mut node = Node {
                    prefix: token.to_owned(),
                    kind: NodeKind::Param,
                    priority: 1,
                    ..Node::new()
                };
                let after = &suffix[token.len()..];
                if after.is_empty() {
                    node.value = Some(value);
                } else {
                    // everything after a parameter starts with '/'
                    node.indices.push(after.as_bytes()[0]);
                    node.children.push(Self::build_chain(after, value));
                }
                node
            }
            Some((0, token, true)) => Node {
                prefix: token.to_owned(),
                kind: NodeKind::CatchAll,
                priority: 1,
                value: Some(value),
                ..Node::new()
            },
            Some((start, _, catch_all)) => {
                // for a catch-all, the '/' before it stays out of the static
                // prefix so that the capture includes it
                let stop = if catch_all { start - 1 } else { start };
                let mut node = Node {
                    prefix: suffix[..stop].to_owned(),
                    priority: 1,
                    ..Node::new()
                };
                node.wild_child = Some(Box::new(Self::build_chain(&suffix[start..], value)));
                node
            }
        }
    }

    /// Increment the priority of the child at `pos` and bubble it forward
    /// until the descending-priority order of its siblings is restored.
    /// Returns the child's new position.
    fn bump_child(&mut self, pos: usize) -> usize {
        self.children[pos].priority += 1;
        let priority = self.children[pos].priority;

        let mut new_pos = pos;
        while new_pos > 0 && self.children[new_pos - 1].priority < priority {
            self.children.swap(new_pos - 1, new_pos);
            self.indices.swap(new_pos - 1, new_pos);
            new_pos -= 1;
        }
        new_pos
    }

    /// Walk the tree for `path`, capturing wildcard values into `params` when
    /// a sink is supplied.
    ///
    /// Returns the handler registered for the path, if any, and the
    /// trailing-slash recommendation: `true` means no handler matched but one
    /// would if a trailing slash were added to or removed from the path.
    pub(crate) fn get_value<'t>(
        &'t self,
        full_path: &str,
        mut params: Option<&mut Params>,
    ) -> (Option<&'t T>, bool) {
        let mut current = self;
        let mut path = full_path;

        loop {
            let prefix = current.prefix.as_str();

            if path.len() > prefix.len() && path.as_bytes().starts_with(prefix.as_bytes()) {
                path = &path[prefix.len()..];
                let next = path.as_bytes()[0];

                // static children first
                if let Some(pos) = current.indices.iter().position(|&c| c == next) {
                    current = &current.children[pos];
                    continue;
                }

                // fall through to the wildcard child
                return match current.wild_child.as_deref() {
                    Some(wild) if wild.kind == NodeKind::Param => {
                        let end = path.find('/').unwrap_or(path.len());
                        if let Some(sink) = params.as_deref_mut() {
                            sink.push(Param::new(&wild.prefix[1..], &path[..end]));
                        }

                        if end < path.len() {
                            // the parameter is followed by more path
                            if let Some(child) = wild.children.first() {
                                path = &path[end..];
                                current = child;
                                continue;
                            }
                            // a lone trailing slash would match without it
                            return (None, path.len() == end + 1);
                        }

                        if wild.value.is_some() {
                            return (wild.value.as_ref(), false);
                        }

                        // no handler here, but the slashed variant may exist
                        let tsr = wild.children.first().is_some_and(slash_variant_has_value);
                        (None, tsr)
                    }
                    Some(wild) => {
                        // catch-all: consume the remainder, leading '/' included
                        if let Some(sink) = params.as_deref_mut() {
                            sink.push(Param::new(&wild.prefix[1..], path));
                        }
                        (wild.value.as_ref(), false)
                    }
                    None => {
                        // dead end; dropping a trailing slash may help
                        (None, path == "/" && current.value.is_some())
                    }
                };
            }

            if path == prefix {
                if current.value.is_some() {
                    return (current.value.as_ref(), false);
                }

                // the path ends one level above a wildcard route
                if path == "/" && current.wild_child.is_some() && !std::ptr::eq(current, self) {
                    return (None, true);
                }

                // a '/'-child with a handler means the slashed variant exists
                if let Some(pos) = current.indices.iter().position(|&c| c == b'/') {
                    return (None, slash_variant_has_value(&current.children[pos]));
                }
                if let Some(wild) = current.wild_child.as_deref() {
                    if wild.kind == NodeKind::CatchAll && wild.value.is_some() {
                        return (None, true);
                    }
                }
                return (None, false);
            }

            // the path diverged from, or ran out inside, this node's prefix
            let tsr = path == "/"
                || (prefix.len() == path.len() + 1
                    && prefix.as_bytes()[path.len()] == b'/'
                    && prefix.as_bytes().starts_with(path.as_bytes())
                    && current.value.is_some());
            return (None, tsr);
        }
    }

    /// Look up `path` while folding letter case per Unicode code point,
    /// returning the canonically cased route path on success. With
    /// `fix_trailing_slash`, a single missing or superfluous trailing slash
    /// is tolerated. Wildcard captures keep the casing of the request.
    pub(crate) fn find_case_insensitive_path(
        &self,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        let mut out = String::with_capacity(path.len() + 1);
        if self.find_case_insensitive(path, fix_trailing_slash, &mut out) {
            Some(out)
        } else {
            None
        }
    }

    fn find_case_insensitive(&self, path: &str, fix: bool, out: &mut String) -> bool {
        let consumed = match fold_consume(&self.prefix, path) {
            Some(n) => n,
            None => {
                // the path may be exactly one trailing slash short of this
                // node's prefix
                if fix && self.value.is_some() && self.prefix.ends_with('/') {
                    let trimmed = &self.prefix[..self.prefix.len() - 1];
                    if fold_consume(trimmed, path) == Some(path.len()) {
                        out.push_str(&self.prefix);
                        return true;
                    }
                }
                return false;
            }
        };
        let rest = &path[consumed..];
        out.push_str(&self.prefix);

        if rest.is_empty() {
            if self.value.is_some() {
                return true;
            }
            if fix {
                // the route may exist with a trailing slash added
                if let Some(pos) = self.indices.iter().position(|&c| c == b'/') {
                    if slash_variant_has_value(&self.children[pos]) {
                        out.push('/');
                        return true;
                    }
                }
                if let Some(wild) = self.wild_child.as_deref() {
                    if wild.kind == NodeKind::CatchAll && wild.value.is_some() {
                        out.push('/');
                        return true;
                    }
                }
            }
            return false;
        }

        // both case variants of the next code point may exist as children
        if let Some(first) = rest.chars().next() {
            let checkpoint = out.len();
            let lower = fold_lower(first);
            let upper = fold_upper(first);
            let mut variants = [Some(lower), Some(upper)];
            if lower == upper {
                variants[1] = None;
            }
            for variant in variants.into_iter().flatten() {
                let mut encoded = [0u8; 4];
                let first_byte = variant.encode_utf8(&mut encoded).as_bytes()[0];
                if let Some(pos) = self.indices.iter().position(|&c| c == first_byte) {
                    if self.children[pos].find_case_insensitive(rest, fix, out) {
                        return true;
                    }
                    out.truncate(checkpoint);
                }
            }
        }

        match self.wild_child.as_deref() {
            Some(wild) if wild.kind == NodeKind::Param => {
                let end = rest.find('/').unwrap_or(rest.len());
                // the captured segment keeps the request's casing
                out.push_str(&rest[..end]);

                if end < rest.len() {
                    if let Some(child) = wild.children.first() {
                        return child.find_case_insensitive(&rest[end..], fix, out);
                    }
                    // a lone trailing slash is dropped
                    return fix && rest.len() == end + 1;
                }

                if wild.value.is_some() {
                    return true;
                }
                if fix {
                    if let Some(child) = wild.children.first() {
                        if child.prefix == "/" && child.value.is_some() {
                            out.push('/');
                            return true;
                        }
                    }
                }
                false
            }
            Some(wild) => {
                out.push_str(rest);
                wild.value.is_some()
            }
            None => fix && rest == "/" && self.value.is_some(),
        }
    }

    /// Reconstruct the full route pattern of every node carrying a handler.
    pub(crate) fn collect_paths(&self, parent: &str, out: &mut Vec<String>) {
        let mut here = String::with_capacity(parent.len() + self.prefix.len() + 1);
        here.push_str(parent);
        if self.kind == NodeKind::CatchAll {
            here.push('/');
        }
        here.push_str(&self.prefix);

        if self.value.is_some() {
            out.push(here.clone());
        }
        for child in &self.children {
            child.collect_paths(&here, out);
        }
        if let Some(wild) = self.wild_child.as_deref() {
            wild.collect_paths(&here, out);
        }
    }

    /// Verify the priority bookkeeping across the whole subtree: each node's
    /// priority must equal the number of registered routes below it.
    #[cfg(test)]
    pub(crate) fn check_priorities(&self) -> Result<u32, (u32, u32)> {
        let mut expected = 0;
        for child in &self.children {
            expected += child.check_priorities()?;
        }
        if let Some(wild) = self.wild_child.as_deref() {
            expected += wild.check_priorities()?;
        }
        if self.value.is_some() {
            expected += 1;
        }
        if self.priority != expected {
            return Err((self.priority, expected));
        }
        Ok(expected)
    }
}

/// True when `child` carries the handler that an added trailing slash would
/// reach: either a literal `/` leaf or a catch-all hanging off an empty
/// fragment.
fn slash_variant_has_value<T>(child: &Node<T>) -> bool {
    (child.prefix == "/" && child.value.is_some())
        || (child.prefix.is_empty()
            && child
                .wild_child
                .as_deref()
                .is_some_and(|w| w.value.is_some()))
}

/// Byte length of the longest shared prefix, counted in whole code points so
/// a split never lands inside a multi-byte character.
fn longest_common_prefix(a: &str, b: &str) -> usize {
    let mut len = 0;
    let mut a_chars = a.chars();
    let mut b_chars = b.chars();
    loop {
        match (a_chars.next(), b_chars.next()) {
            (Some(x), Some(y)) if x == y => len += x.len_utf8(),
            _ => return len,
        }
    }
}

/// The wildcard token (`:name` or `*name`) at the start of `rest`.
fn wildcard_token(rest: &str) -> &str {
    let end = rest.find('/').unwrap_or(rest.len());
    &rest[..end]
}

/// Locate the next wildcard in a validated route suffix.
/// Returns its byte offset, its token, and whether it is a catch-all.
fn find_wildcard(suffix: &str) -> Option<(usize, &str, bool)> {
    let bytes = suffix.as_bytes();
    for (start, &c) in bytes.iter().enumerate() {
        if c != b':' && c != b'*' {
            continue;
        }
        let mut end = start + 1;
        while end < bytes.len() && bytes[end] != b'/' {
            end += 1;
        }
        return Some((start, &suffix[start..end], c == b'*'));
    }
    None
}

/// Check the wildcard syntax of a route pattern before any tree mutation.
fn validate_route(path: &str) -> Result<(), RouteError> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c != b':' && c != b'*' {
            i += 1;
            continue;
        }
        // wildcards sit directly behind a slash
        if i == 0 || bytes[i - 1] != b'/' {
            return Err(RouteError::MalformedWildcard(path.to_owned()));
        }
        let mut end = i + 1;
        while end < bytes.len() && bytes[end] != b'/' {
            if bytes[end] == b':' || bytes[end] == b'*' {
                // two wildcards in one segment
                return Err(RouteError::MalformedWildcard(path.to_owned()));
            }
            end += 1;
        }
        if end == i + 1 {
            // unnamed wildcard
            return Err(RouteError::MalformedWildcard(path.to_owned()));
        }
        if c == b'*' && end != bytes.len() {
            // a catch-all must terminate the route
            return Err(RouteError::MalformedWildcard(path.to_owned()));
        }
        i = end;
    }
    Ok(())
}

/// Case-insensitively consume all of `prefix` from the front of `path`,
/// folding per code point. Returns the number of path bytes consumed.
fn fold_consume(prefix: &str, path: &str) -> Option<usize> {
    let mut consumed = 0;
    let mut path_chars = path.chars();
    for p in prefix.chars() {
        let c = path_chars.next()?;
        if !fold_eq(p, c) {
            return None;
        }
        consumed += c.len_utf8();
    }
    Some(consumed)
}

fn fold_eq(a: char, b: char) -> bool {
    a == b || fold_lower(a) == fold_lower(b)
}

/// Simple one-to-one lowercase mapping; code points with multi-character
/// lowercase expansions are left unchanged.
fn fold_lower(c: char) -> char {
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Simple one-to-one uppercase mapping, see [`fold_lower`].
fn fold_upper(c: char) -> char {
    let mut it = c.to_uppercase();
    match (it.next(), it.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}
