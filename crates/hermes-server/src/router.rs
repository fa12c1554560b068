//! Path router producing [`Params`] for service endpoints.
//!
//! Patterns are split on `/` into segments of three kinds:
//!
//! - literal segments (`users`)
//! - named parameters (`{id}`), matching exactly one segment
//! - a trailing catch-all (`*path`), matching one or more segments
//!
//! When several patterns could match, literals win over parameters and
//! parameters win over the catch-all. Matching backtracks, so
//! `/users/me/posts` still reaches `/users/{id}/posts` when `/users/me` is
//! registered on its own. Empty segments are ignored, which makes a trailing
//! slash insignificant.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::{BoxFuture, Params};
//! use hermes_extract::InboundRequest;
//! use hermes_server::{Lookup, Router};
//! use hermes_service::Endpoint;
//! use bytes::Bytes;
//! use http::{Method, Response};
//!
//! struct Hello;
//!
//! impl Endpoint for Hello {
//!     fn call(&self, _req: InboundRequest, _params: Params) -> BoxFuture<'_, Response<Bytes>> {
//!         Box::pin(async { Response::new(Bytes::from_static(b"hello")) })
//!     }
//!
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//! }
//!
//! let mut router = Router::new();
//! router.add(Method::GET, "/users/{id}", Hello).unwrap();
//!
//! match router.lookup(&Method::GET, "/users/42") {
//!     Lookup::Found(found) => {
//!         assert_eq!(found.endpoint().name(), "hello");
//!         assert_eq!(found.params().get("id"), Some("42"));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use hermes_core::Params;
use hermes_service::Endpoint;
use http::Method;

use crate::error::ServerError;

/// Kind of a pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'p> {
    Literal(&'p str),
    Param(&'p str),
    CatchAll(&'p str),
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, ServerError> {
    if !pattern.starts_with('/') {
        return Err(ServerError::invalid_route(pattern, "must start with '/'"));
    }

    let raw: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = Vec::with_capacity(raw.len());
    for (i, s) in raw.iter().enumerate() {
        let segment = if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Segment::Param(name)
        } else if let Some(name) = s.strip_prefix('*') {
            if i + 1 != raw.len() {
                return Err(ServerError::invalid_route(
                    pattern,
                    "catch-all must be the last segment",
                ));
            }
            Segment::CatchAll(name)
        } else if s.contains(['{', '}']) {
            return Err(ServerError::invalid_route(
                pattern,
                format!("malformed parameter segment '{s}'"),
            ));
        } else {
            Segment::Literal(s)
        };

        if let Segment::Param(name) | Segment::CatchAll(name) = segment {
            if name.is_empty() {
                return Err(ServerError::invalid_route(pattern, "unnamed parameter"));
            }
        }
        segments.push(segment);
    }
    Ok(segments)
}

struct Route {
    method: Method,
    pattern: String,
    endpoint: Arc<dyn Endpoint>,
}

#[derive(Default)]
struct Node {
    routes: Vec<Route>,
    literals: Vec<(String, Node)>,
    param: Option<(String, Box<Node>)>,
    catch_all: Option<(String, Box<Node>)>,
}

impl Node {
    fn insert(&mut self, segments: &[Segment<'_>], pattern: &str) -> Result<&mut Node, ServerError> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(self);
        };

        let child = match first {
            Segment::Literal(literal) => {
                let index = match self
                    .literals
                    .binary_search_by(|(s, _)| s.as_str().cmp(literal))
                {
                    Ok(i) => i,
                    Err(i) => {
                        self.literals.insert(i, ((*literal).to_string(), Node::default()));
                        i
                    }
                };
                &mut self.literals[index].1
            }
            Segment::Param(name) => {
                let (existing, node) = self
                    .param
                    .get_or_insert_with(|| ((*name).to_string(), Box::default()));
                if existing.as_str() != *name {
                    return Err(ServerError::invalid_route(
                        pattern,
                        format!("parameter '{{{name}}}' conflicts with '{{{existing}}}'"),
                    ));
                }
                node.as_mut()
            }
            Segment::CatchAll(name) => {
                let (existing, node) = self
                    .catch_all
                    .get_or_insert_with(|| ((*name).to_string(), Box::default()));
                if existing.as_str() != *name {
                    return Err(ServerError::invalid_route(
                        pattern,
                        format!("catch-all '*{name}' conflicts with '*{existing}'"),
                    ));
                }
                node.as_mut()
            }
        };
        child.insert(rest, pattern)
    }

    fn find<'n>(
        &'n self,
        segments: &[&str],
        captured: &mut Vec<(&'n str, String)>,
    ) -> Option<&'n Node> {
        let Some((first, rest)) = segments.split_first() else {
            return (!self.routes.is_empty()).then_some(self);
        };

        if let Ok(i) = self
            .literals
            .binary_search_by(|(s, _)| s.as_str().cmp(first))
        {
            if let Some(node) = self.literals[i].1.find(rest, captured) {
                return Some(node);
            }
        }

        if let Some((name, child)) = &self.param {
            let mark = captured.len();
            captured.push((name.as_str(), (*first).to_string()));
            if let Some(node) = child.find(rest, captured) {
                return Some(node);
            }
            captured.truncate(mark);
        }

        if let Some((name, child)) = &self.catch_all {
            if !child.routes.is_empty() {
                captured.push((name.as_str(), segments.join("/")));
                return Some(child);
            }
        }

        None
    }

    fn count(&self) -> usize {
        self.routes.len()
            + self.literals.iter().map(|(_, n)| n.count()).sum::<usize>()
            + self.param.as_ref().map_or(0, |(_, n)| n.count())
            + self.catch_all.as_ref().map_or(0, |(_, n)| n.count())
    }
}

/// A matched route: the endpoint and the parameters captured for it.
pub struct RouteMatch<'r> {
    endpoint: &'r Arc<dyn Endpoint>,
    pattern: &'r str,
    params: Params,
}

impl<'r> RouteMatch<'r> {
    /// The endpoint registered for the route.
    #[must_use]
    pub fn endpoint(&self) -> &'r Arc<dyn Endpoint> {
        self.endpoint
    }

    /// The pattern the route was registered with.
    #[must_use]
    pub fn pattern(&self) -> &'r str {
        self.pattern
    }

    /// Parameters captured from the path.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Takes the captured parameters.
    #[must_use]
    pub fn into_params(self) -> Params {
        self.params
    }
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("endpoint", &self.endpoint.name())
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .finish()
    }
}

/// Result of [`Router::lookup`].
#[derive(Debug)]
pub enum Lookup<'r> {
    /// A route matched both path and method.
    Found(RouteMatch<'r>),
    /// The path matched, but not for this method.
    MethodNotAllowed(Vec<Method>),
    /// No pattern matched the path.
    NotFound,
}

/// HTTP request router keyed by method and path pattern.
#[derive(Default)]
pub struct Router {
    root: Node,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `endpoint` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidRoute`] for malformed patterns or
    /// parameter names that conflict with an existing route, and
    /// [`ServerError::DuplicateRoute`] if the method and pattern are already
    /// registered.
    pub fn add(
        &mut self,
        method: Method,
        pattern: &str,
        endpoint: impl Endpoint,
    ) -> Result<&mut Self, ServerError> {
        self.add_shared(method, pattern, Arc::new(endpoint))
    }

    /// Registers an endpoint that is already shared.
    ///
    /// # Errors
    ///
    /// Same as [`Router::add`].
    pub fn add_shared(
        &mut self,
        method: Method,
        pattern: &str,
        endpoint: Arc<dyn Endpoint>,
    ) -> Result<&mut Self, ServerError> {
        let segments = parse_pattern(pattern)?;
        let node = self.root.insert(&segments, pattern)?;
        if node.routes.iter().any(|r| r.method == method) {
            return Err(ServerError::DuplicateRoute {
                method,
                pattern: pattern.to_string(),
            });
        }

        tracing::debug!(%method, pattern, endpoint = endpoint.name(), "route registered");
        node.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            endpoint,
        });
        Ok(self)
    }

    /// Matches a request path and method.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut captured = Vec::new();
        let Some(node) = self.root.find(&segments, &mut captured) else {
            return Lookup::NotFound;
        };

        match node.routes.iter().find(|r| r.method == *method) {
            Some(route) => Lookup::Found(RouteMatch {
                endpoint: &route.endpoint,
                pattern: &route.pattern,
                params: captured.into_iter().collect(),
            }),
            None => Lookup::MethodNotAllowed(node.routes.iter().map(|r| r.method.clone()).collect()),
        }
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.count()
    }

    /// Whether no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hermes_core::BoxFuture;
    use hermes_extract::InboundRequest;
    use http::Response;

    struct Named(&'static str);

    impl Endpoint for Named {
        fn call(&self, _request: InboundRequest, _params: Params) -> BoxFuture<'_, Response<Bytes>> {
            Box::pin(async { Response::new(Bytes::new()) })
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    fn found<'r>(router: &'r Router, method: &Method, path: &str) -> RouteMatch<'r> {
        match router.lookup(method, path) {
            Lookup::Found(found) => found,
            other => panic!("expected a match for {method} {path}, got {other:?}"),
        }
    }

    #[test]
    fn test_literal_route() {
        let mut router = Router::new();
        router.add(Method::GET, "/health", Named("health")).unwrap();

        let m = found(&router, &Method::GET, "/health");
        assert_eq!(m.endpoint().name(), "health");
        assert!(m.params().is_empty());
        assert!(matches!(router.lookup(&Method::GET, "/other"), Lookup::NotFound));
    }

    #[test]
    fn test_root_route() {
        let mut router = Router::new();
        router.add(Method::GET, "/", Named("root")).unwrap();
        assert_eq!(found(&router, &Method::GET, "/").endpoint().name(), "root");
    }

    #[test]
    fn test_params_in_order() {
        let mut router = Router::new();
        router
            .add(Method::GET, "/users/{user}/posts/{post}", Named("post"))
            .unwrap();

        let m = found(&router, &Method::GET, "/users/7/posts/99");
        let pairs: Vec<_> = m.params().iter().collect();
        assert_eq!(pairs, vec![("user", "7"), ("post", "99")]);
        assert_eq!(m.pattern(), "/users/{user}/posts/{post}");
    }

    #[test]
    fn test_literal_beats_param() {
        let mut router = Router::new();
        router.add(Method::GET, "/users/{id}", Named("by_id")).unwrap();
        router.add(Method::GET, "/users/me", Named("me")).unwrap();

        assert_eq!(found(&router, &Method::GET, "/users/me").endpoint().name(), "me");
        assert_eq!(found(&router, &Method::GET, "/users/42").endpoint().name(), "by_id");
    }

    #[test]
    fn test_backtracks_from_literal_to_param() {
        let mut router = Router::new();
        router.add(Method::GET, "/users/me", Named("me")).unwrap();
        router
            .add(Method::GET, "/users/{id}/posts", Named("posts"))
            .unwrap();

        let m = found(&router, &Method::GET, "/users/me/posts");
        assert_eq!(m.endpoint().name(), "posts");
        assert_eq!(m.params().get("id"), Some("me"));
    }

    #[test]
    fn test_catch_all() {
        let mut router = Router::new();
        router.add(Method::GET, "/files/*path", Named("files")).unwrap();

        let m = found(&router, &Method::GET, "/files/a/b/c.txt");
        assert_eq!(m.params().get("path"), Some("a/b/c.txt"));
        assert!(matches!(router.lookup(&Method::GET, "/files"), Lookup::NotFound));
    }

    #[test]
    fn test_param_does_not_leak_after_backtracking() {
        let mut router = Router::new();
        router.add(Method::GET, "/a/{x}/b", Named("param")).unwrap();
        router.add(Method::GET, "/a/*rest", Named("rest")).unwrap();

        let m = found(&router, &Method::GET, "/a/1/c");
        assert_eq!(m.endpoint().name(), "rest");
        assert_eq!(m.params().len(), 1);
        assert_eq!(m.params().get("rest"), Some("1/c"));
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let mut router = Router::new();
        router.add(Method::POST, "/echo", Named("echo")).unwrap();
        assert_eq!(found(&router, &Method::POST, "/echo/").endpoint().name(), "echo");
    }

    #[test]
    fn test_method_not_allowed() {
        let mut router = Router::new();
        router.add(Method::GET, "/items", Named("list")).unwrap();
        router.add(Method::POST, "/items", Named("create")).unwrap();

        match router.lookup(&Method::DELETE, "/items") {
            Lookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(found(&router, &Method::POST, "/items").endpoint().name(), "create");
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut router = Router::new();
        router.add(Method::GET, "/users/{id}", Named("a")).unwrap();
        let err = router
            .add(Method::GET, "/users/{id}", Named("b"))
            .unwrap_err();
        assert!(matches!(err, ServerError::DuplicateRoute { .. }));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_conflicting_param_names_rejected() {
        let mut router = Router::new();
        router.add(Method::GET, "/users/{id}", Named("a")).unwrap();
        let err = router
            .add(Method::GET, "/users/{user_id}/posts", Named("b"))
            .unwrap_err();
        assert!(err.to_string().contains("conflicts"));
    }

    #[test]
    fn test_invalid_patterns() {
        let mut router = Router::new();
        for pattern in ["users", "/files/*rest/more", "/users/{}", "/users/{id", "/x/*"] {
            let err = router.add(Method::GET, pattern, Named("x")).unwrap_err();
            assert!(
                matches!(err, ServerError::InvalidRoute { .. }),
                "{pattern} should be rejected"
            );
        }
        assert!(router.is_empty());
    }

    #[test]
    fn test_len_counts_every_method() {
        let mut router = Router::new();
        router
            .add(Method::GET, "/a", Named("a"))
            .unwrap()
            .add(Method::POST, "/a", Named("b"))
            .unwrap()
            .add(Method::GET, "/a/{id}", Named("c"))
            .unwrap();
        assert_eq!(router.len(), 3);
    }
}
