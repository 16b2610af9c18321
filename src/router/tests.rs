//! Tests for the router: tree behavior, dispatch, negotiation, adapters.

#[cfg(test)]
mod tree_tests {
    use crate::router::error::RouteError;
    use crate::router::node::Node;
    use crate::router::params::{Param, Params};

    fn params(pairs: &[(&str, &str)]) -> Params {
        Params::from(
            pairs
                .iter()
                .map(|(k, v)| Param::new(*k, *v))
                .collect::<Vec<_>>(),
        )
    }

    fn lookup<'t>(root: &'t Node<&'static str>, path: &str) -> (Option<&'t str>, Params, bool) {
        let mut captured = Params::new();
        let (value, tsr) = root.get_value(path, Some(&mut captured));
        (value.copied(), captured, tsr)
    }

    #[test]
    fn test_static_routes() {
        let mut root: Node<&str> = Node::new();
        let routes = [
            "/", "/cmd", "/hi", "/contact", "/co", "/c", "/a", "/ab", "/doc",
            "/doc/go_faq.html", "/doc/go1.html", "/α", "/€",
        ];
        for route in routes {
            root.insert(route, route).unwrap();
        }

        for route in routes {
            let (value, captured, _) = lookup(&root, route);
            assert_eq!(value, Some(route), "lookup({route})");
            assert!(captured.is_empty());
        }

        let (value, _, _) = lookup(&root, "/missing");
        assert_eq!(value, None);
        assert!(root.check_priorities().is_ok());
    }

    #[test]
    fn test_param_capture() {
        let mut root: Node<&str> = Node::new();
        root.insert("/user/:name", "user").unwrap();

        let (value, captured, _) = lookup(&root, "/user/gopher");
        assert_eq!(value, Some("user"));
        assert_eq!(captured, params(&[("name", "gopher")]));
    }

    #[test]
    fn test_multi_param_capture_order() {
        let mut root: Node<&str> = Node::new();
        root.insert("/info/:user/project/:project", "project").unwrap();
        root.insert("/info/:user/public", "public").unwrap();

        let (value, captured, _) = lookup(&root, "/info/gordon/project/go");
        assert_eq!(value, Some("project"));
        assert_eq!(captured, params(&[("user", "gordon"), ("project", "go")]));

        let (value, captured, _) = lookup(&root, "/info/gordon/public");
        assert_eq!(value, Some("public"));
        assert_eq!(captured, params(&[("user", "gordon")]));
        assert!(root.check_priorities().is_ok());
    }

    #[test]
    fn test_catch_all_capture_includes_leading_slash() {
        let mut root: Node<&str> = Node::new();
        root.insert("/src/*filepath", "src").unwrap();

        let (value, captured, _) = lookup(&root, "/src/a/b.txt");
        assert_eq!(value, Some("src"));
        assert_eq!(captured, params(&[("filepath", "/a/b.txt")]));

        let (value, captured, _) = lookup(&root, "/src/");
        assert_eq!(value, Some("src"));
        assert_eq!(captured, params(&[("filepath", "/")]));
    }

    #[test]
    fn test_param_and_catch_all_combined() {
        let mut root: Node<&str> = Node::new();
        root.insert("/files/:dir/*filepath", "files").unwrap();

        let (value, captured, _) = lookup(&root, "/files/js/inc/framework.js");
        assert_eq!(value, Some("files"));
        assert_eq!(
            captured,
            params(&[("dir", "js"), ("filepath", "/inc/framework.js")])
        );
    }

    #[test]
    fn test_static_child_wins_over_param() {
        let mut root: Node<&str> = Node::new();
        root.insert("/user/:id", "param").unwrap();
        root.insert("/user/new", "static").unwrap();

        let (value, _, _) = lookup(&root, "/user/new");
        assert_eq!(value, Some("static"));

        let (value, captured, _) = lookup(&root, "/user/42");
        assert_eq!(value, Some("param"));
        assert_eq!(captured, params(&[("id", "42")]));
    }

    #[test]
    fn test_no_params_captured_without_sink() {
        let mut root: Node<&str> = Node::new();
        root.insert("/user/:name", "user").unwrap();

        let (value, tsr) = root.get_value("/user/gopher", None);
        assert!(value.is_some());
        assert!(!tsr);
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut root: Node<&str> = Node::new();
        root.insert("/user/:name", "first").unwrap();
        let err = root.insert("/user/:name", "second").unwrap_err();
        assert!(matches!(err, RouteError::Duplicate(_)));
    }

    #[test]
    fn test_wildcard_name_conflict_rejected() {
        let mut root: Node<&str> = Node::new();
        root.insert("/cmd/:tool/:sub", "a").unwrap();
        let err = root.insert("/cmd/:badvar/:sub", "b").unwrap_err();
        assert!(matches!(err, RouteError::WildcardConflict(_)));

        let err = root.insert("/cmd/*rest", "c").unwrap_err();
        assert!(matches!(err, RouteError::WildcardConflict(_)));
    }

    #[test]
    fn test_catch_all_conflicts_with_segment_root() {
        let mut root: Node<&str> = Node::new();
        root.insert("/src/x", "static").unwrap();
        let err = root.insert("/src/*filepath", "all").unwrap_err();
        assert!(matches!(err, RouteError::WildcardConflict(_)));

        let mut root: Node<&str> = Node::new();
        root.insert("/src/*filepath", "all").unwrap();
        let err = root.insert("/src/x", "static").unwrap_err();
        assert!(matches!(err, RouteError::WildcardConflict(_)));
    }

    #[test]
    fn test_shared_lead_byte_routes_rejected() {
        // sibling dispatch is by first byte; two multi-byte segments sharing
        // a lead byte cannot coexist and are rejected at registration
        let mut root: Node<&str> = Node::new();
        root.insert("/α", "alpha").unwrap();
        let err = root.insert("/β", "beta").unwrap_err();
        assert!(matches!(err, RouteError::WildcardConflict(_)));
    }

    #[test]
    fn test_malformed_wildcards_rejected() {
        let cases = [
            "/user_:name",      // wildcard not behind a slash
            "/user/:",          // unnamed parameter
            "/src/*",           // unnamed catch-all
            "/src/*rest/more",  // catch-all not terminal
            "/user/:id:extra",  // two wildcards in one segment
            "/user/:id*rest",   // two wildcards in one segment
        ];
        for case in cases {
            let mut root: Node<&str> = Node::new();
            let err = root.insert(case, "x").unwrap_err();
            assert!(
                matches!(err, RouteError::MalformedWildcard(_)),
                "expected MalformedWildcard for {case}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_trailing_slash_recommendations() {
        let mut root: Node<&str> = Node::new();
        for route in [
            "/hi", "/b/", "/search/:query", "/cmd/:tool/", "/src/*filepath", "/x", "/x/y",
            "/y/", "/y/z", "/0/:id", "/0/:id/1", "/1/:id/", "/1/:id/2", "/aa", "/a/", "/doc",
            "/doc/go_faq.html", "/doc/go1.html", "/no/a", "/no/b", "/api/hello/:name",
        ] {
            root.insert(route, route).unwrap();
        }

        let tsr_routes = [
            "/hi/", "/b", "/search/gopher/", "/cmd/vet", "/src", "/x/", "/y", "/0/go/",
            "/1/go", "/a", "/doc/",
        ];
        for route in tsr_routes {
            let (value, _, tsr) = lookup(&root, route);
            assert_eq!(value, None, "unexpected match for {route}");
            assert!(tsr, "expected TSR recommendation for {route}");
        }

        let no_tsr_routes = ["/", "/no", "/no/", "/_", "/_/", "/api/world/abc"];
        for route in no_tsr_routes {
            let (value, _, tsr) = lookup(&root, route);
            assert_eq!(value, None, "unexpected match for {route}");
            assert!(!tsr, "unexpected TSR recommendation for {route}");
        }
    }

    #[test]
    fn test_root_trailing_slash_recommendation() {
        let mut root: Node<&str> = Node::new();
        root.insert("/", "root").unwrap();

        // the empty path is one slash short of the root route
        let (value, _, tsr) = lookup(&root, "");
        assert_eq!(value, None);
        assert!(tsr);
    }

    #[test]
    fn test_priority_orders_siblings() {
        let mut root: Node<&str> = Node::new();
        root.insert("/aa", "aa").unwrap();
        root.insert("/ab", "ab").unwrap();
        root.insert("/ab/x", "abx").unwrap();
        root.insert("/ab/y", "aby").unwrap();

        // three routes pass through "b...", one through "a"
        assert_eq!(root.prefix, "/a");
        assert_eq!(root.children[0].prefix, "b");
        assert_eq!(root.indices, vec![b'b', b'a']);
        assert!(root.check_priorities().is_ok());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut root: Node<&str> = Node::new();
        for route in [
            "/hi", "/b/", "/ABC/", "/search/:query", "/cmd/:tool/", "/src/*filepath",
            "/x", "/x/y", "/y/", "/y/z", "/doc", "/doc/go_faq.html", "/café",
        ] {
            root.insert(route, route).unwrap();
        }

        // exact-case recovery, no trailing slash involved
        for (input, want) in [
            ("/HI", "/hi"),
            ("/abc/", "/ABC/"),
            ("/DOC/GO_FAQ.HTML", "/doc/go_faq.html"),
            ("/CAFÉ", "/café"),
        ] {
            let fixed = root.find_case_insensitive_path(input, false);
            assert_eq!(fixed.as_deref(), Some(want), "find({input})");
        }

        // the request's casing is preserved inside captured segments
        let fixed = root.find_case_insensitive_path("/SEARCH/QueryString", false);
        assert_eq!(fixed.as_deref(), Some("/search/QueryString"));

        let fixed = root.find_case_insensitive_path("/SRC/some/File.txt", false);
        assert_eq!(fixed.as_deref(), Some("/src/some/File.txt"));

        // trailing-slash fixes only with permission
        assert_eq!(root.find_case_insensitive_path("/HI/", false), None);
        assert_eq!(
            root.find_case_insensitive_path("/HI/", true).as_deref(),
            Some("/hi")
        );
        assert_eq!(root.find_case_insensitive_path("/B", false), None);
        assert_eq!(
            root.find_case_insensitive_path("/B", true).as_deref(),
            Some("/b/")
        );

        // no recovery for unknown paths
        assert_eq!(root.find_case_insensitive_path("/NOPE", true), None);
    }

    #[test]
    fn test_collect_paths() {
        let routes = [
            "/",
            "/cmd/:tool/",
            "/cmd/:tool/:sub",
            "/doc/",
            "/doc/go1.html",
            "/doc/go_faq.html",
            "/files/:dir/*filepath",
            "/info/:user/project/:project",
            "/info/:user/public",
            "/search/",
            "/search/:query",
            "/src/*filepath",
        ];
        let mut root: Node<&str> = Node::new();
        for route in routes {
            root.insert(route, route).unwrap();
        }

        let mut collected = Vec::new();
        root.collect_paths("", &mut collected);
        collected.sort_unstable();

        let mut expected: Vec<String> = routes.iter().map(|r| r.to_string()).collect();
        expected.sort_unstable();
        assert_eq!(collected, expected);
    }
}

#[cfg(test)]
mod router_tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::parser::{HttpRequest, HttpVersion, Method};
    use crate::router::error::RouteError;
    use crate::router::handler::{plain_handler, with_params};
    use crate::router::params::{Param, Params};
    use crate::router::Router;
    use crate::server::{Error, HttpResponse, StatusCode};

    fn request(method: Method, path: &str) -> HttpRequest {
        let mut headers = HashMap::new();
        headers.insert("Host".to_string(), "localhost".to_string());
        HttpRequest::new(method, path.to_string(), HttpVersion::Http11, headers)
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        Params::from(
            pairs
                .iter()
                .map(|(k, v)| Param::new(*k, *v))
                .collect::<Vec<_>>(),
        )
    }

    fn ok() -> Result<HttpResponse, Error> {
        Ok(HttpResponse::new(StatusCode::Ok))
    }

    /// Register a handler that records the parameters it was invoked with.
    fn capture(router: &mut Router, method: Method, path: &str) -> Arc<Mutex<Option<Params>>> {
        let captured = Arc::new(Mutex::new(None));
        let cap = captured.clone();
        let handler = crate::router::route_handler(move |_req, params| {
            let cap = cap.clone();
            async move {
                *cap.lock().unwrap() = Some(params);
                ok()
            }
        });
        router.handle(method, path, handler).unwrap();
        captured
    }

    #[tokio::test]
    async fn test_param_route_dispatch() {
        let mut router = Router::new();
        let captured = capture(&mut router, Method::GET, "/user/:name");

        let response = router.dispatch(request(Method::GET, "/user/gopher")).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            captured.lock().unwrap().take(),
            Some(params(&[("name", "gopher")]))
        );
    }

    #[tokio::test]
    async fn test_catch_all_route_dispatch() {
        let mut router = Router::new();
        let captured = capture(&mut router, Method::GET, "/src/*filepath");

        let response = router.dispatch(request(Method::GET, "/src/a/b.txt")).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            captured.lock().unwrap().take(),
            Some(params(&[("filepath", "/a/b.txt")]))
        );
    }

    #[tokio::test]
    async fn test_registration_errors() {
        let mut router = Router::new();

        let err = router
            .get("noSlashRoot", |_req, _params| async { ok() })
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidPath(_)));

        router.get("/path", |_req, _params| async { ok() }).unwrap();
        let err = router
            .get("/path", |_req, _params| async { ok() })
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let mut router = Router::new();
        router.post("/path", |_req, _params| async { ok() }).unwrap();

        let response = router.dispatch(request(Method::GET, "/path")).await;
        assert_eq!(response.status, StatusCode::MethodNotAllowed);
        assert_eq!(
            response.get_header("Allow").map(String::as_str),
            Some("OPTIONS, POST")
        );

        // another method widens the Allow set
        router
            .delete("/path", |_req, _params| async { ok() })
            .unwrap();
        router
            .options("/path", |_req, _params| async { ok() })
            .unwrap(); // must be ignored in Allow

        let response = router.dispatch(request(Method::GET, "/path")).await;
        assert_eq!(response.status, StatusCode::MethodNotAllowed);
        assert_eq!(
            response.get_header("Allow").map(String::as_str),
            Some("DELETE, OPTIONS, POST")
        );
    }

    #[tokio::test]
    async fn test_method_not_allowed_custom_handler() {
        let mut router = Router::new();
        router.post("/path", |_req, _params| async { ok() }).unwrap();
        router.method_not_allowed = Some(plain_handler(|_req| async {
            Ok(HttpResponse::new(StatusCode::ServiceUnavailable)
                .with_body_string("custom method"))
        }));

        let response = router.dispatch(request(Method::GET, "/path")).await;
        assert_eq!(response.status, StatusCode::ServiceUnavailable);
        assert_eq!(response.body, b"custom method");
        assert_eq!(
            response.get_header("Allow").map(String::as_str),
            Some("OPTIONS, POST")
        );
    }

    #[tokio::test]
    async fn test_not_found_and_redirects() {
        let mut router = Router::new();
        for route in ["/path", "/dir/", "/"] {
            router.get(route, |_req, _params| async { ok() }).unwrap();
        }

        let cases = [
            ("/path/", Some("/path")),   // TSR -/
            ("/dir", Some("/dir/")),     // TSR +/
            ("", Some("/")),             // TSR +/
            ("/PATH", Some("/path")),    // fixed case
            ("/DIR/", Some("/dir/")),    // fixed case
            ("/PATH/", Some("/path")),   // fixed case -/
            ("/DIR", Some("/dir/")),     // fixed case +/
            ("/../path", Some("/path")), // cleaned path
            ("/nope", None),             // not found
        ];
        for (path, location) in cases {
            let response = router.dispatch(request(Method::GET, path)).await;
            match location {
                Some(location) => {
                    assert_eq!(
                        response.status,
                        StatusCode::MovedPermanently,
                        "GET {path}"
                    );
                    assert_eq!(
                        response.get_header("Location").map(String::as_str),
                        Some(location),
                        "GET {path}"
                    );
                }
                None => assert_eq!(response.status, StatusCode::NotFound, "GET {path}"),
            }
        }

        // non-GET redirects use 308 so the method is preserved
        router.patch("/path", |_req, _params| async { ok() }).unwrap();
        let response = router.dispatch(request(Method::PATCH, "/path/")).await;
        assert_eq!(response.status, StatusCode::PermanentRedirect);
        assert_eq!(
            response.get_header("Location").map(String::as_str),
            Some("/path")
        );

        // the query string survives a redirect
        let response = router.dispatch(request(Method::GET, "/dir?x=1")).await;
        assert_eq!(
            response.get_header("Location").map(String::as_str),
            Some("/dir/?x=1")
        );

        // a custom not-found handler takes over
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();
        router.not_found = Some(plain_handler(move |_req| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(HttpResponse::new(StatusCode::NotFound))
            }
        }));
        let response = router.dispatch(request(Method::GET, "/nope")).await;
        assert_eq!(response.status, StatusCode::NotFound);
        assert!(invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_root_is_never_redirected() {
        let mut router = Router::new();
        router.get("/a", |_req, _params| async { ok() }).unwrap();

        let response = router.dispatch(request(Method::GET, "/")).await;
        assert_eq!(response.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_connect_is_never_redirected() {
        let mut router = Router::new();
        router
            .handle(
                Method::CONNECT,
                "/path",
                crate::router::route_handler(|_req, _params| async { ok() }),
            )
            .unwrap();

        let response = router.dispatch(request(Method::CONNECT, "/path/")).await;
        assert_eq!(response.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_automatic_options() {
        let mut router = Router::new();
        router.post("/path", |_req, _params| async { ok() }).unwrap();

        // server-wide
        let response = router.dispatch(request(Method::OPTIONS, "*")).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            response.get_header("Allow").map(String::as_str),
            Some("OPTIONS, POST")
        );

        // specific path
        let response = router.dispatch(request(Method::OPTIONS, "/path")).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            response.get_header("Allow").map(String::as_str),
            Some("OPTIONS, POST")
        );

        // no routes below the path at all
        let response = router
            .dispatch(request(Method::OPTIONS, "/doesnotexist"))
            .await;
        assert_eq!(response.status, StatusCode::NotFound);

        // a second method shows up in the set
        router.get("/path", |_req, _params| async { ok() }).unwrap();
        let response = router.dispatch(request(Method::OPTIONS, "*")).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            response.get_header("Allow").map(String::as_str),
            Some("GET, OPTIONS, POST")
        );
    }

    #[tokio::test]
    async fn test_registered_options_route_takes_priority() {
        let mut router = Router::new();
        router.post("/path", |_req, _params| async { ok() }).unwrap();

        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();
        router
            .options("/path", move |_req, _params| {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(HttpResponse::new(StatusCode::NoContent))
                }
            })
            .unwrap();

        // the custom handler answers its own path
        let response = router.dispatch(request(Method::OPTIONS, "/path")).await;
        assert_eq!(response.status, StatusCode::NoContent);
        assert!(invoked.load(Ordering::SeqCst));

        // but not the server-wide target
        invoked.store(false, Ordering::SeqCst);
        let response = router.dispatch(request(Method::OPTIONS, "*")).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_global_options_handler() {
        let mut router = Router::new();
        router.post("/path", |_req, _params| async { ok() }).unwrap();
        router.global_options = Some(plain_handler(|_req| async {
            Ok(HttpResponse::new(StatusCode::NoContent))
        }));

        let response = router.dispatch(request(Method::OPTIONS, "/path")).await;
        assert_eq!(response.status, StatusCode::NoContent);
        assert_eq!(
            response.get_header("Allow").map(String::as_str),
            Some("OPTIONS, POST")
        );
    }

    #[tokio::test]
    async fn test_implicit_head_falls_back_to_get() {
        let mut router = Router::new();
        let captured = capture(&mut router, Method::GET, "/resource/:id");

        let response = router.dispatch(request(Method::HEAD, "/resource/7")).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(captured.lock().unwrap().take(), Some(params(&[("id", "7")])));
    }

    #[tokio::test]
    async fn test_explicit_head_wins_over_get() {
        let mut router = Router::new();
        router.get("/x", |_req, _params| async { ok() }).unwrap();
        router
            .head("/x", |_req, _params| async {
                Ok(HttpResponse::new(StatusCode::NoContent))
            })
            .unwrap();

        let response = router.dispatch(request(Method::HEAD, "/x")).await;
        assert_eq!(response.status, StatusCode::NoContent);
    }

    #[tokio::test]
    async fn test_handle_all() {
        let mut router = Router::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        router
            .handle_all(
                "/",
                crate::router::route_handler(move |req: HttpRequest, _params| {
                    let log = log.clone();
                    async move {
                        log.lock().unwrap().push(req.method);
                        ok()
                    }
                }),
                &[],
            )
            .unwrap();

        for method in Method::ALL {
            let response = router.dispatch(request(method, "/")).await;
            assert_eq!(response.status, StatusCode::Ok, "{method}");
        }
        assert_eq!(seen.lock().unwrap().len(), Method::ALL.len());
    }

    #[tokio::test]
    async fn test_router_chaining_via_not_found() {
        let mut router2 = Router::new();
        router2.post("/bar", |_req, _params| async { ok() }).unwrap();

        let mut router1 = Router::new();
        router1.post("/foo", |_req, _params| async { ok() }).unwrap();
        router1.not_found = Some(Arc::new(router2).into_handler());

        let response = router1.dispatch(request(Method::POST, "/foo")).await;
        assert_eq!(response.status, StatusCode::Ok);

        let response = router1.dispatch(request(Method::POST, "/bar")).await;
        assert_eq!(response.status, StatusCode::Ok);

        let response = router1.dispatch(request(Method::POST, "/qax")).await;
        assert_eq!(response.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_handler_error_recovery() {
        let mut router = Router::new();
        router
            .put("/user/:name", |_req, _params| async {
                Err(Error::InternalError("oops!".to_string()))
            })
            .unwrap();

        // without a recovery handler a plain 500 is synthesized
        let response = router.dispatch(request(Method::PUT, "/user/gopher")).await;
        assert_eq!(response.status, StatusCode::InternalServerError);

        // a recovery handler sees the error and answers instead
        let recovered = Arc::new(AtomicBool::new(false));
        let flag = recovered.clone();
        router.error_handler = Some(crate::router::error_handler(move |_req, _err| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                HttpResponse::new(StatusCode::ServiceUnavailable)
            }
        }));

        let response = router.dispatch(request(Method::PUT, "/user/gopher")).await;
        assert_eq!(response.status, StatusCode::ServiceUnavailable);
        assert!(recovered.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_lookup() {
        let mut router = Router::new();

        // empty router first
        let (handler, _, tsr) = router.lookup(Method::GET, "/nope");
        assert!(handler.is_none());
        assert!(!tsr);

        let captured = capture(&mut router, Method::GET, "/user/:name");

        let (handler, found_params, tsr) = router.lookup(Method::GET, "/user/gopher");
        assert!(!tsr);
        assert_eq!(found_params, params(&[("name", "gopher")]));
        let handler = handler.expect("no handler found");
        let response = handler(request(Method::GET, "/user/gopher"), found_params)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert!(captured.lock().unwrap().is_some());

        let (handler, _, tsr) = router.lookup(Method::GET, "/user/gopher/");
        assert!(handler.is_none());
        assert!(tsr);

        let (handler, _, tsr) = router.lookup(Method::GET, "/nope");
        assert!(handler.is_none());
        assert!(!tsr);
    }

    #[tokio::test]
    async fn test_list_paths() {
        let routes = [
            "/",
            "/cmd/:tool/",
            "/cmd/:tool/:sub",
            "/doc/",
            "/doc/go1.html",
            "/doc/go_faq.html",
            "/files/:dir/*filepath",
            "/info/:user/project/:project",
            "/info/:user/public",
            "/search/",
            "/search/:query",
            "/src/*filepath",
        ];

        let mut router = Router::new();
        for method in Method::ALL {
            for route in routes {
                router
                    .handle(
                        method,
                        route,
                        crate::router::route_handler(|_req, _params| async { ok() }),
                    )
                    .unwrap();
            }
        }

        let all = router.list_paths(None);
        assert_eq!(all.len(), Method::ALL.len());

        let mut expected: Vec<String> = routes.iter().map(|r| r.to_string()).collect();
        expected.sort_unstable();
        for method in Method::ALL {
            assert_eq!(all.get(&method), Some(&expected), "{method}");
        }

        let only_get = router.list_paths(Some(Method::GET));
        assert_eq!(only_get.len(), 1);
        assert_eq!(only_get.get(&Method::GET), Some(&expected));
    }

    #[tokio::test]
    async fn test_save_matched_route_path() {
        let mut router = Router::new();
        router.save_matched_route_path = true;
        let captured = capture(&mut router, Method::GET, "/user/:name");

        router.dispatch(request(Method::GET, "/user/gopher")).await;
        let captured = captured.lock().unwrap().take().expect("not routed");
        assert_eq!(captured.matched_route_path(), Some("/user/:name"));
        assert_eq!(captured.by_name("name"), Some("gopher"));
    }

    #[tokio::test]
    async fn test_sub_router_nesting_keeps_param_order() {
        let mut inner = Router::new();
        let captured = capture(&mut inner, Method::GET, "/user/:name");

        let mut outer = Router::new();
        outer
            .sub_router("/top/:top/*", Arc::new(inner).into_handler(), &[])
            .unwrap();

        let response = outer
            .dispatch(request(Method::GET, "/top/rank/user/gopher"))
            .await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            captured.lock().unwrap().take(),
            Some(params(&[
                ("top", "rank"),
                ("filepath", "/user/gopher"),
                ("name", "gopher"),
            ]))
        );
    }

    #[tokio::test]
    async fn test_sub_router_rejects_bad_patterns() {
        for path in ["/noFilepath", "/foo*/"] {
            let mut router = Router::new();
            let err = router
                .sub_router(path, plain_handler(|_req| async { ok() }), &[])
                .unwrap_err();
            assert!(matches!(err, RouteError::MalformedWildcard(_)), "{path}");
        }
    }

    #[tokio::test]
    async fn test_with_params_stores_params_on_request() {
        let seen = Arc::new(Mutex::new(None));
        let log = seen.clone();
        let handler = with_params(plain_handler(move |req: HttpRequest| {
            let log = log.clone();
            async move {
                *log.lock().unwrap() = Some(req.params.clone());
                ok()
            }
        }));

        let mut router = Router::new();
        router.handle(Method::GET, "/user/:name", handler).unwrap();
        router.dispatch(request(Method::GET, "/user/gopher")).await;

        assert_eq!(
            seen.lock().unwrap().take(),
            Some(params(&[("name", "gopher")]))
        );
    }

    #[tokio::test]
    async fn test_strip_leading_segments() {
        use crate::router::strip_leading_segments;

        let cases = [
            ("/a/123/z", 0, "/a/123/z"),
            ("/a/123/z", 1, "/123/z"),
            ("/a/123/z", 2, "/z"),
            ("/a/123/z", 3, ""),
        ];
        for (path, count, want) in cases {
            let seen = Arc::new(Mutex::new(None));
            let log = seen.clone();
            let handler = strip_leading_segments(
                count,
                plain_handler(move |req: HttpRequest| {
                    let log = log.clone();
                    async move {
                        *log.lock().unwrap() = Some(req.path.clone());
                        ok()
                    }
                }),
            );

            handler(request(Method::GET, path)).await.unwrap();
            assert_eq!(
                seen.lock().unwrap().take().as_deref(),
                Some(want),
                "strip {count} of {path}"
            );
        }
    }

    #[tokio::test]
    async fn test_serve_files() {
        let dir = std::env::temp_dir().join(format!("microroute-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("hello.txt"), b"hello from disk").unwrap();

        let mut router = Router::new();
        router.serve_files("/static/*filepath", &dir).unwrap();

        let response = router
            .dispatch(request(Method::GET, "/static/hello.txt"))
            .await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body, b"hello from disk");
        assert_eq!(
            response.get_header("Content-Type").map(String::as_str),
            Some("text/plain")
        );

        // HEAD answers without a body but with the length
        let response = router
            .dispatch(request(Method::HEAD, "/static/hello.txt"))
            .await;
        assert_eq!(response.status, StatusCode::Ok);
        assert!(response.body.is_empty());
        assert_eq!(
            response.get_header("Content-Length").map(String::as_str),
            Some("15")
        );

        // unsupported methods negotiate to 405
        let response = router
            .dispatch(request(Method::PUT, "/static/hello.txt"))
            .await;
        assert_eq!(response.status, StatusCode::MethodNotAllowed);

        // missing files answer 404
        let response = router
            .dispatch(request(Method::GET, "/static/missing.txt"))
            .await;
        assert_eq!(response.status, StatusCode::NotFound);

        // path traversal is neutralized by canonicalization
        let response = router
            .dispatch(request(Method::GET, "/static/../../hello.txt"))
            .await;
        assert_ne!(response.status, StatusCode::InternalServerError);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_options_only_router_has_empty_global_allow() {
        let mut router = Router::new();
        router
            .options("/path", |_req, _params| async { ok() })
            .unwrap();

        // nothing but OPTIONS is registered, so the server-wide set is empty
        let response = router.dispatch(request(Method::OPTIONS, "*")).await;
        assert_eq!(response.status, StatusCode::NotFound);
    }
}
