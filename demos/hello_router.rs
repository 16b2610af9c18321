//! An HTTP server example demonstrating the microroute-rs routing API.

use microroute_rs::{
    HttpResponse, HttpServer, Method, Router, ServerConfig, StatusCode,
};
use serde::{Deserialize, Serialize};
use log::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    let mut router = Router::new();

    // 1. Simple GET route
    router.get("/", |_req, _params| async {
        Ok(HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/html")
            .with_body_string("<html><body><h1>Welcome to microroute-rs!</h1></body></html>"))
    })?;

    // 2. Route with a path parameter
    router.get("/hello/:name", |_req, params| async move {
        let name = params.by_name("name").unwrap_or("World").to_string();

        Ok(HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/plain")
            .with_body_string(format!("Hello, {name}!")))
    })?;

    // 3. Catch-all route capturing the rest of the path
    router.get("/echo/*rest", |_req, params| async move {
        let rest = params.by_name("rest").unwrap_or("/").to_string();

        Ok(HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/plain")
            .with_body_string(rest))
    })?;

    // Define data structures for JSON
    #[derive(Debug, Serialize, Deserialize)]
    struct Message {
        message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct User {
        name: String,
        email: String,
    }

    // 4. Route that handles multiple HTTP methods with JSON
    router.get("/api/data", |_req, _params| async {
        let data = Message {
            message: "This is GET data".to_string(),
        };
        HttpResponse::new(StatusCode::Ok).with_json(&data)
    })?;

    router.post("/api/data", |_req, _params| async {
        let data = Message {
            message: "Data created successfully".to_string(),
        };
        HttpResponse::new(StatusCode::Created).with_json(&data)
    })?;

    // 5. Route that demonstrates JSON request parsing
    router.post("/api/users", |req, _params| async move {
        if !req.is_json() {
            return Ok(HttpResponse::new(StatusCode::BadRequest)
                .with_content_type("text/plain")
                .with_body_string("Content-Type must be application/json"));
        }

        match req.json::<User>() {
            Ok(user) => {
                let response = Message {
                    message: format!("User {} created successfully", user.name),
                };
                HttpResponse::new(StatusCode::Created).with_json(&response)
            }
            Err(e) => Ok(HttpResponse::new(StatusCode::BadRequest)
                .with_content_type("text/plain")
                .with_body_string(format!("Invalid JSON: {e}"))),
        }
    })?;

    // 6. Same handler under every canonical method
    router.handle_all(
        "/any",
        microroute_rs::route_handler(|req, _params| async move {
            Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_body_string(format!("You used {}", req.method)))
        }),
        &[Method::GET, Method::POST, Method::DELETE],
    )?;

    info!("Starting server on http://127.0.0.1:8083");
    info!("Try: curl -i http://127.0.0.1:8083/hello/gopher");
    info!("Try: curl -i http://127.0.0.1:8083/Hello/gopher   (301 to the canonical path)");
    info!("Try: curl -i -X PUT http://127.0.0.1:8083/api/data (405 with Allow header)");

    let config = ServerConfig {
        addr: "127.0.0.1:8083".parse()?,
        max_connections: 1024,
        read_buffer_size: 8192,
    };

    let server = HttpServer::new(config, router);
    server.start().await?;

    Ok(())
}
