//! Serving a directory of files through the catch-all file adapter.

use microroute_rs::{HttpResponse, HttpServer, Router, ServerConfig, StatusCode};
use log::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut router = Router::new();

    router.get("/", |_req, _params| async {
        Ok(HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/html")
            .with_body_string("<html><body><a href=\"/files/\">Browse files</a></body></html>"))
    })?;

    // GET and HEAD under /files/** are answered from ./public
    router.serve_files("/files/*filepath", "./public")?;

    let config = ServerConfig {
        addr: "127.0.0.1:8084".parse()?,
        ..ServerConfig::default()
    };

    info!("Serving ./public on http://{}/files/", config.addr);
    let server = HttpServer::new(config, router);
    server.start().await?;

    Ok(())
}
