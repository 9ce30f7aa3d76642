mod api;
mod config;
mod error;
mod session;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use warp::Filter;

use config::Config;
use session::SessionServer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let server = SessionServer::new();
    let admin = Arc::new(config.admin.clone());

    let cors = warp::cors()
        .allow_origin(config.server.allowed_origin.as_str())
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    let routes = api::routes::session_websocket_route(server.clone())
        .or(api::routes::admin_generate_code(server.clone(), admin))
        .or(api::routes::admin_class_data(server))
        .or(api::routes::health_check())
        .with(cors);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Grouper server listening"
    );

    warp::serve(routes).run(config.bind_address()).await;
}
