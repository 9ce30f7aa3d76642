use std::convert::Infallible;
use std::sync::Arc;

use serde::Deserialize;
use warp::http::StatusCode;
use warp::Filter;

use crate::config::AdminConfig;
use crate::error::SessionError;
use crate::session::SessionServer;

use super::websocket;

#[derive(Debug, Deserialize)]
pub struct AdminLogin {
    pub email: String,
    pub password: String,
}

/// Creates the session WebSocket route
pub fn session_websocket_route(
    server: Arc<SessionServer>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("session")
        .and(warp::ws())
        .and(with_server(server))
        .map(|ws: warp::ws::Ws, server: Arc<SessionServer>| {
            ws.on_upgrade(move |websocket| websocket::handle_session_websocket(websocket, server))
        })
}

pub fn health_check() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("health")
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "Grouper Server",
                "version": "1.0.0"
            }))
        })
}

/// `POST /admin/generate-code`: credential check, then a fresh class code and
/// a clean session
pub fn admin_generate_code(
    server: Arc<SessionServer>,
    admin: Arc<AdminConfig>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("admin" / "generate-code")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server(server))
        .and(with_admin(admin))
        .and_then(handle_generate_code)
}

async fn handle_generate_code(
    login: AdminLogin,
    server: Arc<SessionServer>,
    admin: Arc<AdminConfig>,
) -> Result<impl warp::Reply, Infallible> {
    if !admin.matches(&login.email, &login.password) {
        tracing::warn!(email = %login.email, "Rejected admin generate-code request");
        let body = warp::reply::json(&serde_json::json!({
            "message": SessionError::Unauthorized.to_string()
        }));
        return Ok(warp::reply::with_status(body, StatusCode::UNAUTHORIZED));
    }

    let class_code = server.issue_class_code().await;
    tracing::info!(class_code = %class_code, "Issued new class code");

    let body = warp::reply::json(&serde_json::json!({ "class_code": class_code }));
    Ok(warp::reply::with_status(body, StatusCode::OK))
}

/// `GET /admin/get-class-data`: the current `{class_code, groups}` snapshot
pub fn admin_class_data(
    server: Arc<SessionServer>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("admin" / "get-class-data")
        .and(warp::get())
        .and(with_server(server))
        .and_then(handle_class_data)
}

async fn handle_class_data(server: Arc<SessionServer>) -> Result<impl warp::Reply, Infallible> {
    let snapshot = server.snapshot().await;
    Ok(warp::reply::json(&snapshot))
}

fn with_server(
    server: Arc<SessionServer>,
) -> impl Filter<Extract = (Arc<SessionServer>,), Error = Infallible> + Clone {
    warp::any().map(move || server.clone())
}

fn with_admin(
    admin: Arc<AdminConfig>,
) -> impl Filter<Extract = (Arc<AdminConfig>,), Error = Infallible> + Clone {
    warp::any().map(move || admin.clone())
}
