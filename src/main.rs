mod auth;
mod db;
mod error;
mod handlers;
mod models;
mod results;
mod state;

use axum::http::{HeaderValue, Method, header};
use db::Database;
use log::{error, info};
use state::AppState;
use std::{env, net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Session tokens are useless without a stable signing key, so fail fast.
    let jwt_secret = env::var("SESSION_SECRET").expect("Expected SESSION_SECRET in the environment");

    let database = match Database::new().await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    let app_state = AppState::new(database, jwt_secret);

    // The consumer is a browser app on a single known origin.
    let cors_origin =
        env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());
    let origin = match cors_origin.parse::<HeaderValue>() {
        Ok(value) => value,
        Err(_) => {
            error!("Failed to parse CORS origin: {}", cors_origin);
            return;
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true);

    let app = handlers::router(app_state).layer(cors);

    let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let addr: SocketAddr = match server_addr.parse() {
        Ok(addr) => addr,
        Err(_) => {
            error!("Failed to parse SERVER_ADDR: {}", server_addr);
            return;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return;
        }
    };

    info!("listening on http://{} (origin {})", addr, cors_origin);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
