pub mod auth;
pub mod poll;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::json;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/signin", post(auth::signin))
        .route("/api/auth/signout", post(auth::signout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/polls", post(poll::create_poll).get(poll::list_polls))
        .route("/api/polls/{poll_id}", get(poll::get_poll))
        .route("/api/polls/{poll_id}/vote", post(poll::cast_vote))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
