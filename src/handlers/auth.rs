use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, AuthSession, SESSION_COOKIE};
use crate::error::{AppError, AppResult};
use crate::models::{Profile, Role};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build()
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<Profile>)> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "a valid email address is required".to_string(),
        ));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    if state.db.get_profile_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "an account with this email already exists".to_string(),
        ));
    }

    let profile = Profile::new(email, req.role, auth::hash_password(&req.password)?);
    state.db.create_profile(&profile).await?;
    info!("created {} account {}", profile.role.as_str(), profile.id);

    // Signing up also signs the new user in.
    let token = auth::create_token(&profile, &state.jwt_secret)?;
    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token)),
        Json(profile),
    ))
}

pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SigninRequest>,
) -> AppResult<(CookieJar, Json<Profile>)> {
    let email = req.email.trim().to_lowercase();

    // One error for both unknown email and bad password.
    let profile = state
        .db
        .get_profile_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Authentication("invalid email or password".to_string()))?;

    if !auth::verify_password(&req.password, &profile.password_hash)? {
        return Err(AppError::Authentication(
            "invalid email or password".to_string(),
        ));
    }

    let token = auth::create_token(&profile, &state.jwt_secret)?;
    Ok((jar.add(session_cookie(token)), Json(profile)))
}

pub async fn signout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/")),
        Json(json!({ "signed_out": true })),
    )
}

pub async fn me(
    State(state): State<AppState>,
    session: AuthSession,
) -> AppResult<Json<Profile>> {
    let profile = state.db.get_profile(&session.user_id).await?;
    Ok(Json(profile))
}
