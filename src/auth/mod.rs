use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{Profile, Role};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "token";
const SESSION_HOURS: i64 = 24;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("stored hash is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

pub fn create_token(profile: &Profile, secret: &str) -> AppResult<String> {
    let expiration = Utc::now() + Duration::hours(SESSION_HOURS);

    let claims = Claims {
        sub: profile.id.clone(),
        email: profile.email.clone(),
        role: profile.role,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign session token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// The caller's identity for one request, decoded from the session cookie.
/// Passed explicitly into handlers rather than held as ambient state.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthSession {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Capability check for admin-only operations.
pub fn require_admin(session: &AuthSession) -> AppResult<()> {
    if session.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "administrator access required".to_string(),
        ))
    }
}

fn session_token(cookie_header: Option<&str>) -> Option<String> {
    let header = cookie_header?;
    for cookie in header.split(';') {
        if let Some(value) = cookie.trim().strip_prefix("token=") {
            return Some(value.to_string());
        }
    }
    None
}

fn session_from_parts(parts: &Parts, state: &AppState) -> AppResult<AuthSession> {
    let cookie_header = parts
        .headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());

    let token = session_token(cookie_header)
        .ok_or_else(|| AppError::Authentication("not signed in".to_string()))?;

    let claims = verify_token(&token, &state.jwt_secret)?;
    Ok(AuthSession::from(claims))
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        session_from_parts(parts, state)
    }
}

/// Routes that merely personalize their response accept `Option<AuthSession>`;
/// a missing or stale cookie reads as anonymous instead of rejecting.
impl OptionalFromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Option<Self>> {
        Ok(session_from_parts(parts, state).ok())
    }
}
