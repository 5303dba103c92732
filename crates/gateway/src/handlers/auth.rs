//! Admin login, logout and session status

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::{DateTime, Utc};
use folio_common::{
    auth::{build_cookie, clear_cookie, read_cookie, verify_password, CookieOptions},
    errors::{AppError, Result},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    request.validate()?;

    let auth = &state.config.auth;
    let phc = auth.admin_password_hash.as_deref().ok_or_else(|| {
        AppError::ServiceUnavailable { message: "Admin login is not configured".to_string() }
    })?;

    if !verify_password(&request.password, phc)? {
        tracing::warn!("Admin login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let issued = state.sessions.issue(state.owner_id())?;
    let max_age = state.sessions.ttl_secs();

    let session_cookie = build_cookie(
        &auth.session_cookie,
        &issued.token,
        CookieOptions { http_only: true, secure: auth.secure_cookies, max_age_secs: max_age },
    );
    // Readable by the admin UI so it can echo the token in the CSRF header.
    let csrf_cookie = build_cookie(
        &auth.csrf_cookie,
        &issued.csrf_token,
        CookieOptions { http_only: false, secure: auth.secure_cookies, max_age_secs: max_age },
    );

    tracing::info!(expires_at = %issued.expires_at, "Admin session issued");

    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie), (SET_COOKIE, csrf_cookie)]),
        Json(LoginResponse { csrf_token: issued.csrf_token, expires_at: issued.expires_at }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let auth = &state.config.auth;

    (
        AppendHeaders([
            (SET_COOKIE, clear_cookie(&auth.session_cookie, auth.secure_cookies)),
            (SET_COOKIE, clear_cookie(&auth.csrf_cookie, auth.secure_cookies)),
        ]),
        Json(SessionStatus { authenticated: false, expires_at: None }),
    )
}

pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionStatus> {
    let claims = read_cookie(&headers, &state.config.auth.session_cookie)
        .and_then(|token| state.sessions.validate(&token).ok())
        .filter(|claims| claims.owner_id == state.owner_id());

    Json(match claims {
        Some(claims) => SessionStatus { authenticated: true, expires_at: claims.expires_at() },
        None => SessionStatus { authenticated: false, expires_at: None },
    })
}
