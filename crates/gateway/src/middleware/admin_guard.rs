//! Admin guard
//!
//! Every `/api/admin` request needs a valid session cookie for the site
//! owner. Mutating requests must also echo the CSRF cookie in the CSRF
//! header.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use folio_common::{
    auth::{read_cookie, verify_csrf, AdminSession},
    errors::AppError,
};

use crate::AppState;

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = &state.config.auth;
    let headers = request.headers();

    let token = read_cookie(headers, &auth.session_cookie).ok_or_else(|| {
        AppError::Unauthorized { message: "Missing session".to_string() }
    })?;

    let claims = state.sessions.validate(&token)?;

    if claims.owner_id != state.owner_id() {
        tracing::warn!(owner_id = %claims.owner_id, "Session issued for another owner");
        return Err(AppError::Unauthorized { message: "Invalid session".to_string() });
    }

    if is_mutating(request.method()) {
        let header_token = headers
            .get(auth.csrf_header.as_str())
            .and_then(|v| v.to_str().ok());
        let cookie_token = read_cookie(headers, &auth.csrf_cookie);

        verify_csrf(header_token, cookie_token.as_deref(), &claims).inspect_err(|_| {
            tracing::warn!(method = %request.method(), uri = %request.uri(), "CSRF check failed");
        })?;
    }

    request.extensions_mut().insert(AdminSession::from(&claims));
    Ok(next.run(request).await)
}
