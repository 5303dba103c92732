//! Admin authentication
//!
//! Provides:
//! - Password verification against an argon2 PHC hash
//! - Signed session tokens (HS256) carried in the `session` cookie
//! - Double-submit CSRF tokens bound to the session
//! - Cookie parsing and `Set-Cookie` rendering

use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Subject stored in every admin session
pub const ADMIN_SUBJECT: &str = "admin";

/// Session claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (always `admin`)
    pub sub: String,

    /// Owner the session may administer
    pub owner_id: Uuid,

    /// sha256 of the CSRF token issued with this session
    pub csrf: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl SessionClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates session tokens
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl SessionManager {
    /// Create a new session manager with the given secret
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: ttl_secs as i64,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a session and its CSRF token
    pub fn issue(&self, owner_id: Uuid) -> Result<IssuedSession> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_secs);
        let csrf_token = generate_csrf_token();

        let claims = SessionClaims {
            sub: ADMIN_SUBJECT.to_string(),
            owner_id,
            csrf: hash_token(&csrf_token),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal {
                message: format!("Failed to sign session: {}", e)
            })?;

        Ok(IssuedSession { token, csrf_token, expires_at })
    }

    /// Validate signature and expiry of a session token
    pub fn validate(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::ExpiredSession
                    }
                    _ => AppError::Unauthorized {
                        message: "Invalid session".to_string(),
                    },
                }
            })?;

        if claims.sub != ADMIN_SUBJECT {
            return Err(AppError::Unauthorized {
                message: "Invalid session subject".to_string(),
            });
        }

        Ok(claims)
    }
}

/// Validated admin session, inserted into request extensions by the admin guard
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub owner_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&SessionClaims> for AdminSession {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            owner_id: claims.owner_id,
            expires_at: claims.expires_at(),
        }
    }
}

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AdminSession>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized {
                message: "Admin session required".to_string(),
            })
    }
}

/// Check the double-submit CSRF token against the cookie and the session claim
pub fn verify_csrf(
    header_token: Option<&str>,
    cookie_token: Option<&str>,
    claims: &SessionClaims,
) -> Result<()> {
    let (Some(header_token), Some(cookie_token)) = (header_token, cookie_token) else {
        return Err(AppError::CsrfMismatch);
    };

    if header_token.is_empty() || !constant_time_eq(header_token, cookie_token) {
        return Err(AppError::CsrfMismatch);
    }

    if !constant_time_eq(&hash_token(header_token), &claims.csrf) {
        return Err(AppError::CsrfMismatch);
    }

    Ok(())
}

/// Generate a random CSRF token
pub fn generate_csrf_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

/// Hash a token for embedding in claims
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a password against an argon2 PHC string
pub fn verify_password(password: &str, phc_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(phc_hash).map_err(|e| AppError::Configuration {
        message: format!("Invalid admin password hash: {}", e),
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Produce an argon2 PHC string for a password
pub fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::Internal {
        message: format!("Failed to encode salt: {}", e),
    })?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Read a cookie value from the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Cookie attributes
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub max_age_secs: i64,
}

/// Render a `Set-Cookie` header value
pub fn build_cookie(name: &str, value: &str, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; SameSite=Lax; Max-Age={}",
        name, value, options.max_age_secs
    );

    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }

    cookie
}

/// Render a `Set-Cookie` header value that removes the cookie
pub fn clear_cookie(name: &str, secure: bool) -> String {
    build_cookie(
        name,
        "",
        CookieOptions { http_only: true, secure, max_age_secs: 0 },
    )
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn manager() -> SessionManager {
        SessionManager::new("test_secret", 3600)
    }

    #[test]
    fn test_session_roundtrip() {
        let manager = manager();
        let owner = Uuid::new_v4();

        let issued = manager.issue(owner).unwrap();
        let claims = manager.validate(&issued.token).unwrap();

        assert_eq!(claims.owner_id, owner);
        assert_eq!(claims.csrf, hash_token(&issued.csrf_token));
        assert_eq!(claims.expires_at().unwrap().timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn test_tampered_session_rejected() {
        let manager = manager();
        let issued = manager.issue(Uuid::new_v4()).unwrap();

        let mut parts: Vec<String> = issued.token.split('.').map(String::from).collect();
        let forged = SessionClaims {
            sub: ADMIN_SUBJECT.to_string(),
            owner_id: Uuid::new_v4(),
            csrf: "x".into(),
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        };
        let forged_token = encode(
            &Header::new(Algorithm::HS256),
            &forged,
            &EncodingKey::from_secret(b"other_secret"),
        )
        .unwrap();
        parts[1] = forged_token.split('.').nth(1).unwrap().to_string();

        let err = manager.validate(&parts.join(".")).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));

        let err = manager.validate(&forged_token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn test_expired_session_rejected() {
        let manager = manager();
        let claims = SessionClaims {
            sub: ADMIN_SUBJECT.to_string(),
            owner_id: Uuid::new_v4(),
            csrf: hash_token("t"),
            exp: Utc::now().timestamp() - 10,
            iat: Utc::now().timestamp() - 100,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_secret"),
        )
        .unwrap();

        assert!(matches!(manager.validate(&token), Err(AppError::ExpiredSession)));
    }

    #[test]
    fn test_csrf_checks() {
        let manager = manager();
        let issued = manager.issue(Uuid::new_v4()).unwrap();
        let claims = manager.validate(&issued.token).unwrap();
        let token = issued.csrf_token.as_str();

        assert!(verify_csrf(Some(token), Some(token), &claims).is_ok());
        assert!(verify_csrf(None, Some(token), &claims).is_err());
        assert!(verify_csrf(Some(token), None, &claims).is_err());
        assert!(verify_csrf(Some("abc"), Some("abc"), &claims).is_err());

        let other = generate_csrf_token();
        assert!(verify_csrf(Some(&other), Some(token), &claims).is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def.ghi; csrf=\"123\""),
        );

        assert_eq!(read_cookie(&headers, "session").as_deref(), Some("abc.def.ghi"));
        assert_eq!(read_cookie(&headers, "csrf").as_deref(), Some("123"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_build_cookie() {
        let cookie = build_cookie(
            "session",
            "tok",
            CookieOptions { http_only: true, secure: true, max_age_secs: 60 },
        );
        assert_eq!(cookie, "session=tok; Path=/; SameSite=Lax; Max-Age=60; HttpOnly; Secure");

        let cleared = clear_cookie("csrf", false);
        assert!(cleared.contains("Max-Age=0"));
        assert!(!cleared.contains("Secure"));
    }
}
