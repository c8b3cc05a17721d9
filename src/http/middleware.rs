//! Authentication middleware and JWT verification

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Roles allowed to use the admin endpoints
pub const ADMIN_ROLES: [&str; 2] = ["service_role", "admin"];

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (calling service or operator id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Role
    #[serde(default)]
    pub role: Option<String>,
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken)
}

/// Verify an HS256 token and return its claims
pub fn verify_jwt(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::InvalidToken);
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.verify_slice(&decode_segment(signature)?)
        .map_err(|_| AuthError::InvalidToken)?;

    let claims: JwtClaims =
        serde_json::from_slice(&decode_segment(payload)?).map_err(|_| AuthError::InvalidToken)?;

    if claims.exp < chrono::Utc::now().timestamp() {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

/// Extract JWT from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    InvalidFormat,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Insufficient role")]
    Forbidden,

    #[error("Too many requests")]
    RateLimited,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::MissingHeader => StatusCode::UNAUTHORIZED,
            AuthError::InvalidFormat => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        };

        (status, self.to_string()).into_response()
    }
}

/// Authenticated caller extractor result
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    pub subject: String,
    pub claims: JwtClaims,
}

impl AuthenticatedCaller {
    pub fn is_admin(&self) -> bool {
        self.claims
            .role
            .as_deref()
            .map(|role| ADMIN_ROLES.contains(&role))
            .unwrap_or(false)
    }
}

fn authenticate(state: &AppState, request: &Request) -> Result<AuthenticatedCaller, AuthError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;

    let token = extract_bearer_token(auth_header).ok_or(AuthError::InvalidFormat)?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    Ok(AuthenticatedCaller {
        subject: claims.sub.clone(),
        claims,
    })
}

/// Middleware to require authentication
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let caller = authenticate(&state, &request)?;

    // Insert into request extensions for handlers to access
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

/// Middleware to require an admin role, rate limited across all admins
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let caller = authenticate(&state, &request)?;
    if !caller.is_admin() {
        warn!(subject = %caller.subject, "Admin endpoint denied");
        return Err(AuthError::Forbidden);
    }

    if state.admin_limiter.check().is_err() {
        return Err(AuthError::RateLimited);
    }

    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}


#[cfg(test)]
mod tests {
    use super::testing::{claims, sign};
    use super::*;

    #[test]
    fn valid_token_round_trips() {
        let token = sign(&claims("game-server", Some("service_role"), 60), "secret");
        let verified = verify_jwt(&token, "secret").unwrap();
        assert_eq!(verified.sub, "game-server");
        assert_eq!(verified.role.as_deref(), Some("service_role"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign(&claims("game-server", None, 60), "secret");
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign(&claims("game-server", None, -60), "secret");
        assert!(matches!(
            verify_jwt(&token, "secret"),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(verify_jwt("abc.def", "secret").is_err());
        assert_eq!(extract_bearer_token("Basic xyz"), None);
    }
}
