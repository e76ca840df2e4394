use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::warn;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::config::JwtConfig;
use crate::state::AppState;

/// The calling user, taken from a verified access token. Every user-scoped
/// operation receives its user id through this extractor.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        verify_access(&state.config.jwt, token).map(AuthUser)
    }
}

pub(crate) fn verify_access(cfg: &JwtConfig, token: &str) -> Result<Uuid, (StatusCode, String)> {
    let mut validation = Validation::default();
    validation.set_audience(std::slice::from_ref(&cfg.audience));
    validation.set_issuer(std::slice::from_ref(&cfg.issuer));
    let decoding = DecodingKey::from_secret(cfg.secret.as_bytes());

    let data = decode::<Claims>(token, &decoding, &validation).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        (StatusCode::UNAUTHORIZED, "invalid or expired token".to_string())
    })?;

    if data.claims.kind != TokenKind::Access {
        return Err((StatusCode::UNAUTHORIZED, "access token required".into()));
    }
    Ok(data.claims.sub)
}
