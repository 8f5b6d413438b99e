//! Token issuance, password hashing, and the bearer-token extractor.
//!
//! Access tokens are HS256 JWTs carrying the user id in `sub` and a fixed
//! `user` audience claim. Passwords are stored as Argon2 PHC strings.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use axum::response::Json;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use model::entities::user;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::error;

use crate::schemas::{AppState, ErrorResponse};

/// Audience claim stamped into every access token.
const TOKEN_AUDIENCE: &str = "user";

/// Token signing and verification settings.
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, ttl_hours: i64) -> Self {
        Self {
            jwt_secret,
            token_ttl: Duration::hours(ttl_hours),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The secret stays out of logs.
        f.debug_struct("AuthConfig")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token signing failed: {0}")]
    Sign(String),
}

/// A signed access token plus its expiry, as returned to clients.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn sign_access_token(config: &AuthConfig, user_id: i32) -> Result<IssuedToken, AuthError> {
    let now = Utc::now();
    let expires_at = now + config.token_ttl;
    let claims = Claims {
        sub: user_id.to_string(),
        aud: TOKEN_AUDIENCE.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::Sign(e.to_string()))?;

    Ok(IssuedToken { token, expires_at })
}

pub fn decode_access_token(config: &AuthConfig, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[TOKEN_AUDIENCE]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// The authenticated user, resolved from the `Authorization: Bearer` header.
#[derive(Debug)]
pub struct AuthUser(pub user::Model);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("Missing bearer token", "AUTH_TOKEN_NOT_FOUND"))?;

        let claims = decode_access_token(&state.auth, token)
            .map_err(|_| unauthorized("Invalid or expired token", "AUTH_INVALID_TOKEN"))?;
        let user_id: i32 = claims
            .sub
            .parse()
            .map_err(|_| unauthorized("Invalid token payload", "AUTH_INVALID_TOKEN"))?;

        if let Some(user) = state.user_cache.get(&user_id).await {
            return Ok(AuthUser(user));
        }

        let user = user::Entity::find_by_id(user_id)
            .one(&state.db)
            .await
            .map_err(|e| {
                error!("Database error while resolving token user: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to resolve authenticated user".to_string(),
                        code: "DATABASE_ERROR".to_string(),
                        success: false,
                    }),
                )
            })?
            .ok_or_else(|| unauthorized("User no longer exists", "AUTH_USER_NOT_FOUND"))?;

        state.user_cache.insert(user_id, user.clone()).await;

        Ok(AuthUser(user))
    }
}

pub fn unauthorized(message: &str, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            success: false,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("test-secret".to_string(), 1)
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2hunter2", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn garbage_hashes_never_verify() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn token_round_trip() {
        let config = config();
        let issued = sign_access_token(&config, 42).unwrap();

        let claims = decode_access_token(&config, &issued.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.aud, "user");
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let issued =
            sign_access_token(&AuthConfig::new("other-secret".to_string(), 1), 42).unwrap();
        assert!(decode_access_token(&config(), &issued.token).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        // Negative TTL puts the expiry (and the validation leeway) in the past.
        let config = AuthConfig::new("test-secret".to_string(), -2);
        let issued = sign_access_token(&config, 7).unwrap();
        assert!(decode_access_token(&config, &issued.token).is_err());
    }
}
