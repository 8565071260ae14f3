//! Bearer-token authentication and role gating.
//!
//! Tokens are HS256 JWTs minted by the identity service (or by
//! [`TokenVerifier::issue`] for tooling and tests). Verification is stateless:
//! the caller's id and role come from the claims alone.

use std::fmt;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::{AuthConfig, ConfigError},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("You are not logged in! Please log in to get access.")]
    MissingToken,
    #[error("Your token has expired! Please log in again.")]
    TokenExpired,
    #[error("Invalid token. Please log in again.")]
    InvalidToken,
    #[error("Failed to generate token: {0}")]
    TokenGeneration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
    Owner,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Owner => "owner",
            Role::Admin => "admin",
        })
    }
}

/// JWT claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub role: Role,
    /// Issued at (Unix epoch seconds)
    pub iat: i64,
    /// Expiration (Unix epoch seconds)
    pub exp: i64,
    pub iss: String,
}

#[derive(Clone)]
pub struct TokenVerifier {
    issuer: String,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            issuer: config.issuer.clone(),
            ttl: config.token_ttl()?,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        })
    }

    /// Mints a token for `user` with the configured lifetime.
    pub fn issue(&self, user: Uuid, role: Role) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::TokenGeneration("token lifetime overflows the clock".to_string()))?;
        let claims = Claims {
            sub: user.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

/// The authenticated caller of a request.
///
/// Extracting it rejects the request with 401 when the bearer token is
/// missing, invalid or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Rejects the request with 403 unless the caller has one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = state.tokens.verify(token)?;
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthUser { id, role: claims.role })
    }
}
