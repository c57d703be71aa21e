//! JWT authentication module.
//!
//! Issues and checks bearer tokens, and turns a request's `Authorization`
//! header into the caller's [`Identity`].
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//!  extract_bearer_token ── missing / not "Bearer " ─► 401 Not authenticated
//!        │
//!        ▼
//!  JwtManager::verify ──── bad signature / garbage ─► 401 Invalid token
//!        │             └── exp in the past ─────────► 401 Token expired
//!        ▼
//!  people().load_identity ─ no row ─────────────────► 401 User no longer exists
//!        │
//!        ▼
//!  restrict_to(tags) ───── no matching tag ─────────► 403
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use store_core::{Identity, RoleTag};

use crate::error::ApiError;
use crate::AppState;

// =============================================================================
// Auth Error
// =============================================================================

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated. Please log in")]
    MissingToken,

    #[error("Invalid token. Please log in again")]
    InvalidToken,

    #[error("Token expired. Please log in again")]
    TokenExpired,

    #[error("User no longer exists")]
    UserGone,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Failed to hash secret: {0}")]
    Hashing(String),
}

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (person id)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager (HS256).
pub struct JwtManager {
    secret: String,
    lifetime: Duration,
}

impl JwtManager {
    pub fn new(secret: impl Into<String>, lifetime: Duration) -> Self {
        JwtManager {
            secret: secret.into(),
            lifetime,
        }
    }

    /// Signs a token for `person_id`.
    pub fn issue(&self, person_id: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: person_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Validates a token and returns the person id it names. Expiry is
    /// checked to the second.
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        data.claims.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Extractors
// =============================================================================

/// Admits the caller when any of `tags` applies.
pub fn restrict_to(identity: &Identity, tags: &[RoleTag]) -> Result<(), AuthError> {
    if identity.has_any(tags) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = extract_bearer_token(header).ok_or(AuthError::MissingToken)?;
        let person_id = state.jwt.verify(token)?;

        let identity = state
            .db
            .people()
            .load_identity(person_id)
            .await?
            .ok_or(AuthError::UserGone)?;
        debug!(
            person_id,
            customer = identity.is_customer,
            employee = identity.is_employee,
            "Authenticated"
        );
        Ok(CurrentUser(identity))
    }
}

/// An authenticated caller with an employee record.
#[derive(Debug, Clone)]
pub struct StaffUser(pub Identity);

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        restrict_to(&identity, &[RoleTag::Employee])?;
        Ok(StaffUser(identity))
    }
}

/// An authenticated caller with a customer account.
#[derive(Debug, Clone)]
pub struct CustomerUser(pub Identity);

impl FromRequestParts<AppState> for CustomerUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        restrict_to(&identity, &[RoleTag::Customer])?;
        Ok(CustomerUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", Duration::hours(1));
        let token = manager.issue(42).unwrap();
        assert_eq!(manager.verify(&token).unwrap(), 42);
    }

    #[test]
    fn test_foreign_secret_is_invalid() {
        let ours = JwtManager::new("test-secret", Duration::hours(1));
        let theirs = JwtManager::new("another-secret", Duration::hours(1));
        let token = theirs.issue(42).unwrap();
        assert!(matches!(ours.verify(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(ours.verify("not-a-jwt"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new("test-secret", Duration::hours(1));
        let issued = Utc::now() - Duration::hours(3);
        let token = manager
            .sign(&Claims {
                sub: "42".to_string(),
                iat: issued.timestamp(),
                exp: (issued + Duration::hours(1)).timestamp(),
                jti: Uuid::new_v4().to_string(),
            })
            .unwrap();
        assert!(matches!(manager.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_recently_expired_token() {
        let manager = JwtManager::new("test-secret", Duration::hours(1));
        let now = Utc::now();
        let token = manager
            .sign(&Claims {
                sub: "42".to_string(),
                iat: (now - Duration::hours(1)).timestamp(),
                exp: (now - Duration::seconds(30)).timestamp(),
                jti: Uuid::new_v4().to_string(),
            })
            .unwrap();
        assert!(matches!(manager.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("bearer abc"), None);
    }
}
