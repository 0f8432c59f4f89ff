use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Validation, decode, encode, errors::ErrorKind};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    errors::ApiError,
    models::TokenPairResponse,
    repository::RepositoryState,
};

/// TokenKind
///
/// Discriminates the two tokens this service issues. The kind is embedded in
/// the claims as `token_type` so a refresh token can never authenticate a
/// request and an access token can never mint new tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Claims
///
/// The payload signed into every JWT issued by this service (HS256).
/// Validated on every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user, the primary key into `users`.
    pub sub: Uuid,
    /// Expiration Time (exp): timestamp after which the JWT must not be accepted.
    pub exp: usize,
    /// Issued At (iat): timestamp when the JWT was issued.
    pub iat: usize,
    /// "access" or "refresh". See [`TokenKind`].
    pub token_type: String,
}

/// issue_token
///
/// Signs a single token of the given kind for `user_id`, with the lifetime
/// taken from the configuration.
pub fn issue_token(user_id: Uuid, kind: TokenKind, config: &AppConfig) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let ttl = match kind {
        TokenKind::Access => config.access_token_ttl_secs,
        TokenKind::Refresh => config.refresh_token_ttl_secs,
    };

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + ttl) as usize,
        token_type: kind.as_str().to_string(),
    };

    encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

/// issue_token_pair
///
/// The login result: one access token and one refresh token for the user.
pub fn issue_token_pair(user_id: Uuid, config: &AppConfig) -> Result<TokenPairResponse, ApiError> {
    Ok(TokenPairResponse {
        access: issue_token(user_id, TokenKind::Access, config)?,
        refresh: issue_token(user_id, TokenKind::Refresh, config)?,
    })
}

/// decode_token
///
/// Decodes and validates a token, additionally asserting that its
/// `token_type` claim matches the expected kind. Expiry is always checked.
pub fn decode_token(token: &str, kind: TokenKind, config: &AppConfig) -> Result<Claims, ApiError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => data,
        Err(e) => {
            return match e.kind() {
                // Token expired: the most common failure for a valid-but-old token.
                ErrorKind::ExpiredSignature => Err(ApiError::Unauthorized),
                // Bad signature, malformed token, etc.
                _ => Err(ApiError::Unauthorized),
            };
        }
    };

    if token_data.claims.token_type != kind.as_str() {
        return Err(ApiError::Unauthorized);
    }

    Ok(token_data.claims)
}

/// hash_password
///
/// Produces an Argon2id PHC string with a fresh OS-random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// Checks a candidate password against a stored PHC string. Any parse or
/// verification failure counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers use this
/// struct to retrieve the caller's id for all authorship and membership
/// checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The unique identifier of the user, mapped to users.id.
    pub id: Uuid,
    pub username: String,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any authenticated handler, cleanly separating
/// authentication (extractor) from business logic (the handler).
///
/// The process:
/// 1. Dependency Resolution: Repository and AppConfig from the app state.
/// 2. Local Bypass: development-time access using the 'x-user-id' header.
/// 3. Token Validation: Bearer extraction plus access-token decoding.
/// 4. DB Lookup: the user must still exist; deleted users are rejected
///    even when their token is otherwise valid.
///
/// Rejection: 401 Unauthorized on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local Development Bypass Check
        // In Env::Local only, a request may authenticate by naming a known
        // user UUID in the 'x-user-id' header. The UUID must map to a real
        // user row so downstream checks behave exactly as in production.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Some(user) = repo.get_user(user_id).await {
                            return Ok(AuthUser {
                                id: user.id,
                                username: user.username,
                            });
                        }
                    }
                }
            }
        }
        // If Env is Production, or the bypass failed (bad header or unknown
        // user), execution falls through to the standard JWT flow.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        // Only access tokens may authenticate requests.
        let claims = decode_token(token, TokenKind::Access, &config)?;

        // Final Verification: the subject must still exist in the database.
        let user = repo
            .get_user(claims.sub)
            .await
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_subject_and_kind() {
        let config = AppConfig::default();
        let user_id = Uuid::new_v4();

        let token = issue_token(user_id, TokenKind::Access, &config).unwrap();
        let claims = decode_token(&token, TokenKind::Access, &config).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn refresh_token_rejected_as_access_token() {
        let config = AppConfig::default();
        let token = issue_token(Uuid::new_v4(), TokenKind::Refresh, &config).unwrap();

        assert!(decode_token(&token, TokenKind::Access, &config).is_err());
        assert!(decode_token(&token, TokenKind::Refresh, &config).is_ok());
    }

    #[test]
    fn tampered_token_rejected() {
        let config = AppConfig::default();
        let mut token = issue_token(Uuid::new_v4(), TokenKind::Access, &config).unwrap();
        token.push('x');

        assert!(decode_token(&token, TokenKind::Access, &config).is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("hunter2-but-longer").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2-but-longer", &hash));
        assert!(!verify_password("wrong-password", &hash));
        assert!(!verify_password("hunter2-but-longer", "not-a-phc-string"));
    }
}
