//! Issues and validates the two token classes used by the API.
//!
//! Access tokens authorize resource calls and are never persisted; refresh
//! tokens are longer-lived, stored on the user record, and rotated on every
//! use. Each class is signed with its own secret so one can never stand in
//! for the other.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::user::{Role, User};

/// Claims carried by both token classes.
///
/// `jti` makes every minted token unique, so a rotated refresh token is
/// always distinguishable from its predecessor even within the same second.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenClaims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub role: Role,
    pub phone_number: String,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints and validates the HS256 tokens bound to a user identity.
pub struct TokenService {
    config: JwtConfig,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Issues a new access/refresh pair for the given user. The caller is
    /// responsible for persisting the refresh token on the user record.
    pub fn issue(&self, user: &User) -> Result<TokenPair, String> {
        let access_token = self.mint(user, &self.config.access_secret, self.config.access_exp)?;
        let refresh_token = self.mint(user, &self.config.refresh_secret, self.config.refresh_exp)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn mint(&self, user: &User, secret: &str, ttl: i64) -> Result<String, String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: user.id.clone(),
            iss: self.config.iss.clone(),
            iat: now,
            exp: now + ttl,
            jti: Uuid::new_v4().to_string(),
            role: user.role,
            phone_number: user.phone_number.clone(),
        };

        let encoding_key = EncodingKey::from_secret(secret.as_ref());
        encode(&Header::default(), &claims, &encoding_key)
            .map_err(|e| format!("Failed to encode token: {}", e))
    }

    /// Validates an access token, returning its claims.
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, String> {
        Self::verify(token, &self.config.access_secret)
    }

    /// Validates a refresh token against the refresh secret. Matching the
    /// decoded token against the value stored on the user record is the
    /// caller's job.
    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, String> {
        Self::verify(token, &self.config.refresh_secret)
    }

    fn verify(token: &str, secret: &str) -> Result<TokenClaims, String> {
        let mut validation = Validation::default();
        validation.validate_aud = false;

        let decoding_key = DecodingKey::from_secret(secret.as_ref());
        let decoded = decode::<TokenClaims>(token, &decoding_key, &validation)
            .map_err(|e| format!("Failed to decode token: {}", e))?;
        debug!("Decoded token for sub='{}'", decoded.claims.sub);
        Ok(decoded.claims)
    }
}
