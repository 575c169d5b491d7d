//! Bearer token issuance and validation (HS256)

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::{Error, Result};
use crate::models::Role;

use super::Identity;

/// Claims carried by every issued token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the user id
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
    pub iss: String,
    pub aud: String,
}

/// A freshly signed token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens with a shared secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
    issuer: String,
    audience: String,
    lifetime: chrono::Duration,
}

impl TokenService {
    /// Build from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the secret is empty.
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.trim().is_empty() {
            return Err(Error::Config(Box::new(figment::Error::from(
                "jwt.secret must not be empty".to_string(),
            ))));
        }
        if config.secret.len() < 32 {
            tracing::warn!(
                length = config.secret.len(),
                "JWT secret is shorter than 32 bytes; use a longer secret in production"
            );
        }

        let secret = config.secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: config.lifetime(),
        })
    }

    /// Issue a token for `identity`, embedding its role and an expiry
    pub fn issue_token(&self, user_id: i64, email: &str, role: Role) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.lifetime;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        tracing::debug!(user_id, role = %role, jti = %claims.jti, "Issued access token");
        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a token and return the identity it carries
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for bad signatures, expired tokens, and wrong
    /// issuer or audience.
    pub fn validate_token(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "Token has expired",
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    "Token was not issued for this service"
                }
                _ => "Invalid token",
            };
            tracing::debug!(error = %e, "Token validation failed");
            Error::Unauthorized(reason.to_string())
        })?;

        let claims = data.claims;
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| Error::Unauthorized("Invalid token subject".to_string()))?;

        Ok(Identity {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}
