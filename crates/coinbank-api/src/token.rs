//! Account bearer tokens.
//!
//! Tokens are stateless HMAC-signed JWTs carrying the account number they
//! authorize. There is no revocation list; a token stays valid until its
//! `expiresAt` passes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use coinbank_types::api::Claims;
use coinbank_types::models::Account;

/// Only the HMAC family is accepted, whatever the token header claims.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token expired")]
    Expired,
}

#[derive(Clone)]
pub struct TokenService {
    secret: Arc<str>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<Arc<str>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Sign a token for the account's number, expiring `ttl` from now.
    pub fn mint(&self, account: &Account) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Signing("signing secret is not configured".into()));
        }

        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing(format!("token lifetime {} is out of range", self.ttl)))?;

        let claims = Claims {
            expires_at: expires_at.timestamp(),
            account_number: account.number,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Invalid("signing secret is not configured".into()));
        }

        // `expiresAt` is not the registered `exp` claim, so expiry is checked below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))?;

        if token_data.claims.expires_at <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(token_data.claims)
    }
}
