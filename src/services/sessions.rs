use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::User,
};

/// Signed session token payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Subject: user id
    pub sub: String,
    /// Username at sign-in time
    pub name: String,
    /// Session id
    pub sid: String,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiration (unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Keys and lifetime used to issue and check session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issues a token for a freshly authenticated user
    pub fn issue(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            name: user.username.clone(),
            sid: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &SessionClaims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to encode session token: {}", e)))
    }

    /// Claims of a valid, unexpired token
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                None
            }
        }
    }
}
