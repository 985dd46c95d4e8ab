//! JWT token generation and validation
//! Access tokens and refresh tokens are signed with independent secrets

use crate::{config::SecurityConfig, error::AppError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID, keeps tokens issued within the same second distinct
    pub jti: String,
}

/// Claims carried by a refresh token. No `exp`: validity is the stored list.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub jti: String,
}

/// Which secret a token is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Token verification failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,
}

/// Token pair response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// seconds until the access token expires
    pub expires_in: u64,
}

/// Signs and verifies bearer tokens
pub struct TokenCodec {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    access_token_exp_secs: u64,
}

impl TokenCodec {
    /// Create codec from raw secrets
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_token_exp_secs: u64,
    ) -> Result<Self, AppError> {
        // Ensure secrets are at least 32 bytes for HS256
        if access_secret.len() < 32 || refresh_secret.len() < 32 {
            return Err(AppError::Config("Token secret too short (min 32 chars)".to_string()));
        }

        if access_secret == refresh_secret {
            return Err(AppError::Config(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        Ok(Self {
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_token_exp_secs,
        })
    }

    /// Create codec from config
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        Self::new(
            config.access_token_secret.expose_secret(),
            config.refresh_token_secret.expose_secret(),
            config.access_token_exp_secs,
        )
    }

    pub fn access_token_exp_secs(&self) -> u64 {
        self.access_token_exp_secs
    }

    /// Issue an access token for `subject`
    pub fn issue_access_token(&self, subject: &Uuid) -> Result<String, AppError> {
        self.issue_access_token_at(subject, Utc::now())
    }

    /// Issue an access token as if the current time were `now`
    pub fn issue_access_token_at(
        &self,
        subject: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let expiration = now + Duration::seconds(self.access_token_exp_secs as i64);

        let claims = AccessClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding_key).map_err(|e| {
            tracing::error!("Failed to encode access token: {:?}", e);
            AppError::Internal(format!("Failed to encode access token: {}", e))
        })
    }

    /// Issue a refresh token for `subject`
    pub fn issue_refresh_token(&self, subject: &Uuid) -> Result<String, AppError> {
        let claims = RefreshClaims {
            sub: subject.to_string(),
            iat: Utc::now().timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding_key).map_err(|e| {
            tracing::error!("Failed to encode refresh token: {:?}", e);
            AppError::Internal(format!("Failed to encode refresh token: {}", e))
        })
    }

    /// Issue an access/refresh pair
    pub fn issue_pair(&self, subject: &Uuid) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(subject)?,
            refresh_token: self.issue_refresh_token(subject)?,
            expires_in: self.access_token_exp_secs,
        })
    }

    /// Verify `token` against the secret for `kind` and return its subject
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Uuid, TokenError> {
        let sub = match kind {
            TokenKind::Access => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.leeway = 0;
                validation.set_required_spec_claims(&["exp", "sub"]);

                decode::<AccessClaims>(token, &self.access_decoding_key, &validation)
                    .map_err(map_decode_error)?
                    .claims
                    .sub
            }
            TokenKind::Refresh => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.validate_exp = false;
                validation.required_spec_claims = HashSet::new();

                decode::<RefreshClaims>(token, &self.refresh_decoding_key, &validation)
                    .map_err(map_decode_error)?
                    .claims
                    .sub
            }
        };

        Uuid::parse_str(&sub).map_err(|_| TokenError::Malformed)
    }
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
    tracing::debug!("Token validation failed: {:?}", e);
    match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    }
}
