//! Token service - issuance and verification of self-contained bearer
//! tokens.
//!
//! The wire format is the familiar three-segment compact shape
//! (`base64url(header).base64url(claims).base64url(signature)`) with an
//! HS256 header, but encoding and verification are implemented here rather
//! than through a general-purpose JWT library: the pipeline below is the
//! authoritative definition of what this service accepts.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::models::User;
use gatekeeper_core::error::AppError;
use gatekeeper_core::utils::signature;

/// Lookahead window for near-expiry probing.
const NEAR_EXPIRY_WINDOW_SECS: i64 = 60 * 60;

/// Claims carried by an access token. Timestamps are Unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Token response returned to the client after a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// Issues and verifies access tokens.
///
/// Holds the signing secret and default TTL as immutable state injected at
/// construction; business logic never reads the environment.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_token_ttl_seconds: i64,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            access_token_ttl_seconds: config.access_token_ttl_seconds,
        }
    }

    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    /// Issue an access token for a user with the configured TTL.
    pub fn issue_for_user(&self, user: &User) -> Result<TokenResponse, AppError> {
        let access_token = self.issue(
            user.id,
            &user.username,
            &user.email,
            self.access_token_ttl_seconds,
        )?;

        Ok(TokenResponse {
            access_token,
            expires_in: self.access_token_ttl_seconds,
        })
    }

    /// Build and sign a token valid for `ttl_seconds` from now.
    pub fn issue(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        ttl_seconds: i64,
    ) -> Result<String, AppError> {
        let iat = Utc::now().timestamp();
        let claims = TokenClaims {
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            iat: Some(iat),
            exp: Some(iat + ttl_seconds),
        };

        let header = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
        let header_segment = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header).map_err(|e| AppError::InternalError(e.into()))?,
        );
        let claims_segment = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims).map_err(|e| AppError::InternalError(e.into()))?,
        );

        let message = format!("{}.{}", header_segment, claims_segment);
        let sig = signature::sign(self.secret.as_bytes(), message.as_bytes())?;

        Ok(format!("{}.{}", message, URL_SAFE_NO_PAD.encode(sig)))
    }

    /// Verify a token and return its claims.
    ///
    /// Authenticity is established before anything else is trusted: a token
    /// only reports `TokenExpired` once its signature has checked out, so a
    /// tampered-but-expired token is `InvalidToken`, never `TokenExpired`.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AppError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid_token("Invalid token format"));
        }
        let (header_segment, claims_segment, sig_segment) = (parts[0], parts[1], parts[2]);

        let supplied_sig = URL_SAFE_NO_PAD
            .decode(sig_segment)
            .map_err(|_| invalid_token("Invalid token signature"))?;

        let message = format!("{}.{}", header_segment, claims_segment);
        let authentic =
            signature::verify(self.secret.as_bytes(), message.as_bytes(), &supplied_sig)
                .map_err(|_| invalid_token("Invalid token signature"))?;
        if !authentic {
            return Err(invalid_token("Invalid token signature"));
        }

        let claims =
            decode_claims(claims_segment).ok_or_else(|| invalid_token("Invalid token payload"))?;

        // Claim times are seconds; wall-clock comparison in milliseconds.
        if let Some(exp) = claims.exp {
            if Utc::now().timestamp_millis() >= exp * 1000 {
                return Err(AppError::TokenExpired);
            }
        }

        Ok(claims)
    }

    /// Pull the token out of an `Authorization: Bearer <token>` value.
    pub fn extract_from_header(header: Option<&str>) -> Option<&str> {
        let header = header?;

        let parts: Vec<&str> = header.split(' ').collect();
        if parts.len() != 2 || parts[0] != "Bearer" || parts[1].is_empty() {
            return None;
        }

        Some(parts[1])
    }

    /// Decode the claims segment without checking the signature.
    ///
    /// Non-authoritative: only for inspection such as near-expiry probing.
    pub fn decode_without_verification(token: &str) -> Option<TokenClaims> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return None;
        }

        decode_claims(parts[1])
    }

    /// Whether the token should be refreshed soon.
    ///
    /// Anything unverifiable counts as near expiry, as does a missing `exp`.
    pub fn is_near_expiry(&self, token: &str) -> bool {
        let claims = match self.verify(token) {
            Ok(claims) => claims,
            Err(_) => return true,
        };

        let exp = match claims.exp {
            Some(exp) => exp,
            None => return true,
        };

        exp * 1000 <= Utc::now().timestamp_millis() + NEAR_EXPIRY_WINDOW_SECS * 1000
    }

    /// Wall-clock instant at which a token issued now would expire.
    pub fn token_expiration_time(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.access_token_ttl_seconds)
    }
}

fn invalid_token(message: &str) -> AppError {
    AppError::InvalidToken(message.to_string())
}

fn decode_claims(segment: &str) -> Option<TokenClaims> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}
