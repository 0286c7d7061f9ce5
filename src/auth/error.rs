// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Reasons the authorization gate rejects a request.
///
/// The gate fails closed: every variant, including key-set fetch failures,
/// maps to `401 Unauthorized`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No bearer token or session cookie was presented")]
    MissingCredential,

    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    #[error("Session is unknown or has expired")]
    SessionNotFound,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token issuer is invalid")]
    InvalidIssuer,

    #[error("Token audience is invalid")]
    InvalidAudience,

    #[error("Token is not yet valid")]
    TokenNotYetValid,

    #[error("Token carries no address claim")]
    MissingAddressClaim,

    #[error("Failed to fetch signing keys: {0}")]
    KeySetUnavailable(String),

    #[error("No matching key found in key set")]
    NoMatchingKey,

    #[error("Unsupported signing key: {0}")]
    UnsupportedKey(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: bool,
    message: String,
    error_code: &'static str,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::SessionNotFound => "session_not_found",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::MissingAddressClaim => "missing_address_claim",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::UnsupportedKey(_) => "unsupported_key",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// Message shown to the client; key-set failures are not detailed.
    fn public_message(&self) -> String {
        match self {
            AuthError::KeySetUnavailable(_) | AuthError::UnsupportedKey(_) => {
                "Unable to verify credential".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, error_code = self.error_code(), "JWT validation error");
        let body = Json(AuthErrorBody {
            error: true,
            message: self.public_message(),
            error_code: self.error_code(),
        });
        (self.status_code(), body).into_response()
    }
}
