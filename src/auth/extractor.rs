// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the verified caller address.
//!
//! ```rust,ignore
//! async fn my_vehicles(Caller(caller): Caller) -> impl IntoResponse {
//!     // caller.address is the verified wallet address
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;

use super::{AuthError, AuthenticatedAddress};
use crate::session::{session_id_from_jar, SessionStore};
use crate::state::AppState;

/// Verified caller identity.
///
/// Uses the identity placed in the request extensions by
/// [`require_address`](super::require_address) when present, otherwise
/// verifies the request's credential itself.
pub struct Caller(pub AuthenticatedAddress);

impl FromRequestParts<AppState> for Caller {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(caller) = parts.extensions.get::<AuthenticatedAddress>().cloned() {
            return Ok(Caller(caller));
        }

        let token = find_credential(&parts.headers, &state.sessions)?;
        let caller = state.verifier.verify(&token).await?;
        Ok(Caller(caller))
    }
}

/// Locate the credential to verify.
///
/// An `Authorization: Bearer` header wins; without one, the privilege token
/// cached under the `session_id` cookie is used.
pub fn find_credential(headers: &HeaderMap, sessions: &SessionStore) -> Result<String, AuthError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        return bearer_token(value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?);
    }

    let jar = CookieJar::from_headers(headers);
    let session_id = session_id_from_jar(&jar).ok_or(AuthError::MissingCredential)?;
    sessions
        .privilege_token(&session_id)
        .ok_or(AuthError::SessionNotFound)
}

/// Extract the token from a `Bearer <token>` header value.
///
/// The scheme name is case-insensitive (RFC 7235).
pub fn bearer_token(header: &str) -> Result<String, AuthError> {
    let (scheme, token) = header
        .trim_start()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token.to_string())
}
