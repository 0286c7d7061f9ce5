// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the verified caller identity.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;

/// Claims read from a token-exchange JWT.
///
/// The address lives in `ethereum_address`; older tokens only carry it as
/// `sub`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: String,

    #[serde(default)]
    pub ethereum_address: Option<String>,

    pub exp: i64,

    #[serde(default)]
    pub iss: Option<String>,
}

/// Caller identity exposed to handlers once the gate has verified a token.
///
/// Stored as a request extension by the middleware; handlers read it with
/// the [`Caller`](super::Caller) extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedAddress {
    /// Wallet address the token was issued to.
    pub address: String,

    #[serde(skip)]
    pub subject: String,

    /// Token expiration (Unix timestamp).
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedAddress {
    pub fn from_claims(claims: TokenClaims) -> Result<Self, AuthError> {
        let address = claims
            .ethereum_address
            .filter(|a| !a.trim().is_empty())
            .or_else(|| Some(claims.sub.clone()).filter(|s| !s.trim().is_empty()))
            .ok_or(AuthError::MissingAddressClaim)?;

        Ok(Self {
            address,
            subject: claims.sub,
            expires_at: claims.exp,
        })
    }
}
