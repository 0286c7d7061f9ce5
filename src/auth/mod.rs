// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Gate
//!
//! Verifies token-exchange JWTs and exposes the caller's wallet address.
//!
//! ## Flow
//!
//! 1. The request carries `Authorization: Bearer <jwt>`, or a `session_id`
//!    cookie whose session holds the JWT obtained at login
//! 2. The key set is fetched via HTTPS and cached with a TTL
//! 3. Signature, expiry, issuer and audience are checked
//! 4. `ethereum_address` (or `sub`) becomes the [`AuthenticatedAddress`]
//!
//! The gate is stateless and fails closed: every failure is a `401`.
//! Clock skew tolerance is 60 seconds.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod verifier;

pub use claims::AuthenticatedAddress;
pub use error::AuthError;
pub use extractor::Caller;
pub use jwks::JwksManager;
pub use middleware::require_address;
pub use verifier::TokenVerifier;
