// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge/response login.
//!
//! ```text
//! Init ──issue_challenge──▶ ChallengeIssued ──submit_signature──▶ SessionEstablished
//!                                                     └──────────▶ Failed
//! ```
//!
//! Nothing is stored until the provider hands back an access token; a failed
//! submission leaves no trace locally.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{AuthenticatedAddress, TokenVerifier};
use crate::error::ServiceError;
use crate::models::Challenge;
use crate::session::{Session, SessionId, SessionStore};
use crate::upstream::IdentityProvider;

#[derive(Clone)]
pub struct Authenticator {
    provider: Arc<dyn IdentityProvider>,
    verifier: Arc<TokenVerifier>,
    sessions: SessionStore,
}

impl Authenticator {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        verifier: Arc<TokenVerifier>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            provider,
            verifier,
            sessions,
        }
    }

    /// Relay a challenge request for `address`. Creates no local state.
    pub async fn issue_challenge(&self, address: &str) -> Result<Challenge, ServiceError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ServiceError::Validation("address is required".to_string()));
        }
        self.provider.generate_challenge(address).await
    }

    /// Exchange a signed challenge for a new session.
    pub async fn submit_signature(&self, state: &str, signature: &str) -> Result<Session, ServiceError> {
        if state.trim().is_empty() {
            return Err(ServiceError::Validation("state is required".to_string()));
        }
        if signature.trim().is_empty() {
            return Err(ServiceError::Validation("signature is required".to_string()));
        }

        let access_token = self.provider.submit_challenge(state, signature).await?;
        let session = self.sessions.establish(access_token);
        info!(session_id = %session.id, "Session established from signed challenge");
        Ok(session)
    }

    /// Open a session for a bearer token issued elsewhere.
    ///
    /// The token must verify before anything is stored.
    pub async fn establish_from_token(
        &self,
        token: &str,
    ) -> Result<(Session, AuthenticatedAddress), ServiceError> {
        let caller = self.verifier.verify(token).await.map_err(|e| {
            warn!(error = %e, "Rejected bearer token for session");
            ServiceError::Unauthenticated(e.to_string())
        })?;

        let session = self.sessions.establish(token.to_string());
        info!(
            session_id = %session.id,
            address = %caller.address,
            "Session established from bearer token"
        );
        Ok((session, caller))
    }

    /// Destroy the named session, if any. Returns whether one was live.
    pub fn logout(&self, session: Option<SessionId>) -> bool {
        let Some(id) = session else {
            return false;
        };
        let existed = self.sessions.destroy(&id);
        if existed {
            info!(session_id = %id, "Session destroyed");
        }
        existed
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
