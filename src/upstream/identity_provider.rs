// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Web3 challenge/response endpoints of the identity provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{send, IdentityProvider};
use crate::config::IdentityProviderSettings;
use crate::error::ServiceError;
use crate::models::Challenge;

const SERVICE: &str = "identity provider";

#[derive(Debug, Clone)]
pub struct IdentityProviderClient {
    settings: IdentityProviderSettings,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    #[serde(default)]
    state: String,
    #[serde(default)]
    challenge: String,
}

impl IdentityProviderClient {
    pub fn new(settings: IdentityProviderSettings, http: Client) -> Self {
        Self { settings, http }
    }
}

#[async_trait]
impl IdentityProvider for IdentityProviderClient {
    async fn generate_challenge(&self, address: &str) -> Result<Challenge, ServiceError> {
        let form = [
            ("client_id", self.settings.client_id.as_str()),
            ("domain", self.settings.domain.as_str()),
            ("scope", self.settings.scope.as_str()),
            ("response_type", self.settings.response_type.as_str()),
            ("address", address),
        ];

        let response = send(
            SERVICE,
            self.http
                .post(self.settings.challenge_url.clone())
                .form(&form),
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::malformed(
                SERVICE,
                format!("challenge request returned HTTP {status}"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::unavailable(SERVICE, e))?;
        let payload: ChallengeResponse =
            serde_json::from_slice(&body).map_err(|e| ServiceError::malformed(SERVICE, e))?;

        if payload.state.is_empty() || payload.challenge.is_empty() {
            return Err(ServiceError::malformed(
                SERVICE,
                "state or challenge missing from challenge response",
            ));
        }

        debug!(address = %address, "Challenge issued");
        Ok(Challenge {
            state: payload.state,
            challenge: payload.challenge,
        })
    }

    async fn submit_challenge(&self, state: &str, signature: &str) -> Result<String, ServiceError> {
        let form = [
            ("client_id", self.settings.client_id.as_str()),
            ("domain", self.settings.domain.as_str()),
            ("grant_type", self.settings.grant_type.as_str()),
            ("state", state),
            ("signature", signature),
        ];

        let response = send(
            SERVICE,
            self.http.post(self.settings.submit_url.clone()).form(&form),
        )
        .await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            return Err(ServiceError::malformed(
                SERVICE,
                format!("signature submission returned HTTP {status}"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::unavailable(SERVICE, e))?;
        let mut payload: Map<String, Value> =
            serde_json::from_slice(&body).map_err(|e| ServiceError::malformed(SERVICE, e))?;

        match payload.remove("access_token") {
            Some(Value::String(token)) if !token.is_empty() => {
                info!("Signature accepted by identity provider");
                Ok(token)
            }
            Some(_) => Err(ServiceError::malformed(SERVICE, "access_token is not a string")),
            None => Err(ServiceError::malformed(SERVICE, "access_token missing from response")),
        }
    }
}
