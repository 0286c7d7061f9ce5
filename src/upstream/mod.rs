// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # External Services
//!
//! Clients for the services this server relays to. Each sits behind a trait
//! so the handlers can be exercised against in-process fakes.
//!
//! - [`IdentityProvider`]: web3 challenge issuance and signature submission
//! - [`VehicleDirectory`]: identity GraphQL API (vehicles by owner)
//! - [`TelemetrySource`]: trip listing and device-data history
//!
//! All clients share one `reqwest::Client` configured with the upstream
//! timeout. Dropping the calling future cancels the request in flight.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ServiceError;
use crate::models::{Challenge, LocationSample, Trip, TripWindow, Vehicle};

pub mod identity_api;
pub mod identity_provider;
pub mod telemetry;

pub use identity_api::IdentityApiClient;
pub use identity_provider::IdentityProviderClient;
pub use telemetry::TelemetryClient;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask the provider for a challenge for `address`.
    async fn generate_challenge(&self, address: &str) -> Result<Challenge, ServiceError>;

    /// Exchange a signed challenge for an access token.
    async fn submit_challenge(&self, state: &str, signature: &str) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait VehicleDirectory: Send + Sync {
    /// First page of vehicles owned by `owner`.
    async fn vehicles_owned_by(&self, owner: &str) -> Result<Vec<Vehicle>, ServiceError>;
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn trips(&self, token_id: u64, privilege_token: &str) -> Result<Vec<Trip>, ServiceError>;

    /// Raw samples for the window, in whatever order the service returns them.
    async fn history(
        &self,
        token_id: u64,
        window: &TripWindow,
        privilege_token: &str,
    ) -> Result<Vec<LocationSample>, ServiceError>;
}

/// Build the shared HTTP client.
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Send a request, mapping transport failures.
pub(crate) async fn send(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Response, ServiceError> {
    request
        .send()
        .await
        .map_err(|e| ServiceError::unavailable(service, e))
}

/// Check the status of a bearer-authenticated call and decode its JSON body.
///
/// A `401`/`403` means the privilege token was refused; any other non-2xx
/// status is treated as a malformed response.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, ServiceError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ServiceError::Unauthenticated(format!(
            "Privilege token was rejected by {service}"
        )));
    }
    if !status.is_success() {
        return Err(ServiceError::malformed(service, format!("HTTP {status}")));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| ServiceError::unavailable(service, e))?;
    serde_json::from_slice(&body).map_err(|e| ServiceError::malformed(service, e))
}

/// Join path segments onto a base URL, tolerating a trailing slash.
pub(crate) fn endpoint(base: &url::Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
}
