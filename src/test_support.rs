// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: signed tokens, loopback upstreams and
//! in-process fakes of the upstream traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;

use crate::auth::{JwksManager, TokenVerifier};
use crate::config::CookieSettings;
use crate::error::ServiceError;
use crate::models::{Challenge, LocationSample, Trip, TripWindow, Vehicle};
use crate::state::{AppState, Upstreams};
use crate::upstream::{IdentityProvider, TelemetrySource, VehicleDirectory};

pub const TEST_KID: &str = "test-key-1";

// 42 bytes: the base64 form has no padding and no url-unsafe characters.
const TEST_SECRET: &[u8] = b"vehicle-trips-test-secret-0123456789abcdef";

pub fn test_key_set() -> JwkSet {
    serde_json::from_value(json!({
        "keys": [{
            "kty": "oct",
            "kid": TEST_KID,
            "alg": "HS256",
            "k": URL_SAFE_NO_PAD.encode(TEST_SECRET),
        }]
    }))
    .unwrap()
}

pub fn test_verifier() -> TokenVerifier {
    TokenVerifier::new(JwksManager::from_key_set(test_key_set()))
}

#[derive(Debug, Clone, Serialize)]
pub struct TestClaims {
    pub sub: String,
    pub ethereum_address: Option<String>,
    pub exp: i64,
    pub iss: String,
}

impl TestClaims {
    pub fn for_address(address: &str) -> Self {
        Self {
            sub: "ChdkaWQ6dGVzdA".to_string(),
            ethereum_address: Some(address.to_string()),
            exp: Utc::now().timestamp() + 3600,
            iss: "https://auth.example.com".to_string(),
        }
    }
}

pub fn sign_test_token_with(claims: TestClaims) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
}

pub fn sign_test_token(address: &str) -> String {
    sign_test_token_with(TestClaims::for_address(address))
}

/// Serve `router` on an ephemeral loopback port; returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn test_http_client() -> reqwest::Client {
    crate::upstream::http_client(Duration::from_secs(5)).unwrap()
}

pub fn sample(latitude: f64, longitude: f64, timestamp: &str) -> LocationSample {
    LocationSample {
        latitude,
        longitude,
        timestamp: DateTime::parse_from_rfc3339(timestamp)
            .unwrap()
            .with_timezone(&Utc),
    }
}

// =============================================================================
// Fakes
// =============================================================================

pub struct FakeIdentityProvider {
    challenge: Challenge,
    access_token: String,
    fail_submit: bool,
    calls: AtomicUsize,
    addresses: Mutex<Vec<String>>,
}

impl Default for FakeIdentityProvider {
    fn default() -> Self {
        Self {
            challenge: Challenge {
                state: "s1".to_string(),
                challenge: "c1".to_string(),
            },
            access_token: "upstream-token".to_string(),
            fail_submit: false,
            calls: AtomicUsize::new(0),
            addresses: Mutex::default(),
        }
    }
}

impl FakeIdentityProvider {
    pub fn with_challenge(mut self, state: &str, challenge: &str) -> Self {
        self.challenge = Challenge {
            state: state.to_string(),
            challenge: challenge.to_string(),
        };
        self
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = token.to_string();
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn challenged_addresses(&self) -> Vec<String> {
        self.addresses.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn generate_challenge(&self, address: &str) -> Result<Challenge, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.addresses.lock().unwrap().push(address.to_string());
        Ok(self.challenge.clone())
    }

    async fn submit_challenge(&self, state: &str, _signature: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit || state != self.challenge.state {
            return Err(ServiceError::malformed("identity provider", "HTTP 400 Bad Request"));
        }
        Ok(self.access_token.clone())
    }
}

#[derive(Default)]
pub struct FakeVehicleDirectory {
    by_owner: HashMap<String, Vec<Vehicle>>,
    owners: Mutex<Vec<String>>,
}

impl FakeVehicleDirectory {
    pub fn with_vehicles(mut self, owner: &str, vehicles: Vec<Vehicle>) -> Self {
        self.by_owner.insert(owner.to_string(), vehicles);
        self
    }

    /// Owners queried so far, in call order.
    pub fn owners(&self) -> Vec<String> {
        self.owners.lock().unwrap().clone()
    }
}

#[async_trait]
impl VehicleDirectory for FakeVehicleDirectory {
    async fn vehicles_owned_by(&self, owner: &str) -> Result<Vec<Vehicle>, ServiceError> {
        self.owners.lock().unwrap().push(owner.to_string());
        Ok(self.by_owner.get(owner).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeTelemetry {
    trips: Vec<Trip>,
    history: Vec<LocationSample>,
    history_error: bool,
    calls: AtomicUsize,
    last_bearer: Mutex<Option<String>>,
    last_history: Mutex<Option<(u64, TripWindow)>>,
}

impl FakeTelemetry {
    pub fn with_trips(mut self, trips: Vec<Trip>) -> Self {
        self.trips = trips;
        self
    }

    pub fn with_history(mut self, history: Vec<LocationSample>) -> Self {
        self.history = history;
        self
    }

    pub fn with_history_error(mut self) -> Self {
        self.history_error = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_bearer(&self) -> Option<String> {
        self.last_bearer.lock().unwrap().clone()
    }

    pub fn last_history_request(&self) -> Option<(u64, TripWindow)> {
        *self.last_history.lock().unwrap()
    }

    fn record(&self, privilege_token: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_bearer.lock().unwrap() = Some(privilege_token.to_string());
    }
}

#[async_trait]
impl TelemetrySource for FakeTelemetry {
    async fn trips(&self, _token_id: u64, privilege_token: &str) -> Result<Vec<Trip>, ServiceError> {
        self.record(privilege_token);
        Ok(self.trips.clone())
    }

    async fn history(
        &self,
        token_id: u64,
        window: &TripWindow,
        privilege_token: &str,
    ) -> Result<Vec<LocationSample>, ServiceError> {
        self.record(privilege_token);
        *self.last_history.lock().unwrap() = Some((token_id, *window));
        if self.history_error {
            return Err(ServiceError::malformed(
                "device data service",
                "missing field `latitude`",
            ));
        }
        Ok(self.history.clone())
    }
}

// =============================================================================
// Application state
// =============================================================================

/// Builder for an [`AppState`] wired to fakes.
///
/// The fakes stay reachable through the public fields after `into_state`.
pub struct TestState {
    pub provider: Arc<FakeIdentityProvider>,
    pub vehicles: Arc<FakeVehicleDirectory>,
    pub telemetry: Arc<FakeTelemetry>,
}

impl Default for TestState {
    fn default() -> Self {
        Self::new()
    }
}

impl TestState {
    pub fn new() -> Self {
        Self {
            provider: Arc::new(FakeIdentityProvider::default()),
            vehicles: Arc::new(FakeVehicleDirectory::default()),
            telemetry: Arc::new(FakeTelemetry::default()),
        }
    }

    pub fn with_provider(mut self, provider: FakeIdentityProvider) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn with_vehicles(mut self, vehicles: FakeVehicleDirectory) -> Self {
        self.vehicles = Arc::new(vehicles);
        self
    }

    pub fn with_telemetry(mut self, telemetry: FakeTelemetry) -> Self {
        self.telemetry = Arc::new(telemetry);
        self
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            Upstreams {
                identity_provider: self.provider.clone(),
                vehicles: self.vehicles.clone(),
                telemetry: self.telemetry.clone(),
            },
            test_verifier(),
            CookieSettings {
                domain: None,
                secure: false,
            },
        )
    }

    pub fn into_state(self) -> AppState {
        self.state()
    }
}
