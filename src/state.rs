// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tracing::info;

use crate::auth::{JwksManager, TokenVerifier};
use crate::authenticator::Authenticator;
use crate::cache::Purge;
use crate::config::{CookieSettings, Settings};
use crate::session::SessionStore;
use crate::trips::{TripAggregator, TripIndex};
use crate::upstream::{
    http_client, IdentityApiClient, IdentityProvider, IdentityProviderClient, TelemetryClient,
    TelemetrySource, VehicleDirectory,
};

/// Upstream services the handlers talk to.
pub struct Upstreams {
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub vehicles: Arc<dyn VehicleDirectory>,
    pub telemetry: Arc<dyn TelemetrySource>,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub verifier: Arc<TokenVerifier>,
    pub authenticator: Authenticator,
    pub vehicles: Arc<dyn VehicleDirectory>,
    pub trips: TripAggregator,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn new(upstreams: Upstreams, verifier: TokenVerifier, cookie: CookieSettings) -> Self {
        let sessions = SessionStore::default();
        let verifier = Arc::new(verifier);
        Self {
            authenticator: Authenticator::new(
                upstreams.identity_provider,
                verifier.clone(),
                sessions.clone(),
            ),
            trips: TripAggregator::new(upstreams.telemetry, TripIndex::default()),
            vehicles: upstreams.vehicles,
            sessions,
            verifier,
            cookie,
        }
    }

    /// Wire the real upstream clients from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let http = http_client(settings.upstream_timeout)?;

        let jwks = JwksManager::new(settings.jwt.jwks_url.as_str(), http.clone());
        let verifier = TokenVerifier::new(jwks)
            .with_issuer(settings.jwt.issuer.clone())
            .with_audience(settings.jwt.audience.clone());

        let upstreams = Upstreams {
            identity_provider: Arc::new(IdentityProviderClient::new(
                settings.identity_provider.clone(),
                http.clone(),
            )),
            vehicles: Arc::new(IdentityApiClient::new(
                settings.identity_api_url.clone(),
                http.clone(),
            )),
            telemetry: Arc::new(TelemetryClient::new(
                settings.trips_api_base_url.clone(),
                settings.device_data_api_base_url.clone(),
                http,
            )),
        };

        Ok(Self::new(upstreams, verifier, settings.cookie.clone()))
    }

    /// Caches to sweep, by name.
    pub fn caches(&self) -> Vec<(&'static str, Arc<dyn Purge>)> {
        vec![
            ("sessions", self.sessions.purgeable()),
            ("trip_index", self.trips.index().purgeable()),
        ]
    }

    /// Drop every cached session and trip mapping.
    pub fn flush(&self) {
        for (name, cache) in self.caches() {
            cache.flush();
            info!(cache = name, "Cache flushed");
        }
    }
}
