// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures shared by the HTTP layer and the upstream
//! clients. Every response type derives `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Handshake**: challenge issuance and signature submission
//! - **Vehicles**: projection of the identity service's vehicle node
//! - **Trips**: trip summaries, raw location samples and the rendered path

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// =============================================================================
// Handshake
// =============================================================================

/// Opaque challenge issued by the identity provider.
///
/// Relayed to the browser untouched; the wallet signs `challenge` and the
/// browser returns `state` alongside the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Challenge {
    pub state: String,
    pub challenge: String,
}

/// Form body of `POST /auth/web3/generate_challenge`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateChallengeForm {
    /// Wallet address that will sign the challenge.
    #[serde(default)]
    pub address: String,
}

/// Form body of `POST /auth/web3/submit_challenge`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubmitChallengeForm {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub signature: String,
}

/// Acknowledgment returned once a session has been established.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionEstablished {
    pub message: String,
    /// Seconds until the session expires.
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

// =============================================================================
// Vehicles
// =============================================================================

/// A vehicle owned by the authenticated address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vehicle {
    /// Vehicle NFT token id.
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Total tokens earned by the vehicle, as reported upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aftermarket_device: Option<AftermarketDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AftermarketDevice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VehicleListResponse {
    /// Owner address the list was resolved for.
    pub owner: String,
    pub vehicles: Vec<Vehicle>,
}

// =============================================================================
// Trips
// =============================================================================

/// Trip summary as listed for one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Trip {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TripListResponse {
    pub vehicle_token_id: u64,
    pub trips: Vec<Trip>,
}

/// Query string of `GET /api/trips/{trip_id}/map`.
///
/// Both bounds are RFC 3339 timestamps. When omitted they default to the
/// window recorded when the trip was listed.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TripMapQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Closed time window a telemetry query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TripWindow {
    /// Canonical wire form of a bound, e.g. `2024-01-01T00:00:00Z`.
    pub fn format_bound(instant: &DateTime<Utc>) -> String {
        instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

/// One raw telemetry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Path rendering (GeoJSON)
// =============================================================================

pub const FEATURE_COLLECTION_TYPE: &str = "FeatureCollection";
pub const FEATURE_TYPE: &str = "Feature";
pub const LINE_STRING_TYPE: &str = "LineString";

/// GeoJSON feature collection holding a single trip path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: LineString,
    pub properties: PathProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LineString {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]` pairs in time order.
    #[schema(value_type = Vec<Vec<f64>>)]
    pub coordinates: Vec<[f64; 2]>,
}

/// Descriptive properties attached to a trip path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PathProperties {
    pub trip_id: String,
    pub trip_start: String,
    pub trip_end: String,
    pub privacy_zone: u8,
    pub color: String,
    #[serde(rename = "point-color")]
    pub point_color: String,
}
