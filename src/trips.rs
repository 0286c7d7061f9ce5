// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Trip Aggregator
//!
//! Lists a vehicle's trips, remembers which vehicle each trip belongs to, and
//! turns a trip's telemetry into a time-ordered GeoJSON path.
//!
//! ## Trip index
//!
//! A trip can only be mapped after it has been listed: the map request names
//! the trip alone, and the index supplies the owning vehicle. Entries are
//! scoped to the session that listed them and expire with it, so the index is
//! bounded and one user's trip ids never resolve for another.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::cache::{ExpiringCache, Purge};
use crate::error::ServiceError;
use crate::models::{
    Feature, FeatureCollection, LineString, LocationSample, PathProperties, Trip, TripWindow,
    FEATURE_COLLECTION_TYPE, FEATURE_TYPE, LINE_STRING_TYPE,
};
use crate::session::{Session, SessionId, SESSION_TTL};
use crate::upstream::TelemetrySource;

const TRIP_INDEX_CAPACITY: usize = 50_000;

const PATH_COLOR: &str = "black";
const PRIVACY_ZONE: u8 = 1;

/// What the index remembers about a listed trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedTrip {
    pub vehicle_token_id: u64,
    pub window: TripWindow,
}

/// Session-scoped `trip id → vehicle` mapping.
#[derive(Clone)]
pub struct TripIndex {
    cache: Arc<ExpiringCache<IndexedTrip>>,
}

impl Default for TripIndex {
    fn default() -> Self {
        Self::new(TRIP_INDEX_CAPACITY, SESSION_TTL)
    }
}

impl TripIndex {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Arc::new(ExpiringCache::new(capacity, ttl)),
        }
    }

    fn key(session: &SessionId, trip_id: &str) -> String {
        format!("{session}:{trip_id}")
    }

    /// Record `trip` as belonging to `vehicle_token_id`. Last write wins.
    pub fn record(&self, session: &SessionId, vehicle_token_id: u64, trip: &Trip) {
        self.cache.insert(
            Self::key(session, &trip.id),
            IndexedTrip {
                vehicle_token_id,
                window: TripWindow {
                    start: trip.start,
                    end: trip.end,
                },
            },
        );
    }

    pub fn resolve(&self, session: &SessionId, trip_id: &str) -> Option<IndexedTrip> {
        self.cache.get(&Self::key(session, trip_id))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn purgeable(&self) -> Arc<dyn Purge> {
        self.cache.clone()
    }
}

/// Requested bounds for a trip map; either may be left to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestedWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RequestedWindow {
    /// Parse optional RFC 3339 bounds from the query string.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ServiceError> {
        Ok(Self {
            start: parse_bound("start", start)?,
            end: parse_bound("end", end)?,
        })
    }

    fn resolve(self, indexed: &TripWindow) -> Result<TripWindow, ServiceError> {
        let window = TripWindow {
            start: self.start.unwrap_or(indexed.start),
            end: self.end.unwrap_or(indexed.end),
        };
        if window.end < window.start {
            return Err(ServiceError::Validation(
                "end must not be before start".to_string(),
            ));
        }
        Ok(window)
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| ServiceError::Validation(format!("{name} must be an RFC 3339 timestamp"))),
    }
}

/// Stable ascending sort by sample instant.
///
/// Samples sharing a timestamp keep their arrival order.
pub fn sort_samples(samples: &mut [LocationSample]) {
    samples.sort_by_key(|sample| sample.timestamp);
}

/// Wrap time-ordered samples into a one-feature collection.
pub fn build_trip_path(trip_id: &str, window: &TripWindow, samples: &[LocationSample]) -> FeatureCollection {
    let coordinates = samples
        .iter()
        .map(|sample| [sample.longitude, sample.latitude])
        .collect();

    FeatureCollection {
        kind: FEATURE_COLLECTION_TYPE.to_string(),
        features: vec![Feature {
            kind: FEATURE_TYPE.to_string(),
            geometry: LineString {
                kind: LINE_STRING_TYPE.to_string(),
                coordinates,
            },
            properties: PathProperties {
                trip_id: trip_id.to_string(),
                trip_start: TripWindow::format_bound(&window.start),
                trip_end: TripWindow::format_bound(&window.end),
                privacy_zone: PRIVACY_ZONE,
                color: PATH_COLOR.to_string(),
                point_color: PATH_COLOR.to_string(),
            },
        }],
    }
}

/// Trip listing and path rendering for a logged-in session.
#[derive(Clone)]
pub struct TripAggregator {
    telemetry: Arc<dyn TelemetrySource>,
    index: TripIndex,
}

impl TripAggregator {
    pub fn new(telemetry: Arc<dyn TelemetrySource>, index: TripIndex) -> Self {
        Self { telemetry, index }
    }

    pub fn index(&self) -> &TripIndex {
        &self.index
    }

    /// Fetch the vehicle's trips and index each one under the session.
    pub async fn list_trips(&self, session: &Session, vehicle_token_id: u64) -> Result<Vec<Trip>, ServiceError> {
        let trips = self
            .telemetry
            .trips(vehicle_token_id, &session.privilege_token)
            .await?;

        for trip in &trips {
            self.index.record(&session.id, vehicle_token_id, trip);
        }

        info!(
            vehicle_token_id,
            count = trips.len(),
            "Listed trips"
        );
        Ok(trips)
    }

    /// Render the path of a previously listed trip.
    pub async fn trip_path(
        &self,
        session: &Session,
        trip_id: &str,
        requested: RequestedWindow,
    ) -> Result<FeatureCollection, ServiceError> {
        let indexed = self
            .index
            .resolve(&session.id, trip_id)
            .ok_or_else(|| ServiceError::NotFound("Trip not found".to_string()))?;
        let window = requested.resolve(&indexed.window)?;

        let mut samples = self
            .telemetry
            .history(indexed.vehicle_token_id, &window, &session.privilege_token)
            .await?;
        sort_samples(&mut samples);

        info!(
            trip_id = %trip_id,
            vehicle_token_id = indexed.vehicle_token_id,
            points = samples.len(),
            "Built trip path"
        );
        Ok(build_trip_path(trip_id, &window, &samples))
    }
}
