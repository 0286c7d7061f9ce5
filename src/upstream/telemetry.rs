// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trip listing and device-data history services.
//!
//! The history endpoint answers with a search-engine style hits array. Each
//! hit is decoded through the explicit schema below; a hit missing any of
//! `latitude`, `longitude` or `timestamp` fails the whole response.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{decode_json, endpoint, send, TelemetrySource};
use crate::error::ServiceError;
use crate::models::{LocationSample, Trip, TripWindow};

const TRIPS_SERVICE: &str = "trips service";
const HISTORY_SERVICE: &str = "device data service";

#[derive(Debug, Deserialize)]
struct TripsResponse {
    trips: Vec<TripNode>,
}

#[derive(Debug, Deserialize)]
struct TripNode {
    id: String,
    start: TimeEntry,
    end: TimeEntry,
}

#[derive(Debug, Deserialize)]
struct TimeEntry {
    time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Deserialize)]
struct HitSource {
    data: SampleData,
}

#[derive(Debug, Deserialize)]
struct SampleData {
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
}

impl From<Hit> for LocationSample {
    fn from(hit: Hit) -> Self {
        let data = hit.source.data;
        LocationSample {
            latitude: data.latitude,
            longitude: data.longitude,
            timestamp: data.timestamp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryClient {
    trips_base_url: Url,
    history_base_url: Url,
    http: Client,
}

impl TelemetryClient {
    pub fn new(trips_base_url: Url, history_base_url: Url, http: Client) -> Self {
        Self {
            trips_base_url,
            history_base_url,
            http,
        }
    }
}

#[async_trait]
impl TelemetrySource for TelemetryClient {
    async fn trips(&self, token_id: u64, privilege_token: &str) -> Result<Vec<Trip>, ServiceError> {
        let url = endpoint(&self.trips_base_url, &format!("vehicle/{token_id}/trips"));
        let response = send(
            TRIPS_SERVICE,
            self.http.get(url).bearer_auth(privilege_token),
        )
        .await?;

        let payload: TripsResponse = decode_json(TRIPS_SERVICE, response).await?;
        debug!(token_id, count = payload.trips.len(), "Fetched trips");

        Ok(payload
            .trips
            .into_iter()
            .map(|trip| Trip {
                id: trip.id,
                start: trip.start.time,
                end: trip.end.time,
            })
            .collect())
    }

    async fn history(
        &self,
        token_id: u64,
        window: &TripWindow,
        privilege_token: &str,
    ) -> Result<Vec<LocationSample>, ServiceError> {
        let url = endpoint(&self.history_base_url, &format!("vehicle/{token_id}/history"));
        let query = [
            ("startDate", TripWindow::format_bound(&window.start)),
            ("endDate", TripWindow::format_bound(&window.end)),
        ];
        let response = send(
            HISTORY_SERVICE,
            self.http
                .get(url)
                .query(&query)
                .bearer_auth(privilege_token),
        )
        .await?;

        let payload: HistoryResponse = decode_json(HISTORY_SERVICE, response).await?;
        debug!(token_id, hits = payload.hits.hits.len(), "Fetched telemetry history");

        Ok(payload
            .hits
            .hits
            .into_iter()
            .map(LocationSample::from)
            .collect())
    }
}
