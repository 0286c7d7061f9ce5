// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trip endpoints.
//!
//! Both require a live session: the privilege token cached under the cookie
//! authenticates the calls to the telemetry services. Without one the request
//! is rejected before anything is sent upstream.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{ErrorBody, ServiceError},
    models::{FeatureCollection, TripListResponse, TripMapQuery},
    session::ActiveSession,
    state::AppState,
    trips::RequestedWindow,
};

/// List a vehicle's trips.
///
/// Every returned trip becomes mappable for the rest of the session.
#[utoipa::path(
    get,
    path = "/api/vehicles/{token_id}/trips",
    tag = "Trips",
    security(("session_cookie" = [])),
    params(("token_id" = u64, Path, description = "Vehicle token id")),
    responses(
        (status = 200, description = "Trips of the vehicle", body = TripListResponse),
        (status = 400, description = "Invalid token id", body = ErrorBody),
        (status = 401, description = "No live session", body = ErrorBody),
        (status = 502, description = "Trips service failed", body = ErrorBody)
    )
)]
pub async fn list_trips(
    ActiveSession(session): ActiveSession,
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> Result<Json<TripListResponse>, ServiceError> {
    let vehicle_token_id: u64 = token_id
        .parse()
        .map_err(|_| ServiceError::Validation("token_id must be an unsigned integer".to_string()))?;

    let trips = state.trips.list_trips(&session, vehicle_token_id).await?;
    Ok(Json(TripListResponse {
        vehicle_token_id,
        trips,
    }))
}

/// Render a listed trip as a GeoJSON path.
#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/map",
    tag = "Trips",
    security(("session_cookie" = [])),
    params(("trip_id" = String, Path, description = "Trip id"), TripMapQuery),
    responses(
        (status = 200, description = "Time-ordered trip path", body = FeatureCollection),
        (status = 400, description = "Invalid time window", body = ErrorBody),
        (status = 401, description = "No live session", body = ErrorBody),
        (status = 404, description = "Trip not listed in this session", body = ErrorBody),
        (status = 502, description = "Device data service failed", body = ErrorBody)
    )
)]
pub async fn trip_map(
    ActiveSession(session): ActiveSession,
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<TripMapQuery>, ServiceError>,
) -> Result<Json<FeatureCollection>, ServiceError> {
    let requested = RequestedWindow::parse(query.start.as_deref(), query.end.as_deref())?;
    let path = state.trips.trip_path(&session, &trip_id, requested).await?;
    Ok(Json(path))
}
