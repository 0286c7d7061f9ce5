// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::Caller,
    error::{ErrorBody, ServiceError},
    models::VehicleListResponse,
    state::AppState,
};

/// List the vehicles owned by the verified caller.
///
/// The owner is always the address from the verified credential; there is no
/// way to ask for someone else's vehicles.
#[utoipa::path(
    get,
    path = "/api/vehicles/me",
    tag = "Vehicles",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    responses(
        (status = 200, description = "Vehicles owned by the caller", body = VehicleListResponse),
        (status = 401, description = "Unauthenticated"),
        (status = 502, description = "Identity API failed", body = ErrorBody)
    )
)]
pub async fn my_vehicles(
    Caller(caller): Caller,
    State(state): State<AppState>,
) -> Result<Json<VehicleListResponse>, ServiceError> {
    let vehicles = state.vehicles.vehicles_owned_by(&caller.address).await?;
    Ok(Json(VehicleListResponse {
        owner: caller.address,
        vehicles,
    }))
}
