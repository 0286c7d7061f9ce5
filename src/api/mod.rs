// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::require_address,
    error::{ErrorBody, ServiceError},
    models::{
        AftermarketDevice, Challenge, Feature, FeatureCollection, GenerateChallengeForm,
        LineString, LogoutResponse, PathProperties, SessionEstablished, SubmitChallengeForm, Trip,
        TripListResponse, Vehicle, VehicleListResponse,
    },
    session::SESSION_COOKIE_NAME,
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod trips;
pub mod vehicles;

/// CORS for the browser front end: one origin, cookies allowed.
pub fn cors_layer(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

async fn route_not_found() -> ServiceError {
    ServiceError::NotFound("Route not found".to_string())
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let gated = Router::new()
        .route("/api/vehicles/me", get(vehicles::my_vehicles))
        .route_layer(from_fn_with_state(state.clone(), require_address));

    let routes = Router::new()
        .route("/auth/web3/generate_challenge", post(auth::generate_challenge))
        .route("/auth/web3/submit_challenge", post(auth::submit_challenge))
        .route("/auth/session", post(auth::establish_session))
        .route("/auth/logout", post(auth::logout))
        .route("/api/vehicles/{token_id}/trips", get(trips::list_trips))
        .route("/api/trips/{trip_id}/map", get(trips::trip_map))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(gated)
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
}

#[cfg(test)]
pub(crate) fn test_router(state: AppState) -> Router {
    router(state, cors_layer(HeaderValue::from_static("http://localhost:3000")))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE_NAME))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::generate_challenge,
        auth::submit_challenge,
        auth::establish_session,
        auth::logout,
        vehicles::my_vehicles,
        trips::list_trips,
        trips::trip_map,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Challenge,
            GenerateChallengeForm,
            SubmitChallengeForm,
            SessionEstablished,
            LogoutResponse,
            Vehicle,
            AftermarketDevice,
            VehicleListResponse,
            Trip,
            TripListResponse,
            FeatureCollection,
            Feature,
            LineString,
            PathProperties,
            ErrorBody,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Wallet challenge login and sessions"),
        (name = "Vehicles", description = "Vehicles owned by the caller"),
        (name = "Trips", description = "Trip listing and path rendering"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
