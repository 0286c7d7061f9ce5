// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization gate middleware.
//!
//! Applied with `route_layer` to the routes that need a verified address:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/vehicles/me", get(my_vehicles))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_address));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::find_credential;
use crate::state::AppState;

/// Verify the caller's credential and expose the address downstream.
///
/// Fails closed: on any error the request is answered with `401` and the
/// inner handler never runs.
pub async fn require_address(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match find_credential(request.headers(), &state.sessions) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    match state.verifier.verify(&token).await {
        Ok(caller) => {
            tracing::debug!(address = %caller.address, "Caller verified");
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
