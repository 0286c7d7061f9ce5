// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vehicle Trips Server - wallet-authenticated vehicle telemetry service
//!
//! Browsers log in by signing an identity-provider challenge with their
//! wallet, then list the vehicles they own and render trips as GeoJSON paths.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token verification (JWKS) and the authorization gate
//! - `authenticator` - Challenge/response login
//! - `cache` - Bounded expiring cache behind sessions and the trip index
//! - `session` - Server-side sessions and the `session_id` cookie
//! - `trips` - Trip index, telemetry ordering and path building
//! - `upstream` - Clients for the identity provider, identity API and telemetry services

pub mod api;
pub mod auth;
pub mod authenticator;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod state;
pub mod sweeper;
pub mod trips;
pub mod upstream;

#[cfg(test)]
mod test_support;
