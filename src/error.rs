// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service error taxonomy and its HTTP mapping.
//!
//! Every component returns a single [`ServiceError`]. The detailed cause is
//! logged; the client only ever sees the public message.

use axum::{
    extract::rejection::{FormRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport or connection failure talking to an external service.
    #[error("{service} is unavailable: {detail}")]
    UpstreamUnavailable {
        service: &'static str,
        detail: String,
    },

    /// Undecodable body, non-success status or missing required fields.
    #[error("{service} returned a malformed response: {detail}")]
    MalformedUpstreamResponse {
        service: &'static str,
        detail: String,
    },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),
}

impl ServiceError {
    pub fn unavailable(service: &'static str, detail: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            service,
            detail: detail.to_string(),
        }
    }

    pub fn malformed(service: &'static str, detail: impl ToString) -> Self {
        Self::MalformedUpstreamResponse {
            service,
            detail: detail.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UpstreamUnavailable { .. }
            | ServiceError::MalformedUpstreamResponse { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the client. Upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::UpstreamUnavailable { service, .. } => {
                format!("Failed to reach {service}")
            }
            ServiceError::MalformedUpstreamResponse { service, .. } => {
                format!("Unexpected response from {service}")
            }
            ServiceError::Unauthenticated(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::Validation(msg) => msg.clone(),
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Always `true`.
    pub error: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

// Extractor rejections answer with the JSON error body like every other failure.
impl From<FormRejection> for ServiceError {
    fn from(rejection: FormRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Upstream request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(ErrorBody::new(self.public_message()))).into_response()
    }
}
