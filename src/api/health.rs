// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

use axum::{extract::State, http::StatusCode};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    codes,
    envelope::{ApiResponse, EnvelopeSchema},
    state::AppState,
};

/// Component status carried in the health envelope's `data`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Always "ok" while the process answers.
    pub service: String,
    /// "ok" or "unavailable".
    pub database: String,
}

/// Health check endpoint handler.
///
/// Mounted at the root of both API groups. Returns 503 when the database
/// does not answer `SELECT 1`.
#[utoipa::path(
    get,
    path = "/api/public/v1/",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = EnvelopeSchema),
        (status = 503, description = "Database unreachable", body = EnvelopeSchema)
    )
)]
pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthChecks> {
    let database_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "database ping failed");
            false
        }
    };

    let checks = HealthChecks {
        service: "ok".to_string(),
        database: if database_ok { "ok" } else { "unavailable" }.to_string(),
    };

    if database_ok {
        ApiResponse::ok(codes::OK, "Service is healthy", checks)
    } else {
        ApiResponse::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::SERVICE_UNAVAILABLE,
            "Service is degraded",
            Some(checks),
        )
    }
}
