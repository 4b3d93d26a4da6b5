// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Branch and unit lookups. Auth gate only, no permission check.

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::error;
use utoipa::IntoParams;

use super::extract::AppQuery;
use crate::{
    auth::auth_gate,
    codes,
    envelope::{ApiResponse, EnvelopeSchema},
    error::ApiError,
    models::offices::{BranchesResponse, UnitsResponse},
    state::AppState,
    storage::StorageError,
};

/// Longest institution or branch code accepted.
pub const MAX_CODE_LEN: usize = 20;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct BranchQuery {
    /// Institution code.
    pub insti_code: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct UnitQuery {
    pub branch_code: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/branches", get(branches))
        .route("/units", get(units))
        .route_layer(from_fn_with_state(state, auth_gate))
}

fn required_code<'a>(
    raw: &'a str,
    missing: &'static str,
    too_long: &'static str,
) -> Result<&'a str, ApiError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(ApiError::validation(missing));
    }
    if code.chars().count() > MAX_CODE_LEN {
        return Err(ApiError::validation(too_long));
    }
    Ok(code)
}

#[utoipa::path(
    get,
    path = "/api/public/v1/offices/branches",
    params(BranchQuery),
    tag = "Offices",
    responses(
        (status = 200, description = "`{branches: [...]}`", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 401, body = EnvelopeSchema)
    )
)]
pub async fn branches(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<BranchQuery>,
) -> Result<ApiResponse<BranchesResponse>, ApiError> {
    let code = required_code(
        &query.insti_code,
        "Institution code is required.",
        "Institution code is too long.",
    )?;
    let branches = state.store.branches(code).await.map_err(|e| {
        error!(error = %e, institution_code = code, "failed to fetch branches");
        ApiError::internal(codes::INTERNAL, "Failed to fetch branches.")
    })?;
    let message = if branches.is_empty() {
        "No branches found."
    } else {
        "Branches fetched successfully!"
    };
    Ok(ApiResponse::ok(codes::OK, message, BranchesResponse { branches }))
}

#[utoipa::path(
    get,
    path = "/api/public/v1/offices/units",
    params(UnitQuery),
    tag = "Offices",
    responses(
        (status = 200, description = "`{units: [...]}`", body = EnvelopeSchema),
        (status = 400, description = "Missing, oversized, or unknown branch code", body = EnvelopeSchema)
    )
)]
pub async fn units(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UnitQuery>,
) -> Result<ApiResponse<UnitsResponse>, ApiError> {
    let code = required_code(
        &query.branch_code,
        "Branch code is required.",
        "Branch code is too long.",
    )?;
    let units = match state.store.units(code).await {
        Ok(units) => units,
        Err(StorageError::InvalidInput(_)) => {
            return Err(ApiError::validation("Invalid branch code."));
        }
        Err(e) => {
            error!(error = %e, branch_code = code, "failed to fetch units");
            return Err(ApiError::internal(codes::INTERNAL, "Failed to fetch units."));
        }
    };
    let message = if units.is_empty() {
        "No units found."
    } else {
        "Units fetched successfully!"
    };
    Ok(ApiResponse::ok(codes::OK, message, UnitsResponse { units }))
}
