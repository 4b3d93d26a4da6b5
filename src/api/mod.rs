// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    envelope::EnvelopeSchema,
    error::ApiError,
    models::{
        auth::{
            ChangePasswordRequest, DeleteUserRequest, ForgotPasswordRequest, LoginRequest,
            LogoutRequest, RegisterStaffRequest, ResetPasswordRequest, UpdateUserRequest,
            VerifyResetTokenRequest,
        },
        offices::{Branch, BranchesResponse, Unit, UnitsResponse},
        rbac::{PermissionItem, PermissionToRoleRequest, RbacItem, RbacItemRequest, RoleWithPermissions},
    },
    state::AppState,
};

pub mod auth;
pub mod extract;
pub mod health;
pub mod offices;
pub mod rbac;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PUBLIC_PREFIX: &str = "/api/public/v1";
pub const PRIVATE_PREFIX: &str = "/api/private/v1";

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/change-temp-password", post(auth::change_temp_password))
        .route("/delete-user", post(auth::delete_user))
        .route("/update-user/{username}", post(auth::update_user))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/verify-reset-token", post(auth::verify_reset_token))
        .route("/reset-password", post(auth::reset_password))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .nest("/auth", auth_routes())
        .nest("/rbac", rbac::routes(state.clone()))
        .nest("/offices", offices::routes(state.clone()));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route(PUBLIC_PREFIX, get(health::health))
        .route(&format!("{PUBLIC_PREFIX}/"), get(health::health))
        .route(PRIVATE_PREFIX, get(health::health))
        .route(&format!("{PRIVATE_PREFIX}/"), get(health::health))
        .nest(PUBLIC_PREFIX, public)
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register,
        auth::login,
        auth::logout,
        auth::change_temp_password,
        auth::delete_user,
        auth::update_user,
        auth::forgot_password,
        auth::verify_reset_token,
        auth::reset_password,
        rbac::list_roles,
        rbac::assign_user_role,
        rbac::create_action,
        rbac::list_actions,
        rbac::update_action,
        rbac::delete_action,
        rbac::create_resource,
        rbac::list_resources,
        rbac::update_resource,
        rbac::delete_resource,
        rbac::assign_role_permission,
        rbac::all_role_permissions,
        rbac::role_permissions,
        rbac::remove_role_permission,
        offices::branches,
        offices::units
    ),
    components(
        schemas(
            EnvelopeSchema,
            health::HealthChecks,
            RegisterStaffRequest,
            LoginRequest,
            LogoutRequest,
            ChangePasswordRequest,
            DeleteUserRequest,
            UpdateUserRequest,
            ForgotPasswordRequest,
            VerifyResetTokenRequest,
            ResetPasswordRequest,
            RbacItem,
            RbacItemRequest,
            PermissionToRoleRequest,
            PermissionItem,
            RoleWithPermissions,
            Branch,
            BranchesResponse,
            Unit,
            UnitsResponse
        )
    ),
    tags(
        (name = "Health", description = "Service and database status"),
        (name = "Auth", description = "Staff identity delegated to the identity service"),
        (name = "RBAC", description = "Roles, actions, resources and role permissions"),
        (name = "Offices", description = "Branch and unit lookups")
    )
)]
pub struct ApiDoc;
