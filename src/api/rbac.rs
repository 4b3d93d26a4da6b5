// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Role, action, resource and role-permission management.
//!
//! Every route sits behind the auth gate and one permission check; see
//! [`routes`] for the permission each route requires.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use tracing::{error, info};

use super::extract::{parse_id, AppJson, AppPath};
use crate::{
    auth::{auth_gate, require_permission, Auth, RequiredPermission},
    codes,
    envelope::{ApiResponse, EnvelopeSchema},
    error::ApiError,
    models::rbac::{PermissionToRoleRequest, RbacItem, RbacItemRequest, RoleWithPermissions},
    state::AppState,
    storage::{CatalogKind, StorageError},
};

/// Permission strings checked by the RBAC routes.
pub mod permission {
    pub const VIEW_ROLE: &str = "view:role";
    pub const UPDATE_ROLE: &str = "update:role";
    pub const CREATE_ACTION: &str = "create:action";
    pub const VIEW_ACTION: &str = "view:action";
    pub const UPDATE_ACTION: &str = "update:action";
    pub const DELETE_ACTION: &str = "delete:action";
    pub const CREATE_PERMISSION: &str = "create:permission";
    pub const VIEW_PERMISSION: &str = "view:permission";
    pub const DELETE_PERMISSION: &str = "delete:permission";
}

fn require(permission: &'static str, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(RequiredPermission(permission), require_permission))
}

/// `/rbac` routes. Resources are guarded by the action permissions.
pub fn routes(state: AppState) -> Router<AppState> {
    use permission::*;

    Router::new()
        .route("/roles", require(VIEW_ROLE, get(list_roles)))
        .route(
            "/users/{staff_id}/roles/{role_id}",
            require(UPDATE_ROLE, put(assign_user_role)),
        )
        .route(
            "/actions",
            require(CREATE_ACTION, post(create_action)).merge(require(VIEW_ACTION, get(list_actions))),
        )
        .route(
            "/actions/{id}",
            require(UPDATE_ACTION, put(update_action))
                .merge(require(DELETE_ACTION, delete(delete_action))),
        )
        .route(
            "/resources",
            require(CREATE_ACTION, post(create_resource))
                .merge(require(VIEW_ACTION, get(list_resources))),
        )
        .route(
            "/resources/{id}",
            require(UPDATE_ACTION, put(update_resource))
                .merge(require(DELETE_ACTION, delete(delete_resource))),
        )
        .route(
            "/roles/permissions",
            require(VIEW_PERMISSION, get(all_role_permissions)),
        )
        .route(
            "/roles/{role_id}/permissions",
            require(CREATE_PERMISSION, post(assign_role_permission))
                .merge(require(VIEW_PERMISSION, get(role_permissions)))
                .merge(require(DELETE_PERMISSION, delete(remove_role_permission))),
        )
        .route_layer(from_fn_with_state(state, auth_gate))
}

// =============================================================================
// Roles
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/public/v1/rbac/roles",
    tag = "RBAC",
    responses(
        (status = 200, description = "Roles, or code 204 when there are none", body = EnvelopeSchema),
        (status = 401, body = EnvelopeSchema),
        (status = 403, body = EnvelopeSchema)
    )
)]
pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<RbacItem>>, ApiError> {
    let roles = state.store.list_roles().await.map_err(|e| {
        error!(error = %e, "failed to list roles");
        ApiError::internal(codes::FETCH_FAILED, "Failed to fetch user roles.")
    })?;
    if roles.is_empty() {
        return Ok(ApiResponse::new(
            axum::http::StatusCode::OK,
            codes::NO_CONTENT,
            "No user roles found!",
            None,
        ));
    }
    Ok(ApiResponse::ok(codes::OK, "User roles fetched successfully", roles))
}

#[utoipa::path(
    put,
    path = "/api/public/v1/rbac/users/{staff_id}/roles/{role_id}",
    params(
        ("staff_id" = String, Path, description = "Staff identifier"),
        ("role_id" = i32, Path, description = "Role to assign")
    ),
    tag = "RBAC",
    responses(
        (status = 200, body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 404, description = "Unknown staff id or role", body = EnvelopeSchema)
    )
)]
pub async fn assign_user_role(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppPath((staff_id, role_id)): AppPath<(String, String)>,
) -> Result<ApiResponse<()>, ApiError> {
    let role_id = parse_id(&role_id, "Invalid role ID")?;
    let staff_id = staff_id.trim();
    if staff_id.is_empty() {
        return Err(ApiError::bad_request(codes::UNAUTHORIZED, "Missing staff_id or role_id."));
    }

    match state.store.assign_user_role(staff_id, role_id).await {
        Ok(()) => {
            info!(actor = %actor.username, staff_id, role_id, "role assigned");
            Ok(ApiResponse::message(codes::OK, "Role assigned to user successfully."))
        }
        Err(StorageError::NotFound(_)) => Err(ApiError::not_found("User not found.")),
        Err(StorageError::InUse(_)) => Err(ApiError::not_found("Role not found.")),
        Err(e) => {
            error!(error = %e, staff_id, role_id, "failed to assign role");
            Err(ApiError::internal(codes::INTERNAL, "Failed to assign role to user."))
        }
    }
}

// =============================================================================
// Actions and resources
// =============================================================================

struct CatalogText {
    name_required: &'static str,
    name_taken: &'static str,
    created: &'static str,
    create_failed: &'static str,
    fetched: &'static str,
    fetch_failed: &'static str,
    invalid_id: &'static str,
    not_found: &'static str,
    updated: &'static str,
    update_failed: &'static str,
    in_use: &'static str,
    deleted: &'static str,
    delete_failed: &'static str,
}

fn text(kind: CatalogKind) -> CatalogText {
    match kind {
        CatalogKind::Action => CatalogText {
            name_required: "Action name is required.",
            name_taken: "Action name already exists.",
            created: "Action created successfully!",
            create_failed: "Failed to create action.",
            fetched: "Actions fetched successfully!",
            fetch_failed: "Failed to fetch actions.",
            invalid_id: "Invalid action ID.",
            not_found: "Action not found.",
            updated: "Action updated successfully!",
            update_failed: "Failed to update action.",
            in_use: "Action is in use, can't be deleted.",
            deleted: "Action deleted successfully!",
            delete_failed: "Failed to delete action.",
        },
        CatalogKind::Resource => CatalogText {
            name_required: "Resource name is required.",
            name_taken: "Resource name taken.",
            created: "Resource created successfully!",
            create_failed: "Failed to create resource.",
            fetched: "Resources fetched successfully!",
            fetch_failed: "Failed to fetch resources.",
            invalid_id: "Invalid resource ID.",
            not_found: "Resource not found.",
            updated: "Resource updated successfully!",
            update_failed: "Failed to update resource.",
            in_use: "Resource is in use, can't be deleted.",
            deleted: "Resource deleted successfully!",
            delete_failed: "Internal server error while deleting resource",
        },
    }
}

type CatalogList = BTreeMap<&'static str, Vec<RbacItem>>;

async fn create_item(
    state: &AppState,
    actor: &str,
    kind: CatalogKind,
    request: RbacItemRequest,
) -> Result<ApiResponse<()>, ApiError> {
    let text = text(kind);
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation(text.name_required));
    }
    match state.store.create_catalog_item(kind, name, &request.description).await {
        Ok(()) => {
            info!(actor, kind = kind.label(), name, "catalog item created");
            Ok(ApiResponse::message(codes::CREATED, text.created))
        }
        Err(StorageError::NameTaken(_)) => Err(ApiError::conflict(text.name_taken)),
        Err(e) => {
            error!(error = %e, kind = kind.label(), "failed to create catalog item");
            Err(ApiError::internal(codes::INTERNAL, text.create_failed))
        }
    }
}

async fn list_items(state: &AppState, kind: CatalogKind) -> Result<ApiResponse<CatalogList>, ApiError> {
    let text = text(kind);
    let items = state.store.list_catalog(kind).await.map_err(|e| {
        error!(error = %e, kind = kind.label(), "failed to list catalog");
        ApiError::internal(codes::INTERNAL, text.fetch_failed)
    })?;
    Ok(ApiResponse::ok(codes::OK, text.fetched, BTreeMap::from([(kind.plural(), items)])))
}

async fn update_item(
    state: &AppState,
    actor: &str,
    kind: CatalogKind,
    raw_id: &str,
    request: RbacItemRequest,
) -> Result<ApiResponse<()>, ApiError> {
    let text = text(kind);
    let id = parse_id(raw_id, text.invalid_id)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation(text.name_required));
    }
    match state
        .store
        .update_catalog_item(kind, id, name, &request.description)
        .await
    {
        Ok(()) => {
            info!(actor, kind = kind.label(), id, "catalog item updated");
            Ok(ApiResponse::message(codes::OK, text.updated))
        }
        Err(StorageError::NotFound(_)) => Err(ApiError::not_found(text.not_found)),
        Err(StorageError::NameTaken(_)) => Err(ApiError::conflict(text.name_taken)),
        Err(e) => {
            error!(error = %e, kind = kind.label(), id, "failed to update catalog item");
            Err(ApiError::internal(codes::INTERNAL, text.update_failed))
        }
    }
}

async fn delete_item(
    state: &AppState,
    actor: &str,
    kind: CatalogKind,
    raw_id: &str,
) -> Result<ApiResponse<()>, ApiError> {
    let text = text(kind);
    let id = parse_id(raw_id, text.invalid_id)?;
    match state.store.delete_catalog_item(kind, id).await {
        Ok(()) => {
            info!(actor, kind = kind.label(), id, "catalog item deleted");
            Ok(ApiResponse::message(codes::OK, text.deleted))
        }
        Err(StorageError::NotFound(_)) => Err(ApiError::not_found(text.not_found)),
        Err(StorageError::InUse(_)) => Err(ApiError::in_use(text.in_use)),
        Err(e) => {
            error!(error = %e, kind = kind.label(), id, "failed to delete catalog item");
            Err(ApiError::internal(codes::INTERNAL, text.delete_failed))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/public/v1/rbac/actions",
    request_body = RbacItemRequest,
    tag = "RBAC",
    responses(
        (status = 200, description = "Created (code 201)", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 409, body = EnvelopeSchema)
    )
)]
pub async fn create_action(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppJson(request): AppJson<RbacItemRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    create_item(&state, &actor.username, CatalogKind::Action, request).await
}

#[utoipa::path(
    get,
    path = "/api/public/v1/rbac/actions",
    tag = "RBAC",
    responses((status = 200, description = "`{actions: [...]}`", body = EnvelopeSchema))
)]
pub async fn list_actions(
    State(state): State<AppState>,
) -> Result<ApiResponse<CatalogList>, ApiError> {
    list_items(&state, CatalogKind::Action).await
}

#[utoipa::path(
    put,
    path = "/api/public/v1/rbac/actions/{id}",
    params(("id" = i32, Path, description = "Action id")),
    request_body = RbacItemRequest,
    tag = "RBAC",
    responses(
        (status = 200, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema),
        (status = 409, body = EnvelopeSchema)
    )
)]
pub async fn update_action(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppPath(id): AppPath<String>,
    AppJson(request): AppJson<RbacItemRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    update_item(&state, &actor.username, CatalogKind::Action, &id, request).await
}

#[utoipa::path(
    delete,
    path = "/api/public/v1/rbac/actions/{id}",
    params(("id" = i32, Path, description = "Action id")),
    tag = "RBAC",
    responses(
        (status = 200, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema),
        (status = 409, description = "Still bound to a role", body = EnvelopeSchema)
    )
)]
pub async fn delete_action(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppPath(id): AppPath<String>,
) -> Result<ApiResponse<()>, ApiError> {
    delete_item(&state, &actor.username, CatalogKind::Action, &id).await
}

#[utoipa::path(
    post,
    path = "/api/public/v1/rbac/resources",
    request_body = RbacItemRequest,
    tag = "RBAC",
    responses(
        (status = 200, description = "Created (code 201)", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 409, body = EnvelopeSchema)
    )
)]
pub async fn create_resource(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppJson(request): AppJson<RbacItemRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    create_item(&state, &actor.username, CatalogKind::Resource, request).await
}

#[utoipa::path(
    get,
    path = "/api/public/v1/rbac/resources",
    tag = "RBAC",
    responses((status = 200, description = "`{resources: [...]}`", body = EnvelopeSchema))
)]
pub async fn list_resources(
    State(state): State<AppState>,
) -> Result<ApiResponse<CatalogList>, ApiError> {
    list_items(&state, CatalogKind::Resource).await
}

#[utoipa::path(
    put,
    path = "/api/public/v1/rbac/resources/{id}",
    params(("id" = i32, Path, description = "Resource id")),
    request_body = RbacItemRequest,
    tag = "RBAC",
    responses(
        (status = 200, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema),
        (status = 409, body = EnvelopeSchema)
    )
)]
pub async fn update_resource(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppPath(id): AppPath<String>,
    AppJson(request): AppJson<RbacItemRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    update_item(&state, &actor.username, CatalogKind::Resource, &id, request).await
}

#[utoipa::path(
    delete,
    path = "/api/public/v1/rbac/resources/{id}",
    params(("id" = i32, Path, description = "Resource id")),
    tag = "RBAC",
    responses(
        (status = 200, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema),
        (status = 409, body = EnvelopeSchema)
    )
)]
pub async fn delete_resource(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppPath(id): AppPath<String>,
) -> Result<ApiResponse<()>, ApiError> {
    delete_item(&state, &actor.username, CatalogKind::Resource, &id).await
}

// =============================================================================
// Role permissions
// =============================================================================

fn permission_pair(request: &PermissionToRoleRequest) -> Result<(&str, &str), ApiError> {
    let action = request.action.trim();
    let resource = request.resource.trim();
    if action.is_empty() || resource.is_empty() {
        return Err(ApiError::validation("Missing required fields."));
    }
    Ok((action, resource))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/rbac/roles/{role_id}/permissions",
    params(("role_id" = i32, Path, description = "Role id")),
    request_body = PermissionToRoleRequest,
    tag = "RBAC",
    responses(
        (status = 200, body = EnvelopeSchema),
        (status = 400, description = "Rejected by the binding function", body = EnvelopeSchema)
    )
)]
pub async fn assign_role_permission(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppPath(role_id): AppPath<String>,
    AppJson(request): AppJson<PermissionToRoleRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let role_id = parse_id(&role_id, "Invalid role ID")?;
    let (action, resource) = permission_pair(&request)?;

    let result = state
        .store
        .assign_role_permission(role_id, action, resource)
        .await
        .map_err(|e| {
            error!(error = %e, role_id, action, resource, "assign_role_permission failed");
            ApiError::internal(codes::INTERNAL, "Failed to assign permission to role.")
        })?;
    if !result.success {
        return Err(ApiError::validation(result.message));
    }
    info!(actor = %actor.username, role_id, permission = %result.formatted_permission, "permission granted");
    Ok(ApiResponse::message(codes::OK, result.message))
}

#[utoipa::path(
    get,
    path = "/api/public/v1/rbac/roles/permissions",
    tag = "RBAC",
    responses((status = 200, description = "Permissions grouped by role", body = EnvelopeSchema))
)]
pub async fn all_role_permissions(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<RoleWithPermissions>>, ApiError> {
    let grouped = state.store.all_role_permissions().await.map_err(|e| {
        error!(error = %e, "failed to fetch role permissions");
        ApiError::internal(codes::INTERNAL, "Failed to fetch roles and permissions.")
    })?;
    Ok(ApiResponse::ok(
        codes::OK,
        "Successfully fetched all role permissions!",
        grouped,
    ))
}

#[utoipa::path(
    get,
    path = "/api/public/v1/rbac/roles/{role_id}/permissions",
    params(("role_id" = i32, Path, description = "Role id")),
    tag = "RBAC",
    responses(
        (status = 200, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema)
    )
)]
pub async fn role_permissions(
    State(state): State<AppState>,
    AppPath(role_id): AppPath<String>,
) -> Result<ApiResponse<RoleWithPermissions>, ApiError> {
    let role_id = parse_id(&role_id, "Invalid role ID")?;
    let permissions = state
        .store
        .role_permissions(role_id)
        .await
        .map_err(|e| {
            error!(error = %e, role_id, "failed to fetch role permissions");
            ApiError::internal(codes::INTERNAL, "Failed to fetch role permissions.")
        })?
        .ok_or_else(|| ApiError::not_found("Role not found."))?;
    Ok(ApiResponse::ok(
        codes::OK,
        "Fetching role permissions successful!",
        permissions,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/public/v1/rbac/roles/{role_id}/permissions",
    params(("role_id" = i32, Path, description = "Role id")),
    request_body = PermissionToRoleRequest,
    tag = "RBAC",
    responses(
        (status = 200, body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema)
    )
)]
pub async fn remove_role_permission(
    State(state): State<AppState>,
    Auth(actor): Auth,
    AppPath(role_id): AppPath<String>,
    AppJson(request): AppJson<PermissionToRoleRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let role_id = parse_id(&role_id, "Invalid role ID")?;
    let (action, resource) = permission_pair(&request)?;

    let result = state
        .store
        .remove_role_permission(role_id, action, resource)
        .await
        .map_err(|e| {
            error!(error = %e, role_id, action, resource, "remove_role_permission failed");
            ApiError::internal(codes::INTERNAL, "Failed to remove permission from role.")
        })?;
    if !result.success {
        return Err(ApiError::validation(result.message));
    }
    info!(actor = %actor.username, role_id, action, resource, "permission revoked");
    Ok(ApiResponse::message(codes::OK, result.message.replace("\\\"", "")))
}
