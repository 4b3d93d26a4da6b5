// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A role, action, or resource row. Timestamps are rendered as text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, sqlx::FromRow)]
pub struct RbacItem {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Create/update body for actions and resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct RbacItemRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct AssignRoleRequest {
    pub staff_id: String,
    pub role_id: i32,
}

/// Names an `(action, resource)` pair to bind to or unbind from a role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct PermissionToRoleRequest {
    pub action: String,
    pub resource: String,
}

/// Outcome reported by the permission-binding stored functions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, sqlx::FromRow)]
pub struct PermissionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub formatted_permission: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct PermissionItem {
    pub resource: String,
    pub action: String,
    /// `action:resource`
    pub formatted: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct RoleWithPermissions {
    pub role: String,
    pub permissions: Vec<PermissionItem>,
}
