// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! The authenticated staff member attached to a request.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::auth::{UserWithPermissions, ValidateTokenDetails};

/// Role name that bypasses every permission check.
pub const SUPER_ADMIN: &str = "super_admin";

/// Permission list reported for [`SUPER_ADMIN`] users.
pub const FULL_ACCESS: &str = "Full Access";

/// Identity built by the auth gate from a validated token and the local user.
///
/// Lives for one request and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Local user id.
    pub user_id: i64,
    pub username: String,
    pub role_name: Option<String>,
    /// `action:resource` strings granted through the user's role.
    pub permissions: HashSet<String>,
    /// Institution the token was issued for.
    pub institution_code: String,
}

impl AuthenticatedUser {
    pub fn from_records(token: &ValidateTokenDetails, user: UserWithPermissions) -> Self {
        let user_id = if user.user_id != 0 { user.user_id } else { user.id };
        let username = if user.username.is_empty() {
            token.username.clone()
        } else {
            user.username
        };
        Self {
            user_id,
            username,
            role_name: user.role_name.filter(|r| !r.is_empty()),
            permissions: user.permissions.into_iter().collect(),
            institution_code: token.insti_code.clone(),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role_name.as_deref() == Some(SUPER_ADMIN)
    }

    /// `super_admin` always passes; everyone else needs the exact string.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_super_admin() || self.permissions.contains(permission)
    }
}
