// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! # PostgreSQL Store
//!
//! The local PostgreSQL mirror of users, reset tokens, RBAC records and
//! offices. Handlers only see the repository traits below; [`PgStore`]
//! implements them over a shared `PgPool`.
//!
//! Every method is a single autonomous statement. There are no
//! cross-statement transactions, and nothing here talks to the identity
//! service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    auth::{AccountRef, RegisterStaffResult, ResetToken, UpdateUserResult, UserWithPermissions},
    offices::{Branch, Unit},
    rbac::{PermissionResult, RbacItem, RoleWithPermissions},
};

pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgStore;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("name already taken: {0}")]
    NameTaken(String),

    #[error("still referenced: {0}")]
    InUse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("stored function returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Map constraint violations onto domain variants.
    pub(crate) fn classify(err: sqlx::Error, subject: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StorageError::NameTaken(subject.into());
            }
            if db.is_foreign_key_violation() {
                return StorageError::InUse(subject.into());
            }
        }
        StorageError::Database(err)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// The two flat RBAC catalogs that share a CRUD shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Action,
    Resource,
}

impl CatalogKind {
    pub fn table(self) -> &'static str {
        match self {
            CatalogKind::Action => "actions",
            CatalogKind::Resource => "resources",
        }
    }

    /// Display noun, capitalised for messages.
    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Action => "Action",
            CatalogKind::Resource => "Resource",
        }
    }

    /// Key of the list payload (`{"actions": [...]}`).
    pub fn plural(self) -> &'static str {
        self.table()
    }
}

/// Local user mirror.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a registered user via `register_user(jsonb)` and return the row
    /// as the function echoes it.
    async fn register_user(&self, record: &RegisterStaffResult) -> StorageResult<RegisterStaffResult>;

    /// Id of the non-deleted user with this email.
    async fn find_user_id_by_email(&self, email: &str) -> StorageResult<Option<i64>>;

    /// User joined with role permissions. `super_admin` gets `["Full Access"]`.
    async fn find_user_by_username(&self, username: &str)
        -> StorageResult<Option<UserWithPermissions>>;

    async fn find_account_by_email(&self, email: &str) -> StorageResult<Option<AccountRef>>;

    async fn mark_login(&self, user_id: i64) -> StorageResult<()>;

    async fn mark_logout(&self, user_id: i64) -> StorageResult<()>;

    /// Mirror a password change and clear `requires_password_reset`.
    async fn sync_password(&self, user_id: i64, password: &str) -> StorageResult<()>;

    /// Soft delete by email or username. `NotFound` if nothing matched.
    async fn soft_delete_user(&self, identity: &str) -> StorageResult<()>;

    async fn update_user(&self, user_id: i64, details: &UpdateUserResult) -> StorageResult<()>;
}

#[async_trait]
pub trait ResetTokenRepository: Send + Sync {
    async fn save_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    async fn find_reset_token(&self, token: &str) -> StorageResult<Option<ResetToken>>;

    /// Mark the token used if it is still valid at `now`; returns its email.
    ///
    /// Check and update are one statement, so two concurrent consumers cannot
    /// both succeed.
    async fn consume_reset_token(&self, token: &str, now: DateTime<Utc>)
        -> StorageResult<Option<String>>;
}

#[async_trait]
pub trait RbacRepository: Send + Sync {
    async fn list_roles(&self) -> StorageResult<Vec<RbacItem>>;

    /// `NotFound` when no user has this staff id.
    async fn assign_user_role(&self, staff_id: &str, role_id: i32) -> StorageResult<()>;

    async fn list_catalog(&self, kind: CatalogKind) -> StorageResult<Vec<RbacItem>>;

    /// `NameTaken` on a duplicate name.
    async fn create_catalog_item(
        &self,
        kind: CatalogKind,
        name: &str,
        description: &str,
    ) -> StorageResult<()>;

    /// `NotFound` or `NameTaken`.
    async fn update_catalog_item(
        &self,
        kind: CatalogKind,
        id: i32,
        name: &str,
        description: &str,
    ) -> StorageResult<()>;

    /// `NotFound` or `InUse`.
    async fn delete_catalog_item(&self, kind: CatalogKind, id: i32) -> StorageResult<()>;

    async fn assign_role_permission(
        &self,
        role_id: i32,
        action: &str,
        resource: &str,
    ) -> StorageResult<PermissionResult>;

    async fn remove_role_permission(
        &self,
        role_id: i32,
        action: &str,
        resource: &str,
    ) -> StorageResult<PermissionResult>;

    async fn all_role_permissions(&self) -> StorageResult<Vec<RoleWithPermissions>>;

    async fn role_permissions(&self, role_id: i32) -> StorageResult<Option<RoleWithPermissions>>;
}

#[async_trait]
pub trait OfficeRepository: Send + Sync {
    async fn branches(&self, institution_code: &str) -> StorageResult<Vec<Branch>>;

    /// `InvalidInput` when the branch code violates a foreign key.
    async fn units(&self, branch_code: &str) -> StorageResult<Vec<Unit>>;
}

/// Everything a handler may ask of the database.
#[async_trait]
pub trait Store: UserRepository + ResetTokenRepository + RbacRepository + OfficeRepository {
    /// Round-trip `SELECT 1`.
    async fn ping(&self) -> StorageResult<()>;
}
