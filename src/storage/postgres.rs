// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! PostgreSQL implementation of the repository traits.
//!
//! Stored functions that return JSON are selected as `::text` and decoded
//! leniently. Timestamps read back as text are cast in SQL so the column
//! type (`timestamp` or `timestamptz`) does not matter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::debug;

use super::{
    CatalogKind, OfficeRepository, RbacRepository, ResetTokenRepository, StorageError,
    StorageResult, Store, UserRepository,
};
use crate::{
    auth::claims::{FULL_ACCESS, SUPER_ADMIN},
    models::{
        auth::{AccountRef, RegisterStaffResult, ResetToken, UpdateUserResult, UserWithPermissions},
        from_lenient_str,
        offices::{Branch, Unit},
        rbac::{PermissionResult, RbacItem, RoleWithPermissions},
    },
};

/// Repository handle over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Only live rows match, so repeating a delete reports `NotFound`.
const SOFT_DELETE_USER: &str = "UPDATE users \
     SET deleted_at = NOW(), is_active = false, updated_at = NOW() \
     WHERE (email = $1 OR username = $1) AND deleted_at IS NULL";

fn catalog_select(kind: CatalogKind) -> String {
    format!(
        "SELECT id::int AS id, name, COALESCE(description, '') AS description, \
                COALESCE(created_at::text, '') AS created_at, \
                COALESCE(updated_at::text, '') AS updated_at \
         FROM {} ORDER BY id ASC",
        kind.table()
    )
}

fn ensure_affected(rows: u64, subject: impl Into<String>) -> StorageResult<()> {
    if rows == 0 {
        Err(StorageError::NotFound(subject.into()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn register_user(&self, record: &RegisterStaffResult) -> StorageResult<RegisterStaffResult> {
        let payload = serde_json::to_string(record)?;
        let raw = sqlx::query_scalar::<_, Option<String>>("SELECT register_user($1::jsonb)::text")
            .bind(payload)
            .fetch_one(&self.pool)
            .await?;
        let raw = raw.ok_or_else(|| StorageError::NotFound("register_user returned null".into()))?;
        Ok(from_lenient_str(&raw)?)
    }

    async fn find_user_id_by_email(&self, email: &str) -> StorageResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id::bigint FROM users WHERE email = $1 AND deleted_at IS NULL LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> StorageResult<Option<UserWithPermissions>> {
        let raw = sqlx::query_scalar::<_, Option<String>>("SELECT get_user_by_username($1)::text")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let mut user: UserWithPermissions = from_lenient_str(&raw)?;
        if user.role_name.as_deref() == Some(SUPER_ADMIN) {
            user.permissions = vec![FULL_ACCESS.to_string()];
        }
        Ok(Some(user))
    }

    async fn find_account_by_email(&self, email: &str) -> StorageResult<Option<AccountRef>> {
        let row = sqlx::query_as::<_, (i64, Option<String>, Option<String>)>(
            "SELECT id::bigint, username, institution_code \
             FROM users WHERE email = $1 AND deleted_at IS NULL LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|(id, username, institution_code)| {
            let username = username.filter(|u| !u.is_empty())?;
            Some(AccountRef {
                id,
                username,
                institution_code: institution_code.unwrap_or_default(),
            })
        }))
    }

    async fn mark_login(&self, user_id: i64) -> StorageResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW(), is_active = true WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_logout(&self, user_id: i64) -> StorageResult<()> {
        sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sync_password(&self, user_id: i64, password: &str) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE users \
             SET password = $1, requires_password_reset = false, \
                 last_password_reset = NOW(), updated_at = NOW() \
             WHERE id = $2",
        )
        .bind(password)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected(), format!("user {user_id}"))
    }

    async fn soft_delete_user(&self, identity: &str) -> StorageResult<()> {
        let result = sqlx::query(SOFT_DELETE_USER)
            .bind(identity)
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected(), format!("user {identity}"))
    }

    async fn update_user(&self, user_id: i64, details: &UpdateUserResult) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE users SET \
                username = $1, staff_id = $2, first_name = $3, middle_name = $4, \
                last_name = $5, email = $6, phone_no = $7, \
                birthdate = NULLIF($8, '')::date, institution_code = $9, \
                updated_at = NOW() \
             WHERE id = $10",
        )
        .bind(&details.username)
        .bind(&details.staff_id)
        .bind(&details.first_name)
        .bind(&details.middle_name)
        .bind(&details.last_name)
        .bind(&details.email)
        .bind(&details.phone_no)
        .bind(&details.birthdate)
        .bind(&details.institution_code)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::classify(e, format!("user {user_id}")))?;
        ensure_affected(result.rows_affected(), format!("user {user_id}"))
    }
}

#[async_trait]
impl ResetTokenRepository for PgStore {
    async fn save_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        sqlx::query("INSERT INTO password_reset_tokens (email, token, expires_at) VALUES ($1, $2, $3)")
            .bind(email)
            .bind(token)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> StorageResult<Option<ResetToken>> {
        let row = sqlx::query_as::<
            _,
            (String, String, DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>),
        >(
            "SELECT email, token, created_at::timestamptz, expires_at::timestamptz, \
                    used_at::timestamptz \
             FROM password_reset_tokens WHERE token = $1 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(email, token, created_at, expires_at, used_at)| ResetToken {
            email,
            token,
            created_at,
            expires_at,
            used_at,
        }))
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<String>> {
        let email = sqlx::query_scalar::<_, String>(
            "UPDATE password_reset_tokens SET used_at = $2 \
             WHERE token = $1 AND used_at IS NULL AND expires_at > $2 \
             RETURNING email",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(email)
    }
}

#[async_trait]
impl RbacRepository for PgStore {
    async fn list_roles(&self) -> StorageResult<Vec<RbacItem>> {
        let roles = sqlx::query_as::<_, RbacItem>(
            "SELECT id::int AS id, name, COALESCE(description, '') AS description, \
                    COALESCE(created_at::text, '') AS created_at, \
                    COALESCE(updated_at::text, '') AS updated_at \
             FROM roles ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn assign_user_role(&self, staff_id: &str, role_id: i32) -> StorageResult<()> {
        let result = sqlx::query("UPDATE users SET role_id = $1 WHERE staff_id = $2")
            .bind(role_id)
            .bind(staff_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::classify(e, format!("role {role_id}")))?;
        debug!(staff_id, role_id, rows = result.rows_affected(), "assigned user role");
        ensure_affected(result.rows_affected(), format!("staff {staff_id}"))
    }

    async fn list_catalog(&self, kind: CatalogKind) -> StorageResult<Vec<RbacItem>> {
        let items = sqlx::query_as::<_, RbacItem>(&catalog_select(kind))
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn create_catalog_item(
        &self,
        kind: CatalogKind,
        name: &str,
        description: &str,
    ) -> StorageResult<()> {
        let sql = format!("INSERT INTO {} (name, description) VALUES ($1, $2)", kind.table());
        sqlx::query(&sql)
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::classify(e, name))?;
        Ok(())
    }

    async fn update_catalog_item(
        &self,
        kind: CatalogKind,
        id: i32,
        name: &str,
        description: &str,
    ) -> StorageResult<()> {
        let sql = format!(
            "UPDATE {} SET name = $1, description = $2, updated_at = NOW() WHERE id = $3",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(name)
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::classify(e, name))?;
        ensure_affected(result.rows_affected(), format!("{} {id}", kind.table()))
    }

    async fn delete_catalog_item(&self, kind: CatalogKind, id: i32) -> StorageResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::classify(e, format!("{} {id}", kind.table())))?;
        ensure_affected(result.rows_affected(), format!("{} {id}", kind.table()))
    }

    async fn assign_role_permission(
        &self,
        role_id: i32,
        action: &str,
        resource: &str,
    ) -> StorageResult<PermissionResult> {
        let result = sqlx::query_as::<_, PermissionResult>(
            "SELECT COALESCE(success, false) AS success, \
                    COALESCE(message, '') AS message, \
                    COALESCE(role, '') AS role, \
                    COALESCE(action, '') AS action, \
                    COALESCE(resource, '') AS resource, \
                    COALESCE(formatted_permission, '') AS formatted_permission \
             FROM assign_role_permission($1, $2, $3)",
        )
        .bind(role_id)
        .bind(action)
        .bind(resource)
        .fetch_one(&self.pool)
        .await?;
        debug!(role_id, success = result.success, message = %result.message, "assign_role_permission");
        Ok(result)
    }

    async fn remove_role_permission(
        &self,
        role_id: i32,
        action: &str,
        resource: &str,
    ) -> StorageResult<PermissionResult> {
        let result = sqlx::query_as::<_, PermissionResult>(
            "SELECT COALESCE(success, false) AS success, \
                    COALESCE(message, '') AS message, \
                    COALESCE(role_name, '') AS role, \
                    COALESCE(action_name, '') AS action, \
                    COALESCE(resource_name, '') AS resource, \
                    '' AS formatted_permission \
             FROM remove_role_permission($1, $2, $3)",
        )
        .bind(role_id)
        .bind(action)
        .bind(resource)
        .fetch_one(&self.pool)
        .await?;
        debug!(role_id, success = result.success, message = %result.message, "remove_role_permission");
        Ok(result)
    }

    async fn all_role_permissions(&self) -> StorageResult<Vec<RoleWithPermissions>> {
        let raw = sqlx::query_scalar::<_, Option<String>>(
            "SELECT get_all_roles_permissions_json()::text",
        )
        .fetch_one(&self.pool)
        .await?;
        match raw {
            Some(raw) => Ok(from_lenient_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn role_permissions(&self, role_id: i32) -> StorageResult<Option<RoleWithPermissions>> {
        let raw = sqlx::query_scalar::<_, Option<String>>(
            "SELECT get_role_permissions_json($1)::text",
        )
        .bind(role_id)
        .fetch_one(&self.pool)
        .await;
        match raw {
            Ok(Some(raw)) => Ok(Some(from_lenient_str(&raw)?)),
            Ok(None) => Ok(None),
            // The function raises rather than returning null for unknown roles.
            Err(sqlx::Error::Database(db)) if db.message().to_lowercase().contains("not found") => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl OfficeRepository for PgStore {
    async fn branches(&self, institution_code: &str) -> StorageResult<Vec<Branch>> {
        let raw = sqlx::query_scalar::<_, Option<String>>("SELECT get_branches($1)::text")
            .bind(institution_code)
            .fetch_one(&self.pool)
            .await?;
        match raw {
            Some(raw) => Ok(from_lenient_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn units(&self, branch_code: &str) -> StorageResult<Vec<Unit>> {
        let raw = sqlx::query_scalar::<_, Option<String>>("SELECT get_units($1)::text")
            .bind(branch_code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match StorageError::classify(e, branch_code) {
                StorageError::InUse(code) => StorageError::InvalidInput(code),
                other => other,
            })?;
        match raw {
            Some(raw) => Ok(from_lenient_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
