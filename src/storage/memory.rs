// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! In-memory [`Store`] for handler and middleware tests.
//!
//! Mirrors the observable behaviour of the PostgreSQL functions closely
//! enough to drive every handler branch, and counts calls so tests can
//! assert that a request never reached the database.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    CatalogKind, OfficeRepository, RbacRepository, ResetTokenRepository, StorageError,
    StorageResult, Store, UserRepository,
};
use crate::{
    auth::claims::{FULL_ACCESS, SUPER_ADMIN},
    models::{
        auth::{AccountRef, RegisterStaffResult, ResetToken, UpdateUserResult, UserWithPermissions},
        offices::{Branch, Unit},
        rbac::{PermissionItem, PermissionResult, RbacItem, RoleWithPermissions},
    },
};

/// A mirrored user row with the columns handlers mutate.
#[derive(Debug, Clone, Default)]
pub struct MirroredUser {
    pub record: UserWithPermissions,
    pub institution_code: String,
    pub password: String,
    pub is_active: bool,
    pub logged_in_at: Option<DateTime<Utc>>,
    pub requires_password_reset: bool,
    pub deleted: bool,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<MirroredUser>,
    registered: Vec<RegisterStaffResult>,
    tokens: Vec<ResetToken>,
    roles: Vec<RbacItem>,
    actions: Vec<RbacItem>,
    resources: Vec<RbacItem>,
    /// `(role_id, action, resource)`
    grants: Vec<(i32, String, String)>,
    branches: HashMap<String, Vec<Branch>>,
    units: HashMap<String, Vec<Unit>>,
    next_id: i32,
}

impl Tables {
    fn catalog(&mut self, kind: CatalogKind) -> &mut Vec<RbacItem> {
        match kind {
            CatalogKind::Action => &mut self.actions,
            CatalogKind::Resource => &mut self.resources,
        }
    }

    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn live_user_mut(&mut self, pred: impl Fn(&MirroredUser) -> bool) -> Option<&mut MirroredUser> {
        self.users.iter_mut().find(|u| !u.deleted && pred(u))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and fail it if [`Self::fail_all`] was set.
    fn enter(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables())
    }

    /// Number of repository calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with a database error.
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn insert_user(&self, record: UserWithPermissions) {
        self.insert_account(record, "0001");
    }

    pub fn insert_account(&self, record: UserWithPermissions, institution_code: &str) {
        self.tables().users.push(MirroredUser {
            record,
            institution_code: institution_code.to_string(),
            requires_password_reset: true,
            ..Default::default()
        });
    }

    /// Snapshot of a user row, deleted or not.
    pub fn user(&self, username: &str) -> Option<MirroredUser> {
        self.tables()
            .users
            .iter()
            .find(|u| u.record.username == username)
            .cloned()
    }

    pub fn registered(&self) -> Vec<RegisterStaffResult> {
        self.tables().registered.clone()
    }

    pub fn tokens(&self) -> Vec<ResetToken> {
        self.tables().tokens.clone()
    }

    pub fn insert_token(&self, token: ResetToken) {
        self.tables().tokens.push(token);
    }

    pub fn insert_role(&self, name: &str) -> i32 {
        let mut t = self.tables();
        let id = t.next_id();
        t.roles.push(item(id, name));
        id
    }

    pub fn insert_catalog(&self, kind: CatalogKind, name: &str) -> i32 {
        let mut t = self.tables();
        let id = t.next_id();
        t.catalog(kind).push(item(id, name));
        id
    }

    pub fn grant(&self, role_id: i32, action: &str, resource: &str) {
        self.tables()
            .grants
            .push((role_id, action.to_string(), resource.to_string()));
    }

    pub fn set_branches(&self, institution_code: &str, branches: Vec<Branch>) {
        self.tables()
            .branches
            .insert(institution_code.to_string(), branches);
    }

    pub fn set_units(&self, branch_code: &str, units: Vec<Unit>) {
        self.tables().units.insert(branch_code.to_string(), units);
    }
}

fn item(id: i32, name: &str) -> RbacItem {
    RbacItem {
        id,
        name: name.to_string(),
        description: String::new(),
        created_at: String::new(),
        updated_at: String::new(),
    }
}

fn permission_result(success: bool, message: String, role: &str, action: &str, resource: &str) -> PermissionResult {
    PermissionResult {
        success,
        message,
        role: role.to_string(),
        action: action.to_string(),
        resource: resource.to_string(),
        formatted_permission: if success {
            format!("{action}:{resource}")
        } else {
            String::new()
        },
    }
}

fn group(t: &Tables, role: &RbacItem) -> RoleWithPermissions {
    RoleWithPermissions {
        role: role.name.clone(),
        permissions: t
            .grants
            .iter()
            .filter(|(id, _, _)| *id == role.id)
            .map(|(_, action, resource)| PermissionItem {
                resource: resource.clone(),
                action: action.clone(),
                formatted: format!("{action}:{resource}"),
            })
            .collect(),
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn register_user(&self, record: &RegisterStaffResult) -> StorageResult<RegisterStaffResult> {
        let mut t = self.enter()?;
        t.registered.push(record.clone());
        t.users.push(MirroredUser {
            record: UserWithPermissions {
                id: record.user_id,
                user_id: record.user_id,
                username: record.username.clone(),
                staff_id: record.staff_id.clone(),
                email: record.email.clone(),
                ..Default::default()
            },
            institution_code: record.institution_code.clone(),
            password: record.password.clone(),
            requires_password_reset: true,
            ..Default::default()
        });
        Ok(record.clone())
    }

    async fn find_user_id_by_email(&self, email: &str) -> StorageResult<Option<i64>> {
        let mut t = self.enter()?;
        Ok(t.live_user_mut(|u| u.record.email == email).map(|u| u.record.id))
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> StorageResult<Option<UserWithPermissions>> {
        let mut t = self.enter()?;
        Ok(t.live_user_mut(|u| u.record.username == username).map(|u| {
            let mut user = u.record.clone();
            if user.role_name.as_deref() == Some(SUPER_ADMIN) {
                user.permissions = vec![FULL_ACCESS.to_string()];
            }
            user
        }))
    }

    async fn find_account_by_email(&self, email: &str) -> StorageResult<Option<AccountRef>> {
        let mut t = self.enter()?;
        Ok(t.live_user_mut(|u| u.record.email == email).map(|u| AccountRef {
            id: u.record.id,
            username: u.record.username.clone(),
            institution_code: u.institution_code.clone(),
        }))
    }

    async fn mark_login(&self, user_id: i64) -> StorageResult<()> {
        let mut t = self.enter()?;
        if let Some(u) = t.live_user_mut(|u| u.record.id == user_id) {
            u.is_active = true;
            u.logged_in_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_logout(&self, user_id: i64) -> StorageResult<()> {
        let mut t = self.enter()?;
        if let Some(u) = t.live_user_mut(|u| u.record.id == user_id) {
            u.is_active = false;
        }
        Ok(())
    }

    async fn sync_password(&self, user_id: i64, password: &str) -> StorageResult<()> {
        let mut t = self.enter()?;
        let u = t
            .live_user_mut(|u| u.record.id == user_id)
            .ok_or_else(|| StorageError::NotFound(format!("user {user_id}")))?;
        u.password = password.to_string();
        u.requires_password_reset = false;
        Ok(())
    }

    async fn soft_delete_user(&self, identity: &str) -> StorageResult<()> {
        let mut t = self.enter()?;
        let u = t
            .live_user_mut(|u| u.record.email == identity || u.record.username == identity)
            .ok_or_else(|| StorageError::NotFound(format!("user {identity}")))?;
        u.deleted = true;
        u.is_active = false;
        Ok(())
    }

    async fn update_user(&self, user_id: i64, details: &UpdateUserResult) -> StorageResult<()> {
        let mut t = self.enter()?;
        let u = t
            .live_user_mut(|u| u.record.id == user_id)
            .ok_or_else(|| StorageError::NotFound(format!("user {user_id}")))?;
        u.record.username = details.username.clone();
        u.record.staff_id = details.staff_id.clone();
        u.record.first_name = details.first_name.clone();
        u.record.middle_name = details.middle_name.clone();
        u.record.last_name = details.last_name.clone();
        u.record.email = details.email.clone();
        u.institution_code = details.institution_code.clone();
        Ok(())
    }
}

#[async_trait]
impl ResetTokenRepository for MemoryStore {
    async fn save_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut t = self.enter()?;
        t.tokens.push(ResetToken {
            email: email.to_string(),
            token: token.to_string(),
            created_at: Utc::now(),
            expires_at,
            used_at: None,
        });
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> StorageResult<Option<ResetToken>> {
        let t = self.enter()?;
        Ok(t.tokens.iter().rev().find(|r| r.token == token).cloned())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<String>> {
        let mut t = self.enter()?;
        let Some(row) = t
            .tokens
            .iter_mut()
            .find(|r| r.token == token && r.is_valid_at(now))
        else {
            return Ok(None);
        };
        row.used_at = Some(now);
        Ok(Some(row.email.clone()))
    }
}

#[async_trait]
impl RbacRepository for MemoryStore {
    async fn list_roles(&self) -> StorageResult<Vec<RbacItem>> {
        Ok(self.enter()?.roles.clone())
    }

    async fn assign_user_role(&self, staff_id: &str, role_id: i32) -> StorageResult<()> {
        let mut t = self.enter()?;
        let role = t
            .roles
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.name.clone())
            .ok_or_else(|| StorageError::InUse(format!("role {role_id}")))?;
        let u = t
            .live_user_mut(|u| u.record.staff_id == staff_id)
            .ok_or_else(|| StorageError::NotFound(format!("staff {staff_id}")))?;
        u.record.role_id = Some(i64::from(role_id));
        u.record.role_name = Some(role);
        Ok(())
    }

    async fn list_catalog(&self, kind: CatalogKind) -> StorageResult<Vec<RbacItem>> {
        Ok(self.enter()?.catalog(kind).clone())
    }

    async fn create_catalog_item(
        &self,
        kind: CatalogKind,
        name: &str,
        description: &str,
    ) -> StorageResult<()> {
        let mut t = self.enter()?;
        if t.catalog(kind).iter().any(|i| i.name == name) {
            return Err(StorageError::NameTaken(name.to_string()));
        }
        let id = t.next_id();
        let mut new = item(id, name);
        new.description = description.to_string();
        t.catalog(kind).push(new);
        Ok(())
    }

    async fn update_catalog_item(
        &self,
        kind: CatalogKind,
        id: i32,
        name: &str,
        description: &str,
    ) -> StorageResult<()> {
        let mut t = self.enter()?;
        let items = t.catalog(kind);
        if items.iter().any(|i| i.name == name && i.id != id) {
            return Err(StorageError::NameTaken(name.to_string()));
        }
        let existing = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StorageError::NotFound(format!("{} {id}", kind.table())))?;
        existing.name = name.to_string();
        existing.description = description.to_string();
        Ok(())
    }

    async fn delete_catalog_item(&self, kind: CatalogKind, id: i32) -> StorageResult<()> {
        let mut t = self.enter()?;
        let name = t
            .catalog(kind)
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.name.clone())
            .ok_or_else(|| StorageError::NotFound(format!("{} {id}", kind.table())))?;
        let referenced = t.grants.iter().any(|(_, action, resource)| match kind {
            CatalogKind::Action => *action == name,
            CatalogKind::Resource => *resource == name,
        });
        if referenced {
            return Err(StorageError::InUse(name));
        }
        t.catalog(kind).retain(|i| i.id != id);
        Ok(())
    }

    async fn assign_role_permission(
        &self,
        role_id: i32,
        action: &str,
        resource: &str,
    ) -> StorageResult<PermissionResult> {
        let mut t = self.enter()?;
        let Some(role) = t.roles.iter().find(|r| r.id == role_id).map(|r| r.name.clone()) else {
            return Ok(permission_result(false, format!("Role ID {role_id} not found"), "", action, resource));
        };
        if !t.actions.iter().any(|a| a.name == action) {
            return Ok(permission_result(false, format!("Action \"{action}\" not found"), &role, action, resource));
        }
        if !t.resources.iter().any(|r| r.name == resource) {
            return Ok(permission_result(false, format!("Resource \"{resource}\" not found"), &role, action, resource));
        }
        if t.grants.iter().any(|(id, a, r)| *id == role_id && a == action && r == resource) {
            return Ok(permission_result(false, "Permission already assigned to role".into(), &role, action, resource));
        }
        t.grants.push((role_id, action.to_string(), resource.to_string()));
        Ok(permission_result(true, "Permission assigned successfully".into(), &role, action, resource))
    }

    async fn remove_role_permission(
        &self,
        role_id: i32,
        action: &str,
        resource: &str,
    ) -> StorageResult<PermissionResult> {
        let mut t = self.enter()?;
        let role = t
            .roles
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        let before = t.grants.len();
        t.grants
            .retain(|(id, a, r)| !(*id == role_id && a == action && r == resource));
        if t.grants.len() == before {
            return Ok(permission_result(false, "Permission not assigned to role".into(), &role, action, resource));
        }
        Ok(permission_result(
            true,
            format!("Permission \\\"{action}:{resource}\\\" removed from role \\\"{role}\\\""),
            &role,
            action,
            resource,
        ))
    }

    async fn all_role_permissions(&self) -> StorageResult<Vec<RoleWithPermissions>> {
        let t = self.enter()?;
        Ok(t.roles.iter().map(|r| group(&t, r)).collect())
    }

    async fn role_permissions(&self, role_id: i32) -> StorageResult<Option<RoleWithPermissions>> {
        let t = self.enter()?;
        Ok(t.roles.iter().find(|r| r.id == role_id).map(|r| group(&t, r)))
    }
}

#[async_trait]
impl OfficeRepository for MemoryStore {
    async fn branches(&self, institution_code: &str) -> StorageResult<Vec<Branch>> {
        let t = self.enter()?;
        Ok(t.branches.get(institution_code).cloned().unwrap_or_default())
    }

    async fn units(&self, branch_code: &str) -> StorageResult<Vec<Unit>> {
        let t = self.enter()?;
        t.units
            .get(branch_code)
            .cloned()
            .ok_or_else(|| StorageError::InvalidInput(branch_code.to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StorageResult<()> {
        drop(self.enter()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_jdoe() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_user(UserWithPermissions {
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            ..Default::default()
        });
        store
    }

    #[tokio::test]
    async fn soft_delete_only_matches_live_rows() {
        let store = store_with_jdoe();
        store.soft_delete_user("jdoe@example.com").await.unwrap();
        assert!(matches!(
            store.soft_delete_user("jdoe").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn ping_counts_and_honours_failure() {
        let store = MemoryStore::new();
        store.ping().await.unwrap();
        store.ping().await.unwrap();
        assert_eq!(store.calls(), 2);

        store.fail_all();
        assert!(matches!(store.ping().await, Err(StorageError::Database(_))));
    }
}
