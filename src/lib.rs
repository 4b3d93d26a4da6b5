// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! iProvidence staff gateway.
//!
//! Staff identity is owned by the external identity service; this crate
//! fronts it, mirrors users into PostgreSQL, and serves RBAC and office
//! lookups behind an authentication and permission gate.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers and router (Axum)
//! - `auth` - Auth gate, permission gate, authenticated identity
//! - `identity` - Identity service client
//! - `notify` - Email queue, templates and SMTP delivery
//! - `storage` - PostgreSQL mirror behind repository traits

pub mod api;
pub mod auth;
pub mod codes;
pub mod config;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
