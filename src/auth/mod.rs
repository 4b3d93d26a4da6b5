// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! # Authentication Module
//!
//! Staff authentication is delegated to the identity service; authorization
//! is decided locally from the mirrored role permissions.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. [`auth_gate`] asks the identity service to validate the token:
//!    - `215` → valid
//!    - `109` → terminated (401, distinct message)
//!    - anything else → 401
//! 3. The local user is loaded by username together with its role's
//!    permission strings and attached as a [`VerifiedIdentity`]
//! 4. [`require_permission`] checks one exact permission string per route;
//!    `super_admin` bypasses the check

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{authorization_header, bearer_from_headers, Auth, VerifiedIdentity};
pub use middleware::{auth_gate, authenticate, require_permission, RequiredPermission};
