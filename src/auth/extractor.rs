// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Axum extractor for the identity attached by the auth gate.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, AuthenticatedUser};

/// Proof that the auth gate validated this request's token.
///
/// Only the auth module can construct one, so a handler or the permission
/// gate that finds it in the request extensions can trust its contents.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity(AuthenticatedUser);

impl VerifiedIdentity {
    pub(super) fn new(user: AuthenticatedUser) -> Self {
        Self(user)
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.0
    }

    pub fn into_user(self) -> AuthenticatedUser {
        self.0
    }
}

/// Extractor for the authenticated staff member.
///
/// Rejects with `Token missing.` when the route is not behind the auth gate.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .map(|identity| Auth(identity.into_user()))
            .ok_or(AuthError::MissingIdentity)
    }
}

/// Bearer token from the `Authorization` header.
pub fn bearer_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Raw `Authorization` header value, for forwarding upstream.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
