// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    codes,
    error::{ApiError, ErrorKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header
    MissingAuthHeader,
    /// Header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Identity service unreachable or rejected the token
    ValidationFailed,
    /// Token was terminated upstream
    TokenRevoked,
    /// Validation response could not be decoded
    UnparseableValidation,
    /// Local user lookup failed or found nothing
    UserLookupFailed,
    /// Permission gate reached without an identity
    MissingIdentity,
    /// Identity lacks the required permission
    InsufficientPermissions,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::ValidationFailed
            | AuthError::MissingIdentity => ErrorKind::Unauthenticated,
            AuthError::TokenRevoked => ErrorKind::TokenRevoked,
            AuthError::UnparseableValidation | AuthError::UserLookupFailed => ErrorKind::Internal,
            AuthError::InsufficientPermissions => ErrorKind::Forbidden,
        }
    }

    /// Envelope code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::ValidationFailed
            | AuthError::TokenRevoked => codes::UNAUTHORIZED,
            AuthError::UnparseableValidation => codes::RESPONSE_PARSE_FAILED,
            AuthError::UserLookupFailed => codes::INTERNAL,
            AuthError::MissingIdentity => codes::TOKEN_MISSING,
            AuthError::InsufficientPermissions => codes::ACCESS_DENIED,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().status()
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            AuthError::MissingAuthHeader => "Authorization header missing",
            AuthError::InvalidAuthHeader => "Invalid token format",
            AuthError::ValidationFailed => "Token validation failed",
            AuthError::TokenRevoked => "Token has been terminated",
            AuthError::UnparseableValidation => "Failed to parse token validation response",
            AuthError::UserLookupFailed => "Failed to fetch User",
            AuthError::MissingIdentity => "Token missing.",
            AuthError::InsufficientPermissions => "Access denied.",
        };
        f.write_str(message)
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::new(err.kind(), err.code(), err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
