// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::{codes, envelope::Envelope};

/// Error classification. Each kind owns its HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input or an operation the identity service rejected.
    BadRequest,
    /// Missing, malformed, or invalid bearer token.
    Unauthenticated,
    /// Token explicitly terminated upstream.
    TokenRevoked,
    /// Valid identity without the required permission.
    Forbidden,
    /// Local record absent, or no route matched.
    NotFound,
    /// Route exists but not for this HTTP method.
    MethodNotAllowed,
    /// Uniqueness violation.
    Conflict,
    /// Delete blocked by a foreign-key dependency.
    InUse,
    /// Unexpected parse or store failure.
    Internal,
    /// Upstream committed a change but the local mirror update failed.
    ReconcileFailed,
    /// Identity service unreachable or timed out.
    Upstream,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthenticated | ErrorKind::TokenRevoked => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Conflict | ErrorKind::InUse => StatusCode::CONFLICT,
            ErrorKind::Internal | ErrorKind::ReconcileFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.status(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, code, message)
    }

    /// Input failed a field-level check.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::bad_request(codes::VALIDATION_FAILED, message)
    }

    /// Request body could not be decoded.
    pub fn unparseable_body() -> Self {
        Self::bad_request(codes::BODY_PARSE_FAILED, "Parsing request body failed")
    }

    /// The identity service answered with a non-success `retCode`.
    ///
    /// The upstream code and message are passed through verbatim.
    pub fn rejected(ret_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::bad_request(ret_code, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, codes::NOT_FOUND, message)
    }

    /// The envelope code stays `400`; `405` already means an upstream failure.
    pub fn method_not_allowed() -> Self {
        Self::new(ErrorKind::MethodNotAllowed, codes::VALIDATION_FAILED, "Method not allowed")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, codes::CONFLICT, message)
    }

    pub fn in_use(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InUse, codes::CONFLICT, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, code, message)
    }

    pub fn reconcile_failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReconcileFailed, code, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, codes::UPSTREAM_REQUEST_FAILED, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(kind = ?self.kind, code = %self.code, message = %self.message, "request failed");
        }
        let body = Json(Envelope::empty(self.code, self.message));
        (self.status, body).into_response()
    }
}
