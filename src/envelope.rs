// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! The `{code, message, data}` response envelope.
//!
//! Every response leaving the gateway, success or failure, is one of these.
//! `data` is always serialized, as `null` when there is no payload.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Uniform JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn new(code: impl Into<String>, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data,
        }
    }
}

impl Envelope<()> {
    /// Envelope with `data: null`.
    pub fn empty(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, None)
    }
}

/// OpenAPI shape of [`Envelope`]; the payload type varies per endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct EnvelopeSchema {
    /// Domain result code (not an HTTP status).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Endpoint-specific payload, or `null`.
    #[schema(value_type = Object, nullable = true)]
    pub data: Option<serde_json::Value>,
}

/// Successful handler output: an HTTP status plus the envelope.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub envelope: Envelope<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
        data: Option<T>,
    ) -> Self {
        Self {
            status,
            envelope: Envelope::new(code, message, data),
        }
    }

    /// 200 with a payload.
    pub fn ok(code: impl Into<String>, message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, code, message, Some(data))
    }
}

impl ApiResponse<()> {
    /// 200 with `data: null`.
    pub fn message(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, code, message, None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
