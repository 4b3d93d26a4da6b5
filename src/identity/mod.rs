// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! # Identity Service
//!
//! The external identity service owns credentials and tokens. This module
//! defines its result shape, its `retCode` vocabulary, and the
//! [`IdentityService`] seam that handlers and the auth gate call through.
//!
//! A call either fails at transport/decoding level ([`IdentityError`]) or
//! returns an [`ExternalApiResult`] whose `retCode` the caller classifies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    codes,
    error::ApiError,
    models::auth::{
        ChangePasswordRequest, ChangePasswordResult, DeleteUserRequest, LoginRequest,
        LoginResult, LogoutRequest, LogoutResult, RegisterStaffResult,
        StaffRegistrationApiRequest, UpdateUserRequest, UpdateUserResult, ValidateTokenDetails,
    },
};

pub mod client;

pub use client::IdentityClient;

/// `retCode` values with a fixed meaning.
pub mod ret_code {
    pub const TOKEN_TERMINATED: &str = "109";
    pub const LOGIN_OK: &str = "201";
    pub const LOGOUT_OK: &str = "202";
    /// Registration, password change and update share this code.
    pub const CHANGED: &str = "203";
    pub const UNCHANGED: &str = "204";
    pub const DELETED: &str = "210";
    pub const TOKEN_VALID: &str = "215";
}

/// Envelope returned by every identity endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalApiResult<T> {
    #[serde(rename = "retCode", default)]
    pub ret_code: String,
    #[serde(default)]
    pub message: String,
    pub data: Option<ExternalApiData<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalApiData<T> {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "isSuccess", default)]
    pub is_success: bool,
    pub error: Option<Value>,
    pub details: Option<T>,
}

impl<T> ExternalApiResult<T> {
    /// The user-facing message: `data.message` when present, else the top level.
    pub fn message(&self) -> &str {
        match &self.data {
            Some(data) if !data.message.is_empty() => &data.message,
            _ => &self.message,
        }
    }

    /// Take the payload, if any.
    pub fn into_details(self) -> Option<T> {
        self.data.and_then(|d| d.details)
    }

    /// Accept the result if `retCode` is in `success`, else reject it with the
    /// upstream code and message verbatim.
    pub fn classify(self, success: &[&str]) -> Result<Classified<T>, ApiError> {
        if !success.contains(&self.ret_code.as_str()) {
            return Err(ApiError::rejected(self.ret_code.clone(), self.message()));
        }
        let message = self.message().to_string();
        Ok(Classified {
            ret_code: self.ret_code.clone(),
            message,
            details: self.into_details(),
        })
    }
}

/// An accepted upstream result.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified<T> {
    pub ret_code: String,
    pub message: String,
    pub details: Option<T>,
}

impl<T> Classified<T> {
    /// Payload required for reconciliation; missing means the upstream
    /// answer was unusable.
    pub fn require_details(self) -> Result<(String, String, T), ApiError> {
        match self.details {
            Some(details) => Ok((self.ret_code, self.message, details)),
            None => Err(ApiError::internal(
                codes::RESPONSE_PARSE_FAILED,
                "Failed to parse external API response",
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity request failed: {0}")]
    Transport(String),

    #[error("identity response was invalid: {0}")]
    InvalidResponse(String),

    /// Refused locally before anything was sent.
    #[error("identity request rejected: {0}")]
    InvalidRequest(String),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        tracing::warn!(error = %err, "identity service call failed");
        match err {
            IdentityError::Transport(_) => ApiError::upstream("Request to external API failed"),
            IdentityError::InvalidResponse(_) => ApiError::internal(
                codes::RESPONSE_PARSE_FAILED,
                "Failed to parse external API response",
            ),
            IdentityError::InvalidRequest(_) => ApiError::validation("Invalid username"),
        }
    }
}

pub type IdentityResult<T> = Result<ExternalApiResult<T>, IdentityError>;

/// Operations delegated to the identity service.
///
/// `authorization` arguments are the caller's `Authorization` header value,
/// forwarded unchanged.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn validate_token(&self, token: &str) -> IdentityResult<ValidateTokenDetails>;

    async fn register_staff(
        &self,
        req: &StaffRegistrationApiRequest,
    ) -> IdentityResult<RegisterStaffResult>;

    async fn login(&self, req: &LoginRequest) -> IdentityResult<LoginResult>;

    async fn logout(&self, req: &LogoutRequest) -> IdentityResult<LogoutResult>;

    async fn change_password(
        &self,
        req: &ChangePasswordRequest,
    ) -> IdentityResult<ChangePasswordResult>;

    async fn delete_user(&self, authorization: &str, req: &DeleteUserRequest)
        -> IdentityResult<Value>;

    async fn update_staff(
        &self,
        authorization: &str,
        username: &str,
        req: &UpdateUserRequest,
    ) -> IdentityResult<UpdateUserResult>;
}
