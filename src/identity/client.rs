// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! HTTP client for the identity service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{IdentityError, IdentityResult, IdentityService};
use crate::models::{
    auth::{
        ChangePasswordRequest, ChangePasswordResult, DeleteUserRequest, LoginRequest,
        LoginResult, LogoutRequest, LogoutResult, RegisterStaffResult,
        StaffRegistrationApiRequest, UpdateUserRequest, UpdateUserResult, ValidateTokenDetails,
    },
    from_lenient_value,
};

const API_PREFIX: [&str; 5] = ["soteria-go", "api", "public", "v1", "auth"];
const API_KEY_HEADER: &str = "x-api-key";

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);
const MUTATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct IdentityClient {
    base_url: Url,
    api_key: String,
    http: Client,
    validate_timeout: Duration,
    mutation_timeout: Duration,
}

impl IdentityClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, IdentityError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| IdentityError::Transport(format!("invalid identity base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::Transport(format!(
                "identity base URL cannot carry a path: {base_url}"
            )));
        }
        let http = Client::builder()
            .build()
            .map_err(|e| IdentityError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http,
            validate_timeout: VALIDATE_TIMEOUT,
            mutation_timeout: MUTATION_TIMEOUT,
        })
    }

    /// Override the per-request deadlines for token validation and for
    /// every other call.
    pub fn with_timeouts(mut self, validate: Duration, mutation: Duration) -> Self {
        self.validate_timeout = validate;
        self.mutation_timeout = mutation;
        self
    }

    /// Each segment is percent-encoded on its own, so `/`, `?` and `#` in a
    /// segment never change the route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, IdentityError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| IdentityError::InvalidRequest(format!("base URL {} has no path", self.base_url)))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    async fn call<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        authorization: Option<&str>,
        timeout: Duration,
    ) -> IdentityResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let mut request = self
            .http
            .request(method, url)
            .timeout(timeout)
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Transport(format!("{path}: {e}")))?;
        let status = response.status();
        let raw: Value = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("{path} ({status}): {e}")))?;
        debug!(path, %status, "identity service responded");

        from_lenient_value(raw).map_err(|e| IdentityError::InvalidResponse(format!("{path}: {e}")))
    }
}

/// A username travels as one path segment; dot segments would be resolved
/// away by the upstream router.
fn username_segment(username: &str) -> Result<&str, IdentityError> {
    match username.trim() {
        "" | "." | ".." => Err(IdentityError::InvalidRequest(format!(
            "username {username:?} is not a valid path segment"
        ))),
        _ => Ok(username),
    }
}

#[async_trait]
impl IdentityService for IdentityClient {
    async fn validate_token(&self, token: &str) -> IdentityResult<ValidateTokenDetails> {
        let bearer = format!("Bearer {token}");
        self.call::<(), _>(
            Method::GET,
            &["security-management", "validate-header"],
            None,
            Some(&bearer),
            self.validate_timeout,
        )
        .await
    }

    async fn register_staff(
        &self,
        req: &StaffRegistrationApiRequest,
    ) -> IdentityResult<RegisterStaffResult> {
        self.call(
            Method::POST,
            &["user-management", "register-new-user", "staff"],
            Some(req),
            None,
            self.mutation_timeout,
        )
        .await
    }

    async fn login(&self, req: &LoginRequest) -> IdentityResult<LoginResult> {
        self.call(Method::POST, &["user-logs", "login"], Some(req), None, self.mutation_timeout)
            .await
    }

    async fn logout(&self, req: &LogoutRequest) -> IdentityResult<LogoutResult> {
        self.call(Method::POST, &["user-logs", "logout"], Some(req), None, self.mutation_timeout)
            .await
    }

    async fn change_password(
        &self,
        req: &ChangePasswordRequest,
    ) -> IdentityResult<ChangePasswordResult> {
        self.call(
            Method::POST,
            &["security-management", "change-password"],
            Some(req),
            None,
            self.mutation_timeout,
        )
        .await
    }

    async fn delete_user(
        &self,
        authorization: &str,
        req: &DeleteUserRequest,
    ) -> IdentityResult<Value> {
        self.call(
            Method::POST,
            &["user-management", "delete-user"],
            Some(req),
            Some(authorization),
            self.mutation_timeout,
        )
        .await
    }

    async fn update_staff(
        &self,
        authorization: &str,
        username: &str,
        req: &UpdateUserRequest,
    ) -> IdentityResult<UpdateUserResult> {
        let username = username_segment(username)?;
        self.call(
            Method::POST,
            &["user-management", "update-user", "staff", username],
            Some(req),
            Some(authorization),
            self.mutation_timeout,
        )
        .await
    }
}
