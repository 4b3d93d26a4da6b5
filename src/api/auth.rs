// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Staff lifecycle endpoints.
//!
//! Each handler binds its body, makes one identity-service call, accepts
//! only that operation's success `retCode`s, then brings the local mirror in
//! line. A local failure after upstream success is a `ReconcileFailed`.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde_json::Value;
use tracing::{error, info, warn};

use super::extract::{AppJson, AppPath};
use crate::{
    auth::authorization_header,
    codes,
    envelope::{ApiResponse, EnvelopeSchema},
    error::{ApiError, ErrorKind},
    identity::ret_code,
    models::auth::{
        ChangePasswordRequest, ChangePasswordResult, DeleteUserRequest, ForgotPasswordRequest,
        LoginRequest, LoginResult, LogoutRequest, LogoutResult, RegisterStaffRequest,
        RegisterStaffResult, ResetPasswordRequest, StaffRegistrationApiRequest,
        UpdateUserRequest, UpdateUserResult, VerifyResetTokenRequest,
    },
    notify::Notification,
    state::AppState,
    storage::StorageError,
};

/// Reset tokens expire this long after issuance.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 5;
const RESET_TOKEN_BYTES: usize = 32;

pub const FORGOT_PASSWORD_MESSAGE: &str = "If the email exists, a reset link has been sent";

fn reconcile_failed(
    operation: &'static str,
    code: &'static str,
    message: &'static str,
) -> impl FnOnce(StorageError) -> ApiError {
    move |e| {
        error!(operation, error = %e, "upstream succeeded but local mirror update failed");
        ApiError::reconcile_failed(code, message)
    }
}

/// Local id for the user the identity service just acted on.
async fn local_user_id(
    state: &AppState,
    email: &str,
    operation: &'static str,
    code: &'static str,
    message: &'static str,
) -> Result<i64, ApiError> {
    state
        .store
        .find_user_id_by_email(email)
        .await
        .map_err(reconcile_failed(operation, code, message))?
        .ok_or_else(|| {
            warn!(operation, email, "user missing from local mirror");
            ApiError::not_found("User not found in DB")
        })
}

fn forwarded_authorization(headers: &HeaderMap) -> Result<&str, ApiError> {
    authorization_header(headers).ok_or_else(|| {
        ApiError::new(
            ErrorKind::Unauthenticated,
            codes::UNAUTHORIZED,
            "Missing Authorization token",
        )
    })
}

/// 32 random bytes, lowercase hex.
pub fn generate_reset_token() -> Result<String, ring::error::Unspecified> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    SystemRandom::new().fill(&mut bytes)?;
    Ok(hex::encode(bytes))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/register",
    request_body = RegisterStaffRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Staff registered", body = EnvelopeSchema),
        (status = 400, description = "Rejected by identity service", body = EnvelopeSchema),
        (status = 500, body = EnvelopeSchema),
        (status = 502, body = EnvelopeSchema)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterStaffRequest>,
) -> Result<ApiResponse<RegisterStaffResult>, ApiError> {
    let upstream = StaffRegistrationApiRequest::from(request);
    let (code, message, details) = state
        .identity
        .register_staff(&upstream)
        .await?
        .classify(&[ret_code::CHANGED])?
        .require_details()?;

    let stored = state
        .store
        .register_user(&details)
        .await
        .map_err(reconcile_failed("register", codes::INSERT_FAILED, "Inserting data failed"))?;

    info!(username = %details.username, staff_id = %details.staff_id, "staff registered");
    state.notifier.dispatch(Notification::TempPassword {
        to: details.email,
        username: details.username,
        institution_code: details.institution_code,
        temp_password: details.password,
    });

    Ok(ApiResponse::new(StatusCode::CREATED, code, message, Some(stored)))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Logged in", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 404, description = "Not mirrored locally", body = EnvelopeSchema)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<ApiResponse<LoginResult>, ApiError> {
    let (code, message, mut details) = state
        .identity
        .login(&request)
        .await?
        .classify(&[ret_code::LOGIN_OK])?
        .require_details()?;

    const FAILED: &str = "Failed to update login state";
    let user_id = local_user_id(&state, &details.email, "login", codes::INSERT_FAILED, FAILED).await?;
    state
        .store
        .mark_login(user_id)
        .await
        .map_err(reconcile_failed("login", codes::INSERT_FAILED, FAILED))?;
    details.user_id = user_id;

    Ok(ApiResponse::ok(code, message, details))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/logout",
    request_body = LogoutRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AppJson(request): AppJson<LogoutRequest>,
) -> Result<ApiResponse<LogoutResult>, ApiError> {
    let (code, message, mut details) = state
        .identity
        .logout(&request)
        .await?
        .classify(&[ret_code::LOGOUT_OK])?
        .require_details()?;

    const FAILED: &str = "Failed to update logout state";
    let user_id = local_user_id(&state, &details.email, "logout", codes::INSERT_FAILED, FAILED).await?;
    state
        .store
        .mark_logout(user_id)
        .await
        .map_err(reconcile_failed("logout", codes::INSERT_FAILED, FAILED))?;
    details.user_id = user_id;

    Ok(ApiResponse::ok(code, message, details))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/change-temp-password",
    request_body = ChangePasswordRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Password changed", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema)
    )
)]
pub async fn change_temp_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> Result<ApiResponse<ChangePasswordResult>, ApiError> {
    let (code, message, details) = state
        .identity
        .change_password(&request)
        .await?
        .classify(&[ret_code::CHANGED])?
        .require_details()?;

    const FAILED: &str = "Failed to update password locally";
    let user_id = local_user_id(
        &state,
        &details.email,
        "change_temp_password",
        codes::INSERT_FAILED,
        FAILED,
    )
    .await?;
    state
        .store
        .sync_password(user_id, &details.password)
        .await
        .map_err(reconcile_failed("change_temp_password", codes::INSERT_FAILED, FAILED))?;

    Ok(ApiResponse::ok(code, message, details))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/delete-user",
    request_body = DeleteUserRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "User deleted", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 401, description = "No Authorization header", body = EnvelopeSchema),
        (status = 404, description = "No local record for the user", body = EnvelopeSchema),
        (status = 500, body = EnvelopeSchema)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(request): AppJson<DeleteUserRequest>,
) -> Result<ApiResponse<Value>, ApiError> {
    let authorization = forwarded_authorization(&headers)?;

    let accepted = state
        .identity
        .delete_user(authorization, &request)
        .await?
        .classify(&[ret_code::DELETED])?;

    match state.store.soft_delete_user(&request.user_identity).await {
        Ok(()) => {}
        Err(StorageError::NotFound(_)) => {
            warn!(user_identity = %request.user_identity, "deleted upstream but not mirrored locally");
            return Err(ApiError::not_found("User not found in DB"));
        }
        Err(e) => {
            return Err(reconcile_failed("delete_user", codes::DELETE_FAILED, "Deleting Data Failed")(e));
        }
    }

    info!(user_identity = %request.user_identity, "user deleted");
    Ok(ApiResponse::new(StatusCode::OK, accepted.ret_code, accepted.message, None))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/update-user/{username}",
    params(("username" = String, Path, description = "Username as known to the identity service")),
    request_body = UpdateUserRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "User updated (or unchanged)", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 401, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AppPath(username): AppPath<String>,
    headers: HeaderMap,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> Result<ApiResponse<UpdateUserResult>, ApiError> {
    let authorization = forwarded_authorization(&headers)?;

    let (code, message, mut details) = state
        .identity
        .update_staff(authorization, &username, &request)
        .await?
        .classify(&[ret_code::CHANGED, ret_code::UNCHANGED])?
        .require_details()?;

    const FAILED: &str = "Updating Data Failed";
    let user_id = local_user_id(&state, &details.email, "update_user", codes::UPDATE_FAILED, FAILED).await?;
    details.user_id = user_id;
    state
        .store
        .update_user(user_id, &details)
        .await
        .map_err(reconcile_failed("update_user", codes::UPDATE_FAILED, FAILED))?;

    Ok(ApiResponse::ok(code, message, details))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Same answer whether or not the email is known", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema)
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ForgotPasswordRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(ApiError::bad_request(codes::UNAUTHORIZED, "Email is required"));
    }

    match state.store.find_user_id_by_email(email).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            info!("password reset requested for unknown email");
            return Ok(ApiResponse::message(codes::OK, FORGOT_PASSWORD_MESSAGE));
        }
        Err(e) => {
            warn!(error = %e, "user lookup failed during password reset request");
            return Ok(ApiResponse::message(codes::OK, FORGOT_PASSWORD_MESSAGE));
        }
    }

    let token = generate_reset_token().map_err(|_| {
        ApiError::internal(codes::TOKEN_GENERATION_FAILED, "Failed to generate reset token")
    })?;
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    state
        .store
        .save_reset_token(email, &token, expires_at)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to store reset token");
            ApiError::internal(codes::INSERT_FAILED, "Failed to save reset token")
        })?;

    state.notifier.dispatch(Notification::PasswordReset {
        to: email.to_string(),
        token,
    });

    Ok(ApiResponse::message(codes::OK, FORGOT_PASSWORD_MESSAGE))
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/verify-reset-token",
    request_body = VerifyResetTokenRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid; not consumed", body = EnvelopeSchema),
        (status = 400, description = "Missing, expired or used token", body = EnvelopeSchema)
    )
)]
pub async fn verify_reset_token(
    State(state): State<AppState>,
    AppJson(request): AppJson<VerifyResetTokenRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request(codes::UNAUTHORIZED, "Reset token is required"));
    }

    let stored = state.store.find_reset_token(token).await.unwrap_or_else(|e| {
        error!(error = %e, "reset token lookup failed");
        None
    });

    match stored {
        Some(record) if record.is_valid_at(Utc::now()) => {
            Ok(ApiResponse::message(codes::OK, "Token is valid"))
        }
        _ => Err(invalid_reset_token()),
    }
}

fn invalid_reset_token() -> ApiError {
    ApiError::bad_request(codes::INVALID_RESET_TOKEN, "Invalid or expired reset token")
}

#[utoipa::path(
    post,
    path = "/api/public/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Password reset; token consumed", body = EnvelopeSchema),
        (status = 400, body = EnvelopeSchema),
        (status = 404, body = EnvelopeSchema)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request(codes::UNAUTHORIZED, "Reset token is required"));
    }
    if request.new_password.is_empty() {
        return Err(ApiError::validation("New password is required"));
    }

    let email = state
        .store
        .consume_reset_token(token, Utc::now())
        .await
        .map_err(|e| {
            error!(error = %e, "failed to consume reset token");
            ApiError::internal(codes::INTERNAL, "Failed to reset password")
        })?
        .ok_or_else(invalid_reset_token)?;

    let account = state
        .store
        .find_account_by_email(&email)
        .await
        .map_err(|e| {
            error!(error = %e, "account lookup failed during password reset");
            ApiError::internal(codes::INTERNAL, "Failed to reset password")
        })?
        .ok_or_else(|| ApiError::not_found("User not found in DB"))?;

    let change = ChangePasswordRequest {
        username: account.username.clone(),
        new_password: request.new_password,
        institution_code: account.institution_code.clone(),
    };
    let (_, _, details) = state
        .identity
        .change_password(&change)
        .await?
        .classify(&[ret_code::CHANGED])?
        .require_details()?;

    state
        .store
        .sync_password(account.id, &details.password)
        .await
        .map_err(reconcile_failed(
            "reset_password",
            codes::INSERT_FAILED,
            "Failed to update password locally",
        ))?;

    info!(username = %account.username, "password reset completed");
    Ok(ApiResponse::message(codes::OK, "Password has been reset"))
}
