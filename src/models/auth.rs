// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Registration
// =============================================================================

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct RegisterStaffRequest {
    pub staff_id: String,
    pub institution_code: String,
    pub birthdate: String,
}

/// Payload forwarded to the identity service's staff registration.
///
/// The identity service requires personal fields the gateway does not
/// collect yet, so fixed placeholders are sent in their place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffRegistrationApiRequest {
    pub username: String,
    pub staff_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    pub birthdate: String,
    pub institution_code: String,
}

pub const PLACEHOLDER_FIRST_NAME: &str = "first_name";
pub const PLACEHOLDER_MIDDLE_NAME: &str = "middle_name";
pub const PLACEHOLDER_LAST_NAME: &str = "last_name";
pub const PLACEHOLDER_EMAIL: &str = "email@gmail.com";
pub const PLACEHOLDER_PHONE_NO: &str = "09123456789";

impl From<RegisterStaffRequest> for StaffRegistrationApiRequest {
    fn from(req: RegisterStaffRequest) -> Self {
        Self {
            username: String::new(),
            staff_id: req.staff_id,
            first_name: PLACEHOLDER_FIRST_NAME.to_string(),
            middle_name: PLACEHOLDER_MIDDLE_NAME.to_string(),
            last_name: PLACEHOLDER_LAST_NAME.to_string(),
            email: PLACEHOLDER_EMAIL.to_string(),
            phone_no: PLACEHOLDER_PHONE_NO.to_string(),
            birthdate: req.birthdate,
            institution_code: req.institution_code,
        }
    }
}

/// Registered staff record, including the temporary password.
///
/// Serialized as-is into `register_user(jsonb)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct RegisterStaffResult {
    pub user_id: i64,
    pub username: String,
    pub staff_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    pub birthdate: String,
    pub institution_id: i64,
    pub institution_code: String,
    pub institution_name: String,
    /// Temporary password issued by the identity service.
    pub password: String,
}

// =============================================================================
// Login / Logout
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct LoginRequest {
    /// Username or email.
    pub user_identity: String,
    pub password: String,
    pub institution_code: String,
}

/// Login details. `user_id` is overwritten with the local mirror id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct LoginResult {
    pub user_id: i64,
    pub username: String,
    pub staff_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    pub last_login: String,
    pub is_logged_in: bool,
    pub institution_id: i64,
    pub institution_code: String,
    pub institution_name: String,
    pub requires_password_reset: bool,
    pub last_password_reset: String,
    pub token: String,
    pub is_2fa_required: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct LogoutRequest {
    pub user_identity: String,
    pub institution_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct LogoutResult {
    pub user_id: i64,
    pub username: String,
    pub staff_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    pub last_login: String,
    pub institution_id: i64,
    pub institution_code: String,
    pub institution_name: String,
}

// =============================================================================
// Password change
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub username: String,
    pub new_password: String,
    pub institution_code: String,
}

/// Identity-service view of the user after a password change.
///
/// `password` carries the new credential as stored upstream and is what the
/// local mirror is synchronised to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ChangePasswordResult {
    pub staff_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    pub birthdate: String,
    pub institution_name: String,
    pub password: String,
}

// =============================================================================
// Delete / Update
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct DeleteUserRequest {
    /// Username or email.
    pub user_identity: String,
    pub institution_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub username: String,
    pub staff_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    pub institution_code: String,
    pub birthdate: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateUserResult {
    pub user_id: i64,
    pub username: String,
    pub staff_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    pub birthdate: String,
    pub last_login: String,
    pub institution_id: i64,
    pub institution_code: String,
    pub institution_name: String,
}

// =============================================================================
// Forgot / reset password
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct VerifyResetTokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// A stored password-reset token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub email: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl ResetToken {
    /// Unused and strictly before expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && now < self.expires_at
    }
}

/// Minimal account facts needed to drive an upstream password change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub id: i64,
    pub username: String,
    pub institution_code: String,
}

// =============================================================================
// Token validation / current user
// =============================================================================

/// Identity facts returned by a successful token validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidateTokenDetails {
    pub username: String,
    pub insti_code: String,
    pub insti_name: String,
    pub app_code: String,
    pub app_name: String,
}

/// Local user row joined with its role's permission strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserWithPermissions {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub staff_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: Duration, used: bool) -> (ResetToken, DateTime<Utc>) {
        let now = Utc::now();
        let token = ResetToken {
            email: "staff@example.com".into(),
            token: "ab".repeat(32),
            created_at: now,
            expires_at: now + expires_in,
            used_at: used.then_some(now),
        };
        (token, now)
    }

    #[test]
    fn fresh_token_is_valid() {
        let (token, now) = token(Duration::minutes(30), false);
        assert!(token.is_valid_at(now));
    }

    #[test]
    fn used_token_is_invalid() {
        let (token, now) = token(Duration::minutes(30), true);
        assert!(!token.is_valid_at(now));
    }

    #[test]
    fn token_is_invalid_at_expiry() {
        let (token, _) = token(Duration::minutes(30), false);
        assert!(!token.is_valid_at(token.expires_at));
    }

    #[test]
    fn registration_payload_uses_placeholders() {
        let api: StaffRegistrationApiRequest = RegisterStaffRequest {
            staff_id: "S-1".into(),
            institution_code: "0001".into(),
            birthdate: "1990-01-01".into(),
        }
        .into();
        assert_eq!(api.staff_id, "S-1");
        assert_eq!(api.email, PLACEHOLDER_EMAIL);
        assert!(api.username.is_empty());
    }

    #[test]
    fn missing_request_fields_default_to_empty() {
        let req: LoginRequest = serde_json::from_str(r#"{"user_identity":"jdoe"}"#).unwrap();
        assert_eq!(req.user_identity, "jdoe");
        assert!(req.password.is_empty());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn validity_is_monotone_in_time(offset_secs in 0i64..86_400, later_secs in 0i64..86_400) {
                let (token, now) = token(Duration::seconds(offset_secs), false);
                let earlier = now;
                let later = now + Duration::seconds(later_secs);
                if !token.is_valid_at(earlier) {
                    prop_assert!(!token.is_valid_at(later));
                }
                if token.is_valid_at(later) {
                    prop_assert!(token.is_valid_at(earlier));
                }
            }
        }
    }
}
