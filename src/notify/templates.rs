// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! HTML bodies for outgoing emails, rendered with Handlebars.
//!
//! Every `{{value}}` is HTML-escaped by the registry's default escape
//! function, so user-supplied fields cannot inject markup.

use handlebars::Handlebars;
use serde_json::json;

use super::{MailError, Notification, OutgoingEmail};

pub const TEMP_PASSWORD_SUBJECT: &str = "Welcome to iProvidence - Your Account is Ready";
pub const PASSWORD_RESET_SUBJECT: &str = "iProvidence - Password Reset Request";

/// Minutes a reset link stays valid, as shown to the recipient.
pub const RESET_LINK_MINUTES: i64 = 5;

const TEMP_PASSWORD_TEMPLATE: &str = "temp-password";
const PASSWORD_RESET_TEMPLATE: &str = "password-reset";

const TEMP_PASSWORD_HTML: &str = r#"<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Welcome to iProvidence</h2>
  <p>Your staff account has been created. Use the credentials below to sign in.</p>
  <table>
    <tr><td><strong>Username:</strong></td><td>{{username}}</td></tr>
    <tr><td><strong>Institution Code:</strong></td><td>{{institution_code}}</td></tr>
    <tr><td><strong>Temporary Password:</strong></td><td><code>{{temp_password}}</code></td></tr>
  </table>
  <p><strong>Security notice:</strong> you will be asked to change this password on first login.
  Do not share it with anyone.</p>
</body>
</html>"#;

const PASSWORD_RESET_HTML: &str = r#"<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Password Reset Request</h2>
  <p>We received a request to reset your iProvidence password.</p>
  <p><a href="{{base_url}}/reset-password?token={{token}}">Reset your password</a></p>
  <p>This link expires in {{minutes}} minutes. If you did not request a reset, ignore this email.</p>
</body>
</html>"#;

/// Link the recipient follows to choose a new password.
pub fn reset_link(app_base_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", app_base_url.trim_end_matches('/'), token)
}

/// Strict-mode template registry plus the frontend base URL for links.
#[derive(Debug, Clone)]
pub struct EmailRenderer {
    registry: Handlebars<'static>,
    app_base_url: String,
}

impl EmailRenderer {
    pub fn new(app_base_url: impl Into<String>) -> Result<Self, MailError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(TEMP_PASSWORD_TEMPLATE, TEMP_PASSWORD_HTML)
            .map_err(|e| MailError::Template(e.to_string()))?;
        registry
            .register_template_string(PASSWORD_RESET_TEMPLATE, PASSWORD_RESET_HTML)
            .map_err(|e| MailError::Template(e.to_string()))?;

        Ok(Self {
            registry,
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn render(&self, notification: Notification) -> Result<OutgoingEmail, MailError> {
        let (to, subject, template, data) = match notification {
            Notification::TempPassword {
                to,
                username,
                institution_code,
                temp_password,
            } => (
                to,
                TEMP_PASSWORD_SUBJECT,
                TEMP_PASSWORD_TEMPLATE,
                json!({
                    "username": username,
                    "institution_code": institution_code,
                    "temp_password": temp_password,
                }),
            ),
            Notification::PasswordReset { to, token } => (
                to,
                PASSWORD_RESET_SUBJECT,
                PASSWORD_RESET_TEMPLATE,
                json!({
                    "base_url": self.app_base_url,
                    "token": token,
                    "minutes": RESET_LINK_MINUTES,
                }),
            ),
        };

        let html = self
            .registry
            .render(template, &data)
            .map_err(|e| MailError::Template(e.to_string()))?;
        Ok(OutgoingEmail {
            to,
            subject: subject.to_string(),
            html,
        })
    }
}
