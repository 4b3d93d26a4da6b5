// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`AppConfig`] loaded from
//! them at startup. A `.env` file in the working directory is honoured.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATABASE_URL` | PostgreSQL connection string | Required |
//! | `DATABASE_MAX_CONNECTIONS` | Pool size | `10` |
//! | `CAGABAY_BASE_URL` | Identity service base URL | Required |
//! | `CAGABAY_API_KEY` | Identity service API key (`x-api-key`) | Required |
//! | `SMTP_HOST` | SMTP relay host; unset disables email | Optional |
//! | `SMTP_PORT` | SMTP relay port | `587` |
//! | `SMTP_USER` | SMTP username | Optional |
//! | `SMTP_PASS` | SMTP password | Optional |
//! | `SMTP_FROM` | Sender address | `SMTP_USER` |
//! | `APP_BASE_URL` | Frontend base URL for reset links | `http://localhost:3000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DATABASE_MAX_CONNECTIONS_ENV: &str = "DATABASE_MAX_CONNECTIONS";
pub const CAGABAY_BASE_URL_ENV: &str = "CAGABAY_BASE_URL";
pub const CAGABAY_API_KEY_ENV: &str = "CAGABAY_API_KEY";
pub const SMTP_HOST_ENV: &str = "SMTP_HOST";
pub const SMTP_PORT_ENV: &str = "SMTP_PORT";
pub const SMTP_USER_ENV: &str = "SMTP_USER";
pub const SMTP_PASS_ENV: &str = "SMTP_PASS";
pub const SMTP_FROM_ENV: &str = "SMTP_FROM";
pub const APP_BASE_URL_ENV: &str = "APP_BASE_URL";

/// `json` for structured output, anything else for human-readable.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// SMTP relay settings. Absent when `SMTP_HOST` is unset.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub identity_base_url: String,
    pub identity_api_key: String,
    pub smtp: Option<SmtpConfig>,
    pub app_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let database_url = required(DATABASE_URL_ENV)?;
        let database_max_connections = parse_or(
            get(DATABASE_MAX_CONNECTIONS_ENV),
            DATABASE_MAX_CONNECTIONS_ENV,
            DEFAULT_MAX_CONNECTIONS,
        )?;

        let identity_base_url = required(CAGABAY_BASE_URL_ENV)?;
        url::Url::parse(&identity_base_url).map_err(|e| ConfigError::Invalid {
            name: CAGABAY_BASE_URL_ENV,
            reason: e.to_string(),
        })?;
        let identity_api_key = required(CAGABAY_API_KEY_ENV)?;

        let smtp = match get(SMTP_HOST_ENV) {
            Some(host) => {
                let username = get(SMTP_USER_ENV);
                let from = get(SMTP_FROM_ENV)
                    .or_else(|| username.clone())
                    .ok_or(ConfigError::Missing(SMTP_FROM_ENV))?;
                Some(SmtpConfig {
                    host,
                    port: parse_or(get(SMTP_PORT_ENV), SMTP_PORT_ENV, DEFAULT_SMTP_PORT)?,
                    username,
                    password: get(SMTP_PASS_ENV),
                    from,
                })
            }
            None => None,
        };

        let app_base_url = get(APP_BASE_URL_ENV)
            .unwrap_or_else(|| DEFAULT_APP_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            host,
            port,
            database_url,
            database_max_connections,
            identity_base_url: identity_base_url.trim_end_matches('/').to_string(),
            identity_api_key,
            smtp,
            app_base_url,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
