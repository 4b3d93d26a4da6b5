// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Test doubles shared by handler and middleware tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use crate::{
    identity::{IdentityError, IdentityResult, IdentityService},
    models::{
        auth::{
            ChangePasswordRequest, ChangePasswordResult, DeleteUserRequest, LoginRequest,
            LoginResult, LogoutRequest, LogoutResult, RegisterStaffResult,
            StaffRegistrationApiRequest, UpdateUserRequest, UpdateUserResult,
            ValidateTokenDetails,
        },
        from_lenient_value,
    },
    notify::{MailError, MailTransport, Notification, Notifier, OutgoingEmail},
    state::AppState,
    storage::memory::MemoryStore,
};

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Operation keys for [`MockIdentity::script`].
pub mod op {
    pub const VALIDATE: &str = "validate_token";
    pub const REGISTER: &str = "register_staff";
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const CHANGE_PASSWORD: &str = "change_password";
    pub const DELETE_USER: &str = "delete_user";
    pub const UPDATE_STAFF: &str = "update_staff";
}

#[derive(Default)]
struct Script {
    responses: HashMap<&'static str, Value>,
    requests: Vec<(&'static str, Value)>,
    authorizations: Vec<String>,
    transport_down: bool,
}

/// Identity service that replays scripted JSON responses.
#[derive(Default)]
pub struct MockIdentity {
    script: Mutex<Script>,
    calls: AtomicUsize,
}

impl MockIdentity {
    /// Wire-shaped result with `details` nested under `data`.
    pub fn response(ret_code: &str, message: &str, details: Value) -> Value {
        json!({
            "retCode": ret_code,
            "message": message,
            "data": {
                "message": message,
                "isSuccess": true,
                "error": null,
                "details": details,
            }
        })
    }

    pub fn validation(ret_code: &str, username: &str) -> Value {
        Self::response(
            ret_code,
            "Token checked",
            json!({"username": username, "insti_code": "0001", "insti_name": "Test Bank"}),
        )
    }

    pub fn script(&self, op: &'static str, response: Value) {
        self.lock().responses.insert(op, response);
    }

    pub fn set_validation(&self, response: Value) {
        self.script(op::VALIDATE, response);
    }

    pub fn fail_transport(&self) {
        self.lock().transport_down = true;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received for `op`, serialized.
    pub fn requests(&self, op: &str) -> Vec<Value> {
        self.lock()
            .requests
            .iter()
            .filter(|(name, _)| *name == op)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Forwarded `Authorization` values, in call order.
    pub fn authorizations(&self) -> Vec<String> {
        self.lock().authorizations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn respond<B: Serialize, T: DeserializeOwned>(
        &self,
        op: &'static str,
        request: &B,
        authorization: Option<&str>,
    ) -> IdentityResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.lock();
        script
            .requests
            .push((op, serde_json::to_value(request).unwrap()));
        if let Some(authorization) = authorization {
            script.authorizations.push(authorization.to_string());
        }
        if script.transport_down {
            return Err(IdentityError::Transport("connection refused".into()));
        }
        let raw = script
            .responses
            .get(op)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidResponse(format!("nothing scripted for {op}")))?;
        from_lenient_value(raw).map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn validate_token(&self, token: &str) -> IdentityResult<ValidateTokenDetails> {
        self.respond(op::VALIDATE, &token, None)
    }

    async fn register_staff(
        &self,
        req: &StaffRegistrationApiRequest,
    ) -> IdentityResult<RegisterStaffResult> {
        self.respond(op::REGISTER, req, None)
    }

    async fn login(&self, req: &LoginRequest) -> IdentityResult<LoginResult> {
        self.respond(op::LOGIN, req, None)
    }

    async fn logout(&self, req: &LogoutRequest) -> IdentityResult<LogoutResult> {
        self.respond(op::LOGOUT, req, None)
    }

    async fn change_password(
        &self,
        req: &ChangePasswordRequest,
    ) -> IdentityResult<ChangePasswordResult> {
        self.respond(op::CHANGE_PASSWORD, req, None)
    }

    async fn delete_user(
        &self,
        authorization: &str,
        req: &DeleteUserRequest,
    ) -> IdentityResult<Value> {
        self.respond(op::DELETE_USER, req, Some(authorization))
    }

    async fn update_staff(
        &self,
        authorization: &str,
        username: &str,
        req: &UpdateUserRequest,
    ) -> IdentityResult<UpdateUserResult> {
        let body = json!({"path_username": username, "body": req});
        self.respond(op::UPDATE_STAFF, &body, Some(authorization))
    }
}

/// Mail transport that keeps what it was given.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MailError::Smtp("relay refused".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Store, identity double and notification queue wired into an [`AppState`].
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MockIdentity>,
    notifier: Notifier,
    queue: Mutex<mpsc::Receiver<Notification>>,
}

impl TestContext {
    pub fn new() -> Self {
        let (notifier, rx) = Notifier::channel(16);
        Self {
            store: Arc::new(MemoryStore::new()),
            identity: Arc::new(MockIdentity::default()),
            notifier,
            queue: Mutex::new(rx),
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.store.clone(), self.identity.clone(), self.notifier.clone())
    }

    /// Drain notifications enqueued so far.
    pub fn queued(&self) -> Vec<Notification> {
        let mut rx = self.queue.lock().unwrap();
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }
}

/// Drive one request through `app` and decode the envelope.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
    authorization: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(authorization) = authorization {
        builder = builder.header(header::AUTHORIZATION, authorization);
    }
    let body = match body {
        Some(raw) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(raw.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
