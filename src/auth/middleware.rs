// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Auth gate and permission gate middleware.
//!
//! ```rust,ignore
//! let rbac = Router::new()
//!     .route("/roles", get(list_roles).route_layer(from_fn_with_state(
//!         RequiredPermission("view:role"),
//!         require_permission,
//!     )))
//!     .route_layer(from_fn_with_state(state.clone(), auth_gate));
//! ```

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use super::{bearer_from_headers, AuthError, AuthenticatedUser, VerifiedIdentity};
use crate::{
    identity::{ret_code, IdentityError},
    state::AppState,
};

/// Validate the bearer token upstream and attach a [`VerifiedIdentity`].
pub async fn auth_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let authenticated = authenticate(&state, request.headers()).await;
    match authenticated {
        Ok(user) => {
            request.extensions_mut().insert(VerifiedIdentity::new(user));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Token validation followed by the local user lookup.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_from_headers(headers)?;

    let result = state
        .identity
        .validate_token(token)
        .await
        .map_err(|e| {
            warn!(error = %e, "token validation call failed");
            match e {
                IdentityError::Transport(_) | IdentityError::InvalidRequest(_) => {
                    AuthError::ValidationFailed
                }
                IdentityError::InvalidResponse(_) => AuthError::UnparseableValidation,
            }
        })?;

    match result.ret_code.as_str() {
        ret_code::TOKEN_VALID => {}
        ret_code::TOKEN_TERMINATED => return Err(AuthError::TokenRevoked),
        other => {
            debug!(ret_code = other, "token rejected by identity service");
            return Err(AuthError::ValidationFailed);
        }
    }

    let details = result
        .into_details()
        .filter(|d| !d.username.is_empty())
        .ok_or(AuthError::ValidationFailed)?;

    let user = state
        .store
        .find_user_by_username(&details.username)
        .await
        .map_err(|e| {
            error!(username = %details.username, error = %e, "user lookup failed");
            AuthError::UserLookupFailed
        })?
        .ok_or(AuthError::UserLookupFailed)?;

    let user = AuthenticatedUser::from_records(&details, user);
    debug!(
        username = %user.username,
        role = ?user.role_name,
        permissions = user.permissions.len(),
        "authenticated"
    );
    Ok(user)
}

/// Permission string a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredPermission(pub &'static str);

/// Reject unless the attached identity holds the required permission.
pub async fn require_permission(
    State(RequiredPermission(permission)): State<RequiredPermission>,
    request: Request,
    next: Next,
) -> Response {
    let Some(identity) = request.extensions().get::<VerifiedIdentity>() else {
        return AuthError::MissingIdentity.into_response();
    };
    if !identity.user().has_permission(permission) {
        debug!(
            username = %identity.user().username,
            permission,
            "permission denied"
        );
        return AuthError::InsufficientPermissions.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::claims::SUPER_ADMIN,
        identity::ret_code,
        models::auth::UserWithPermissions,
        test_support::{bearer, MockIdentity, TestContext},
    };
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    fn seeded(role: &str, permissions: &[&str]) -> TestContext {
        let ctx = TestContext::new();
        ctx.identity.set_validation(MockIdentity::validation(ret_code::TOKEN_VALID, "jdoe"));
        ctx.store.insert_user(UserWithPermissions {
            id: 5,
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            role_name: Some(role.into()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        });
        ctx
    }

    #[tokio::test]
    async fn valid_token_yields_user() {
        let ctx = seeded("teller", &["view:role"]);
        let user = authenticate(&ctx.state(), &headers(&bearer("t"))).await.unwrap();
        assert_eq!(user.user_id, 5);
        assert!(user.has_permission("view:role"));
    }

    #[tokio::test]
    async fn terminated_token_is_revoked() {
        let ctx = seeded("teller", &[]);
        ctx.identity
            .set_validation(MockIdentity::validation(ret_code::TOKEN_TERMINATED, "jdoe"));
        let err = authenticate(&ctx.state(), &headers(&bearer("t"))).await.unwrap_err();
        assert_eq!(err, AuthError::TokenRevoked);
        assert_eq!(ctx.store.calls(), 0);
    }

    #[tokio::test]
    async fn other_codes_are_unauthenticated() {
        let ctx = seeded("teller", &[]);
        ctx.identity.set_validation(MockIdentity::validation("401", "jdoe"));
        let err = authenticate(&ctx.state(), &headers(&bearer("t"))).await.unwrap_err();
        assert_eq!(err, AuthError::ValidationFailed);
    }

    #[tokio::test]
    async fn transport_failure_is_unauthenticated() {
        let ctx = seeded("teller", &[]);
        ctx.identity.fail_transport();
        let err = authenticate(&ctx.state(), &headers(&bearer("t"))).await.unwrap_err();
        assert_eq!(err, AuthError::ValidationFailed);
    }

    #[tokio::test]
    async fn unknown_local_user_is_internal() {
        let ctx = TestContext::new();
        ctx.identity.set_validation(MockIdentity::validation(ret_code::TOKEN_VALID, "ghost"));
        let err = authenticate(&ctx.state(), &headers(&bearer("t"))).await.unwrap_err();
        assert_eq!(err, AuthError::UserLookupFailed);
    }

    #[tokio::test]
    async fn malformed_header_skips_upstream() {
        let ctx = seeded("teller", &[]);
        let err = authenticate(&ctx.state(), &headers("Token abc")).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidAuthHeader);
        assert_eq!(ctx.identity.calls(), 0);
    }

    fn gated_app(ctx: &TestContext, permission: &'static str) -> Router {
        let state = ctx.state();
        Router::new()
            .route(
                "/guarded",
                get(|| async { "ok" })
                    .route_layer(from_fn_with_state(RequiredPermission(permission), require_permission)),
            )
            .route_layer(from_fn_with_state(state.clone(), auth_gate))
            .with_state(state)
    }

    async fn status_of(app: Router) -> StatusCode {
        app.oneshot(
            HttpRequest::builder()
                .uri("/guarded")
                .header(AUTHORIZATION, bearer("t"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn gate_allows_exact_permission() {
        let ctx = seeded("teller", &["view:role"]);
        assert_eq!(status_of(gated_app(&ctx, "view:role")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn gate_rejects_near_miss() {
        let ctx = seeded("teller", &["view:role"]);
        assert_eq!(status_of(gated_app(&ctx, "view:roles")).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn gate_passes_super_admin() {
        let ctx = seeded(SUPER_ADMIN, &[]);
        assert_eq!(status_of(gated_app(&ctx, "delete:permission")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn permission_gate_without_auth_gate_is_token_missing() {
        let app: Router = Router::new().route(
            "/guarded",
            get(|| async { "ok" })
                .route_layer(from_fn_with_state(RequiredPermission("view:role"), require_permission)),
        );
        let response = app
            .oneshot(HttpRequest::builder().uri("/guarded").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["code"], "111");
    }
}
