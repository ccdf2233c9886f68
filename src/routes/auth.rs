// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: exchange an identity token for a session cookie, inspect
//! and refresh the session, and log out.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{Config, SESSION_COOKIE_NAME, SESSION_MAX_AGE_SECS};
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_token, AuthUser};
use crate::models::{Role, RoleSource};
use crate::routes::SuccessResponse;
use crate::AppState;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Session creation and logout (no session required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/session", post(create_session).delete(delete_session))
}

/// Session inspection and refresh (session required).
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/me", get(get_session))
        .route("/api/auth/session/refresh", post(refresh_session))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    id_token: Option<String>,
}

/// Exchange a verified identity token for a session cookie.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(CookieJar, Json<SuccessResponse>)> {
    let id_token = body
        .id_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("ID token is required".to_string()))?;

    let identity = state.identity.verify_id_token(&id_token).await.map_err(|e| {
        tracing::warn!(error = %e, "Session creation rejected");
        AppError::from(e)
    })?;

    let resolved = state
        .roles
        .resolve_with_claim(&identity.uid, identity.role_claim)
        .await?;

    tracing::info!(
        uid = %identity.uid,
        role = %resolved.role,
        source = ?resolved.source,
        "Session created"
    );

    let cookie = issue_session_cookie(
        &state.config,
        &identity.uid,
        identity.email.as_deref(),
        resolved.role,
    )?;

    Ok((jar.add(cookie), SuccessResponse::ok()))
}

/// Clear the session cookie. Always succeeds.
async fn delete_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessResponse>) {
    let cleared = Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies())
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    (jar.add(cleared), SuccessResponse::ok())
}

/// Current session, as seen by the server.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub uid: String,
    pub email: Option<String>,
    pub role: Role,
    /// Unix timestamp; absent for bearer-token requests
    pub expires_at: Option<u64>,
}

async fn get_session(Extension(user): Extension<AuthUser>) -> Json<SessionResponse> {
    Json(SessionResponse {
        uid: user.uid,
        email: user.email,
        role: user.role,
        expires_at: user.expires_at.map(|exp| exp as u64),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub role: Role,
    pub source: RoleSource,
    pub expires_at: u64,
}

/// Re-resolve the caller's role and re-issue the session cookie.
async fn refresh_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>)> {
    let resolved = state.roles.resolve(&user.uid).await?;

    if resolved.role != user.role {
        tracing::info!(
            uid = %user.uid,
            from = %user.role,
            to = %resolved.role,
            "Role changed on refresh"
        );
    }

    let (token, expires_at) = create_session_token(
        &user.uid,
        user.email.as_deref(),
        resolved.role,
        &state.config.session_signing_key,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Session token creation failed: {}", e)))?;

    Ok((
        jar.add(session_cookie(&state.config, token)),
        Json(RefreshResponse {
            success: true,
            role: resolved.role,
            source: resolved.source,
            expires_at: expires_at as u64,
        }),
    ))
}

fn issue_session_cookie(
    config: &Config,
    uid: &str,
    email: Option<&str>,
    role: Role,
) -> Result<Cookie<'static>> {
    let (token, _) = create_session_token(uid, email, role, &config.session_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session token creation failed: {}", e)))?;
    Ok(session_cookie(config, token))
}

fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .path("/")
        .max_age(time::Duration::seconds(SESSION_MAX_AGE_SECS))
        .build()
}
