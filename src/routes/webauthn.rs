// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WebAuthn authentication challenges and credential listing.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::collections;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{CredentialSummary, WebauthnUser};
use crate::services::webauthn::{begin_authentication, IssuedChallenge};
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/webauthn/authenticate/begin", post(begin))
}

pub fn member_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/webauthn/credentials/{user_id}", get(list_credentials))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    allow_credentials: Vec<String>,
}

async fn begin(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BeginRequest>,
) -> Result<Json<IssuedChallenge>> {
    let user_id = body.user_id.filter(|u| !u.is_empty());

    let issued = begin_authentication(
        &state.db,
        &state.config.webauthn_rp_id,
        user_id.as_deref(),
        &body.allow_credentials,
    )
    .await?;

    Ok(Json(issued))
}

#[derive(Serialize)]
pub struct CredentialsResponse {
    pub credentials: Vec<CredentialSummary>,
}

/// Registered authenticators of a user, without key material.
async fn list_credentials(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<CredentialsResponse>> {
    if user_id != user.uid && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Cannot list another user's credentials".to_string(),
        ));
    }

    let credentials = state
        .db
        .get::<WebauthnUser>(collections::WEBAUTHN_USERS, &user_id)
        .await?
        .unwrap_or_default()
        .credentials
        .into_iter()
        .map(CredentialSummary::from)
        .collect();

    Ok(Json(CredentialsResponse { credentials }))
}
