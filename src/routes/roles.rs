// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role lookup, role assignment, and permission flags.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::db::{collections, Document};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Role, RoleSource};
use crate::routes::SuccessResponse;
use crate::time_utils::now_rfc3339;
use crate::AppState;

/// Role lookups open to any authenticated user.
///
/// The four check-role paths are historic aliases with identical behavior.
pub fn member_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/check-role", get(check_role))
        .route("/api/admin/check-role-safe", get(check_role))
        .route("/api/admin/check-role-simple", get(check_role))
        .route("/api/member/check-role", get(check_role))
        .route("/api/user/permissions", get(get_permissions))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/set-user-role", post(set_user_role))
}

#[derive(Deserialize)]
pub struct CheckRoleQuery {
    uid: Option<String>,
}

#[derive(Serialize)]
pub struct CheckRoleResponse {
    pub role: Role,
    pub profile: Option<Document>,
    pub source: RoleSource,
}

/// Resolve the role of `?uid=`. Members may only look themselves up.
async fn check_role(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<CheckRoleQuery>,
) -> Result<Json<CheckRoleResponse>> {
    let uid = params
        .uid
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("uid is required".to_string()))?;

    if uid != user.uid && !user.is_admin() {
        tracing::warn!(caller = %user.uid, target = %uid, "Role lookup for another user denied");
        return Err(AppError::Forbidden(
            "Cannot look up another user's role".to_string(),
        ));
    }

    let resolved = state.roles.resolve(&uid).await?;
    tracing::debug!(uid = %uid, role = %resolved.role, source = ?resolved.source, "Role resolved");

    Ok(Json(CheckRoleResponse {
        role: resolved.role,
        profile: resolved.profile,
        source: resolved.source,
    }))
}

#[derive(Deserialize)]
pub struct SetUserRoleRequest {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

async fn set_user_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<SetUserRoleRequest>,
) -> Result<Json<SuccessResponse>> {
    let uid = body
        .uid
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("uid is required".to_string()))?;
    let role = body
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| AppError::BadRequest("role must be \"admin\" or \"member\"".to_string()))?;

    state.identity.set_custom_role(&uid, role).await?;

    let mut fields = Document::new();
    fields.insert("role".to_string(), json!(role.as_str()));
    fields.insert("updatedAt".to_string(), json!(now_rfc3339()));
    state.db.merge(collections::USERS, &uid, fields).await?;

    tracing::info!(by = %admin.uid, uid = %uid, role = %role, "User role updated");

    Ok(SuccessResponse::ok())
}

/// Capability flags derived from a role.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub role: Role,
    pub can_manage_members: bool,
    pub can_manage_posts: bool,
    pub can_manage_attendance: bool,
    pub can_manage_notifications: bool,
    pub can_view_analytics: bool,
    pub can_edit_profile: bool,
    pub can_delete_posts: bool,
    pub can_schedule_notifications: bool,
    pub can_view_all_attendance: bool,
    pub can_export_data: bool,
}

impl Permissions {
    pub fn for_role(role: Role) -> Self {
        let admin = role.is_admin();
        Self {
            role,
            can_manage_members: admin,
            can_manage_posts: admin,
            can_manage_attendance: admin,
            can_manage_notifications: admin,
            can_view_analytics: admin,
            can_edit_profile: true,
            can_delete_posts: admin,
            can_schedule_notifications: admin,
            can_view_all_attendance: admin,
            can_export_data: admin,
        }
    }
}

#[derive(Serialize)]
pub struct PermissionsResponse {
    pub permissions: Permissions,
}

async fn get_permissions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PermissionsResponse>> {
    let resolved = state.roles.resolve(&user.uid).await?;
    Ok(Json(PermissionsResponse {
        permissions: Permissions::for_role(resolved.role),
    }))
}
