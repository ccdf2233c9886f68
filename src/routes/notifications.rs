// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification templates, schedules, and push delivery.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::db::{self, collections, Direction, Document};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::notification::{DEFAULT_AUDIENCE, DEFAULT_CATEGORY};
use crate::models::{NotificationSchedule, NotificationTemplate, ScheduleEntry, TemplateEntry};
use crate::services::push::{Audience, PushMessage};
use crate::time_utils::{format_utc_rfc3339, now_rfc3339, parse_rfc3339};
use crate::AppState;

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/notifications/templates",
            get(list_templates).post(create_template),
        )
        .route(
            "/api/notifications/schedules",
            get(list_schedules).post(create_schedule),
        )
        .route("/api/notifications/send", post(send_notification))
}

/// Documents of a collection as stored, each with its id folded in.
///
/// Listing is lenient: documents written by older clients may lack fields
/// the typed models require, and they are still returned.
async fn list_raw(
    state: &AppState,
    collection: &str,
    order_field: &str,
    direction: Direction,
) -> Result<Vec<Document>> {
    Ok(state
        .db
        .query::<Document>(collection, &db::Query::new().order_by(order_field, direction))
        .await?
        .into_iter()
        .map(|(id, mut doc)| {
            doc.insert("id".to_string(), Value::String(id));
            doc
        })
        .collect())
}

#[derive(Serialize)]
pub struct TemplatesResponse {
    pub templates: Vec<Document>,
}

/// All templates, newest first.
async fn list_templates(State(state): State<Arc<AppState>>) -> Result<Json<TemplatesResponse>> {
    let templates = list_raw(
        &state,
        collections::NOTIFICATION_TEMPLATES,
        "createdAt",
        Direction::Descending,
    )
    .await?;

    Ok(Json(TemplatesResponse { templates }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    target_audience: Option<String>,
    #[serde(default)]
    variables: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateResponse {
    pub success: bool,
    pub template_id: String,
    pub template: TemplateEntry,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn create_template(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<CreateTemplateRequest>,
) -> Result<Json<CreateTemplateResponse>> {
    let (Some(name), Some(title), Some(message)) = (
        non_empty(body.name),
        non_empty(body.title),
        non_empty(body.message),
    ) else {
        return Err(AppError::BadRequest(
            "Name, title and message are required".to_string(),
        ));
    };

    let template = NotificationTemplate {
        name,
        title,
        message,
        category: non_empty(body.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        target_audience: non_empty(body.target_audience)
            .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
        variables: body.variables.unwrap_or_default(),
        created_by: Some(admin.uid.clone()),
        created_at: now_rfc3339(),
        is_active: true,
    };

    let template_id = state
        .db
        .create(collections::NOTIFICATION_TEMPLATES, &template)
        .await?;

    tracing::info!(template_id = %template_id, by = %admin.uid, "Notification template created");

    Ok(Json(CreateTemplateResponse {
        success: true,
        template: TemplateEntry {
            id: template_id.clone(),
            template,
        },
        template_id,
    }))
}

#[derive(Serialize)]
pub struct SchedulesResponse {
    pub schedules: Vec<Document>,
}

/// All schedules, soonest first.
async fn list_schedules(State(state): State<Arc<AppState>>) -> Result<Json<SchedulesResponse>> {
    let schedules = list_raw(
        &state,
        collections::NOTIFICATION_SCHEDULES,
        "scheduledTime",
        Direction::Ascending,
    )
    .await?;

    Ok(Json(SchedulesResponse { schedules }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    #[serde(default)]
    template_id: Option<String>,
    #[serde(default)]
    scheduled_time: Option<String>,
    #[serde(default)]
    recurring_pattern: Option<String>,
    #[serde(default)]
    target_audience: Option<String>,
    #[serde(default)]
    target_ids: Option<Vec<String>>,
    #[serde(default)]
    variables: Option<Map<String, Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleResponse {
    pub success: bool,
    pub schedule_id: String,
    pub schedule: ScheduleEntry,
}

/// Store a planned delivery of an existing template. Delivery itself is
/// left to whatever worker reads `nextSend`.
async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<CreateScheduleRequest>,
) -> Result<Json<CreateScheduleResponse>> {
    let (Some(template_id), Some(scheduled_time)) =
        (non_empty(body.template_id), non_empty(body.scheduled_time))
    else {
        return Err(AppError::BadRequest(
            "Template ID and scheduled time are required".to_string(),
        ));
    };
    let scheduled_time = parse_rfc3339(&scheduled_time)
        .map(format_utc_rfc3339)
        .ok_or_else(|| {
            AppError::BadRequest("scheduledTime must be an RFC 3339 timestamp".to_string())
        })?;

    if !state
        .db
        .exists(collections::NOTIFICATION_TEMPLATES, &template_id)
        .await?
    {
        return Err(AppError::NotFound(format!("template {template_id}")));
    }

    let schedule = NotificationSchedule {
        template_id,
        next_send: scheduled_time.clone(),
        scheduled_time,
        recurring_pattern: non_empty(body.recurring_pattern),
        target_audience: non_empty(body.target_audience)
            .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
        target_ids: body.target_ids.unwrap_or_default(),
        variables: body.variables.unwrap_or_default(),
        is_active: true,
        created_by: Some(admin.uid.clone()),
        created_at: now_rfc3339(),
    };

    let schedule_id = state
        .db
        .create(collections::NOTIFICATION_SCHEDULES, &schedule)
        .await?;

    tracing::info!(
        schedule_id = %schedule_id,
        template_id = %schedule.template_id,
        next_send = %schedule.next_send,
        by = %admin.uid,
        "Notification scheduled"
    );

    Ok(Json(CreateScheduleResponse {
        success: true,
        schedule: ScheduleEntry {
            id: schedule_id.clone(),
            schedule,
        },
        schedule_id,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    target_audience: Option<String>,
    #[serde(default)]
    target_ids: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub result: Value,
}

/// Map the wire audience onto a push audience.
fn parse_audience(raw: Option<&str>, target_ids: Option<Vec<String>>) -> Result<Audience> {
    match raw.unwrap_or(DEFAULT_AUDIENCE) {
        "all" => Ok(Audience::All),
        "individuals" => {
            let ids: Vec<String> = target_ids
                .unwrap_or_default()
                .into_iter()
                .filter(|id| !id.is_empty())
                .collect();
            if ids.is_empty() {
                return Err(AppError::BadRequest(
                    "targetIds is required for individual notifications".to_string(),
                ));
            }
            Ok(Audience::Individuals(ids))
        }
        other => Err(AppError::BadRequest(format!(
            "Unsupported target audience: {other}"
        ))),
    }
}

async fn send_notification(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<SendRequest>,
) -> Result<Json<SendResponse>> {
    let (Some(title), Some(message)) = (non_empty(body.title), non_empty(body.message)) else {
        return Err(AppError::BadRequest(
            "Title and message are required".to_string(),
        ));
    };
    let audience = parse_audience(body.target_audience.as_deref(), body.target_ids)?;

    let push = PushMessage {
        title,
        message,
        audience,
    };
    let result = state.push.send(&push).await?;

    tracing::info!(by = %admin.uid, audience = ?push.audience, "Notification sent");

    Ok(Json(SendResponse {
        success: true,
        result,
    }))
}
