// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification template and schedule models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CATEGORY: &str = "custom";
pub const DEFAULT_AUDIENCE: &str = "all";

/// Notification template stored in the `notificationTemplates` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTemplate {
    pub name: String,
    pub title: String,
    pub message: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    /// Placeholder names substituted into title/message
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Template together with its document id.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateEntry {
    pub id: String,
    #[serde(flatten)]
    pub template: NotificationTemplate,
}

/// Planned delivery of a template, stored in `notificationSchedules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSchedule {
    pub template_id: String,
    pub scheduled_time: String,
    /// Free-form recurrence rule; `null` for one-shot schedules
    pub recurring_pattern: Option<String>,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    #[serde(default)]
    pub target_ids: Vec<String>,
    /// Values for the template's placeholders
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: String,
    pub next_send: String,
}

/// Schedule together with its document id.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub id: String,
    #[serde(flatten)]
    pub schedule: NotificationSchedule,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_audience() -> String {
    DEFAULT_AUDIENCE.to_string()
}

fn default_active() -> bool {
    true
}
