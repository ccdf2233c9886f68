// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance log model for storage and API.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHECK_IN_METHOD: &str = "manual";
pub const QR_CHECK_IN_METHOD: &str = "qr";

/// Attendance record stored in the `attendance_logs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub member_id: String,
    pub meeting_id: String,
    /// Check-in time (RFC3339)
    pub check_in_timestamp: String,
    /// Check-out time, null until checkout
    #[serde(default)]
    pub check_out_timestamp: Option<String>,
    #[serde(default = "default_check_in_method")]
    pub check_in_method: String,
    #[serde(default)]
    pub note: String,
    /// uid of the user who recorded the check-in
    #[serde(default)]
    pub recorded_by: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Minutes late relative to the meeting start (QR check-ins)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lateness: Option<i64>,
}

fn default_check_in_method() -> String {
    DEFAULT_CHECK_IN_METHOD.to_string()
}

/// Meeting document, read for lateness calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    /// Scheduled start (RFC3339)
    pub start_time: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Payload encoded in a member's check-in QR code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub meeting_id: Option<String>,
    /// Generation time, milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
}
