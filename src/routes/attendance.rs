// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance check-in, check-out, QR scanning, and export.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::{self, collections, Direction, Document};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::attendance::{DEFAULT_CHECK_IN_METHOD, QR_CHECK_IN_METHOD};
use crate::models::{AttendanceRecord, Meeting, QrPayload};
use crate::routes::SuccessResponse;
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339};
use crate::AppState;

/// Maximum age of a scanned QR code.
const QR_MAX_AGE_MS: i64 = 5 * 60 * 1000;

pub fn member_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/attendance/record", post(record_attendance))
        .route("/api/attendance/checkout", post(checkout))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/attendance/qr-scan", post(qr_scan))
        .route("/api/attendance/export", get(export_attendance))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    #[serde(default)]
    member_id: Option<String>,
    #[serde(default)]
    meeting_id: Option<String>,
    #[serde(default)]
    check_in_method: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub success: bool,
    pub attendance_id: String,
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
}

async fn record_attendance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RecordRequest>,
) -> Result<Json<RecordResponse>> {
    let member_id = required(body.member_id, "memberId")?;
    let meeting_id = required(body.meeting_id, "meetingId")?;

    let now = format_utc_rfc3339(Utc::now());
    let record = AttendanceRecord {
        member_id,
        meeting_id,
        check_in_timestamp: now.clone(),
        check_out_timestamp: None,
        check_in_method: body
            .check_in_method
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_CHECK_IN_METHOD.to_string()),
        note: body.note.unwrap_or_default(),
        recorded_by: Some(user.uid.clone()),
        created_at: now,
        updated_at: None,
        lateness: None,
    };

    let attendance_id = state
        .db
        .create(collections::ATTENDANCE_LOGS, &record)
        .await?;

    tracing::info!(
        attendance_id = %attendance_id,
        member_id = %record.member_id,
        meeting_id = %record.meeting_id,
        recorded_by = %user.uid,
        "Attendance recorded"
    );

    Ok(Json(RecordResponse {
        success: true,
        attendance_id,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    attendance_id: Option<String>,
}

/// Stamp the check-out time. Repeating it overwrites the earlier stamp.
async fn checkout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<SuccessResponse>> {
    let attendance_id = required(body.attendance_id, "attendanceId")?;

    let now = format_utc_rfc3339(Utc::now());
    let mut fields = Document::new();
    fields.insert("checkOutTimestamp".to_string(), json!(now));
    fields.insert("updatedAt".to_string(), json!(now));

    state
        .db
        .update(collections::ATTENDANCE_LOGS, &attendance_id, fields)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => {
                AppError::NotFound(format!("attendance record {attendance_id}"))
            }
            other => other,
        })?;

    tracing::info!(attendance_id = %attendance_id, "Attendance checked out");

    Ok(SuccessResponse::ok())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrScanRequest {
    #[serde(default)]
    qr_data: Option<String>,
    #[serde(default)]
    meeting_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrScanResponse {
    pub success: bool,
    pub log_id: String,
    pub member: Document,
    pub lateness: i64,
}

/// Check a member in from the payload of their QR code.
async fn qr_scan(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<QrScanRequest>,
) -> Result<Json<QrScanResponse>> {
    let qr_data = required(body.qr_data, "qrData")?;
    let payload: QrPayload = serde_json::from_str(&qr_data)
        .map_err(|_| AppError::BadRequest("Invalid QR code format".to_string()))?;

    let now = Utc::now();
    let (member_id, meeting_id) = validate_qr(payload, body.meeting_id.as_deref(), now)?;

    let member = state
        .db
        .get_document(collections::MEMBERS, &member_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("member {member_id}")))?;

    let existing = state
        .db
        .query::<Document>(
            collections::ATTENDANCE_LOGS,
            &db::Query::new()
                .eq("memberId", member_id.as_str())
                .eq("meetingId", meeting_id.as_str()),
        )
        .await?;
    if !existing.is_empty() {
        return Err(AppError::BadRequest("Member already checked in".to_string()));
    }

    let meeting: Meeting = state
        .db
        .get(collections::MEETINGS, &meeting_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("meeting {meeting_id}")))?;
    let start = parse_rfc3339(&meeting.start_time).ok_or_else(|| {
        AppError::Database(format!("meeting {meeting_id} has malformed startTime"))
    })?;
    let lateness = lateness_minutes(start, now);

    let stamp = format_utc_rfc3339(now);
    let record = AttendanceRecord {
        member_id: member_id.clone(),
        meeting_id: meeting_id.clone(),
        check_in_timestamp: stamp.clone(),
        check_out_timestamp: None,
        check_in_method: QR_CHECK_IN_METHOD.to_string(),
        note: String::new(),
        recorded_by: Some(admin.uid.clone()),
        created_at: stamp,
        updated_at: None,
        lateness: Some(lateness),
    };
    let log_id = state
        .db
        .create(collections::ATTENDANCE_LOGS, &record)
        .await?;

    tracing::info!(
        log_id = %log_id,
        member_id = %member_id,
        meeting_id = %meeting_id,
        lateness,
        "QR check-in recorded"
    );

    Ok(Json(QrScanResponse {
        success: true,
        log_id,
        member,
        lateness,
    }))
}

/// Check a decoded QR payload against the meeting being scanned for.
/// Returns `(member_id, meeting_id)`.
fn validate_qr(
    payload: QrPayload,
    meeting_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(String, String)> {
    let invalid = || AppError::BadRequest("Invalid or expired QR code".to_string());

    let member_id = payload.member_id.filter(|m| !m.is_empty()).ok_or_else(invalid)?;
    let qr_meeting = payload.meeting_id.filter(|m| !m.is_empty()).ok_or_else(invalid)?;
    if meeting_id != Some(qr_meeting.as_str()) {
        return Err(invalid());
    }

    let generated_ms = payload.timestamp.ok_or_else(invalid)?;
    let age_ms = now.timestamp_millis().checked_sub(generated_ms);
    if age_ms.map_or(true, |age| age > QR_MAX_AGE_MS) {
        return Err(AppError::BadRequest("QR code expired".to_string()));
    }

    Ok((member_id, qr_meeting))
}

/// Whole minutes after `start`, never negative.
fn lateness_minutes(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_minutes().max(0)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total_records: usize,
    pub date_range: DateRange,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub attendance_logs: Vec<Document>,
    pub members: Vec<Document>,
    pub meetings: Vec<Document>,
    pub summary: ExportSummary,
}

/// Which end of a day a date-only bound stands for.
#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Parse an RFC3339 timestamp or a `YYYY-MM-DD` date into a stored-format
/// timestamp. Date-only end bounds cover the whole day.
fn parse_date_bound(raw: &str, bound: Bound) -> Option<String> {
    if let Some(ts) = parse_rfc3339(raw) {
        return Some(format_utc_rfc3339(ts));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = match bound {
        Bound::Start => date.and_hms_milli_opt(0, 0, 0, 0)?,
        Bound::End => date.and_hms_milli_opt(23, 59, 59, 999)?,
    };
    Some(format_utc_rfc3339(time.and_utc()))
}

fn with_id(id: String, mut doc: Document) -> Document {
    doc.insert("id".to_string(), Value::String(id));
    doc
}

async fn export_attendance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportQuery>,
) -> Result<Json<ExportResponse>> {
    let mut query =
        db::Query::new().order_by("checkInTimestamp", Direction::Descending);

    for (raw, bound, name) in [
        (&params.start_date, Bound::Start, "startDate"),
        (&params.end_date, Bound::End, "endDate"),
    ] {
        let Some(raw) = raw.as_deref().filter(|r| !r.is_empty()) else {
            continue;
        };
        let ts = parse_date_bound(raw, bound)
            .ok_or_else(|| AppError::BadRequest(format!("{name} is not a valid date")))?;
        query = match bound {
            Bound::Start => query.gte("checkInTimestamp", ts),
            Bound::End => query.lte("checkInTimestamp", ts),
        };
    }

    let attendance_logs: Vec<Document> = state
        .db
        .query::<Document>(collections::ATTENDANCE_LOGS, &query)
        .await?
        .into_iter()
        .map(|(id, doc)| with_id(id, doc))
        .collect();
    let members = state
        .db
        .query::<Document>(collections::MEMBERS, &db::Query::new())
        .await?
        .into_iter()
        .map(|(id, doc)| with_id(id, doc))
        .collect();
    let meetings = state
        .db
        .query::<Document>(collections::MEETINGS, &db::Query::new())
        .await?
        .into_iter()
        .map(|(id, doc)| with_id(id, doc))
        .collect();

    tracing::info!(records = attendance_logs.len(), "Attendance exported");

    Ok(Json(ExportResponse {
        summary: ExportSummary {
            total_records: attendance_logs.len(),
            date_range: DateRange {
                start_date: params.start_date,
                end_date: params.end_date,
            },
        },
        attendance_logs,
        members,
        meetings,
    }))
}
