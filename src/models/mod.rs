// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod attendance;
pub mod notification;
pub mod role;
pub mod webauthn;

pub use attendance::{AttendanceRecord, Meeting, QrPayload};
pub use notification::{NotificationSchedule, NotificationTemplate, ScheduleEntry, TemplateEntry};
pub use role::{Role, RoleSource};
pub use webauthn::{AuthChallenge, CredentialSummary, StoredCredential, WebauthnUser};
