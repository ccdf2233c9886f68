// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push notification port and its OneSignal adapter.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

const ONESIGNAL_NOTIFICATIONS_URL: &str = "https://onesignal.com/api/v1/notifications";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Who receives a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "ids")]
pub enum Audience {
    /// Every subscribed device
    All,
    /// Devices linked to the given external user ids
    Individuals(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub message: String,
    pub audience: Audience,
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push provider not configured")]
    NotConfigured,
    #[error("push provider request failed: {0}")]
    Request(String),
    #[error("push provider rejected notification: status {status}")]
    Rejected { status: u16, body: String },
}

impl From<PushError> for crate::error::AppError {
    fn from(err: PushError) -> Self {
        crate::error::AppError::Push(err.to_string())
    }
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver a message and return the provider's response body.
    async fn send(&self, message: &PushMessage) -> Result<Value, PushError>;
}

/// OneSignal REST API client.
pub struct OneSignalSender {
    http_client: reqwest::Client,
    app_id: String,
    api_key: String,
}

impl OneSignalSender {
    pub fn new(app_id: &str, api_key: &str) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            app_id: app_id.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request_body(&self, message: &PushMessage) -> Value {
        let mut body = json!({
            "app_id": self.app_id,
            "headings": { "en": message.title },
            "contents": { "en": message.message },
        });
        match &message.audience {
            Audience::All => body["included_segments"] = json!(["All"]),
            Audience::Individuals(ids) => body["include_external_user_ids"] = json!(ids),
        }
        body
    }
}

#[async_trait]
impl PushSender for OneSignalSender {
    async fn send(&self, message: &PushMessage) -> Result<Value, PushError> {
        if self.app_id.is_empty() || self.api_key.is_empty() {
            return Err(PushError::NotConfigured);
        }

        let response = self
            .http_client
            .post(ONESIGNAL_NOTIFICATIONS_URL)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", self.api_key),
            )
            .json(&self.request_body(message))
            .send()
            .await
            .map_err(|e| PushError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "OneSignal rejected notification");
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| PushError::Request(format!("invalid response JSON: {e}")))?;

        tracing::info!(
            notification_id = result.get("id").and_then(serde_json::Value::as_str).unwrap_or("<none>"),
            "Push notification sent"
        );
        Ok(result)
    }
}

/// Sender that records messages instead of delivering them.
#[derive(Default)]
pub struct RecordingPushSender {
    sent: Mutex<Vec<PushMessage>>,
    fail: bool,
}

impl RecordingPushSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender whose every delivery is rejected.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send(&self, message: &PushMessage) -> Result<Value, PushError> {
        if self.fail {
            return Err(PushError::Rejected {
                status: 503,
                body: "recording sender configured to fail".to_string(),
            });
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| PushError::Request("recorder lock poisoned".to_string()))?;
        sent.push(message.clone());
        Ok(json!({ "id": format!("recorded-{}", sent.len()), "recipients": 0 }))
    }
}
