// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WebAuthn credential and challenge documents.

use serde::{Deserialize, Serialize};

/// A registered authenticator, as stored under `webauthn_users/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    #[serde(rename = "credentialID")]
    pub credential_id: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub counter: Option<u64>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub backed_up: Option<bool>,
    #[serde(default)]
    pub transports: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_used: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Document in `webauthn_users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebauthnUser {
    #[serde(default)]
    pub credentials: Vec<StoredCredential>,
}

/// Credential view safe to return to clients (no key material, no counter).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    pub id: String,
    pub device_type: Option<String>,
    pub backed_up: Option<bool>,
    pub transports: Vec<String>,
    pub created_at: Option<String>,
    pub last_used: Option<String>,
    pub nickname: Option<String>,
}

impl From<StoredCredential> for CredentialSummary {
    fn from(cred: StoredCredential) -> Self {
        Self {
            id: cred.credential_id,
            device_type: cred.device_type,
            backed_up: cred.backed_up,
            transports: cred.transports,
            created_at: cred.created_at,
            last_used: cred.last_used,
            nickname: cred.nickname,
        }
    }
}

/// Pending authentication challenge in `webauthn_auth_challenges`.
///
/// Expired challenges are ignored by readers; nothing deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallenge {
    pub challenge: String,
    pub user_id: Option<String>,
    pub created_at: String,
    pub expires_at: String,
}
