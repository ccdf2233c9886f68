// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WebAuthn authentication challenge issuance.
//!
//! Builds `PublicKeyCredentialRequestOptions` (in the JSON shape browsers
//! expect from `navigator.credentials.get`) and persists the challenge so a
//! later assertion can be checked against it.

use crate::config::WEBAUTHN_CHALLENGE_TTL_MS;
use crate::db::{collections, Database};
use crate::error::Result;
use crate::ids::{random_bytes, random_hex};
use crate::models::{AuthChallenge, StoredCredential, WebauthnUser};
use crate::time_utils::format_utc_rfc3339;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;

const CHALLENGE_BYTES: usize = 32;
const ANONYMOUS_SUFFIX_BYTES: usize = 8;
const PUBLIC_KEY_TYPE: &str = "public-key";

/// Entry in `allowCredentials`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

/// Request options handed to the browser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String,
    pub timeout: i64,
    pub rp_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<CredentialDescriptor>>,
    pub user_verification: &'static str,
}

/// Options plus the key under which the challenge was stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedChallenge {
    #[serde(flatten)]
    pub options: AuthenticationOptions,
    pub challenge_id: String,
}

/// 32 random bytes, base64url without padding.
pub fn generate_challenge() -> anyhow::Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes(CHALLENGE_BYTES)?))
}

/// Storage key for a challenge: the user id, or a unique anonymous key.
pub fn challenge_id(user_id: Option<&str>, now_ms: i64) -> anyhow::Result<String> {
    match user_id {
        Some(uid) => Ok(uid.to_string()),
        None => Ok(format!(
            "anonymous-{}-{}",
            now_ms,
            random_hex(ANONYMOUS_SUFFIX_BYTES)?
        )),
    }
}

/// Stored credentials (with their transports) followed by caller-supplied ids.
pub fn build_allow_list(
    stored: &[StoredCredential],
    extra_ids: &[String],
) -> Vec<CredentialDescriptor> {
    stored
        .iter()
        .map(|cred| CredentialDescriptor {
            id: cred.credential_id.clone(),
            type_: PUBLIC_KEY_TYPE,
            transports: Some(cred.transports.clone()),
        })
        .chain(extra_ids.iter().map(|id| CredentialDescriptor {
            id: id.clone(),
            type_: PUBLIC_KEY_TYPE,
            transports: None,
        }))
        .collect()
}

/// Issue and persist an authentication challenge.
pub async fn begin_authentication(
    db: &Database,
    rp_id: &str,
    user_id: Option<&str>,
    extra_ids: &[String],
) -> Result<IssuedChallenge> {
    let stored = match user_id {
        Some(uid) => db
            .get::<WebauthnUser>(collections::WEBAUTHN_USERS, uid)
            .await?
            .unwrap_or_default()
            .credentials,
        None => Vec::new(),
    };

    let allow_list = build_allow_list(&stored, extra_ids);
    let options = AuthenticationOptions {
        challenge: generate_challenge()?,
        timeout: WEBAUTHN_CHALLENGE_TTL_MS,
        rp_id: rp_id.to_string(),
        allow_credentials: (!allow_list.is_empty()).then_some(allow_list),
        user_verification: "preferred",
    };

    let now = chrono::Utc::now();
    let challenge_id = challenge_id(user_id, now.timestamp_millis())?;
    let record = AuthChallenge {
        challenge: options.challenge.clone(),
        user_id: user_id.map(str::to_string),
        created_at: format_utc_rfc3339(now),
        expires_at: format_utc_rfc3339(
            now + chrono::Duration::milliseconds(WEBAUTHN_CHALLENGE_TTL_MS),
        ),
    };
    db.set(collections::WEBAUTHN_AUTH_CHALLENGES, &challenge_id, &record)
        .await?;

    tracing::debug!(
        challenge_id = %challenge_id,
        allowed = options.allow_credentials.as_ref().map_or(0, Vec::len),
        "Issued WebAuthn authentication challenge"
    );

    Ok(IssuedChallenge {
        options,
        challenge_id,
    })
}
