// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment, so a
//! single `from_env` pass covers both local development and production.

use std::env;

/// Session cookie lifetime: 5 days.
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 5;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "__session";

/// WebAuthn challenge lifetime (also the nominal ceremony timeout).
pub const WEBAUTHN_CHALLENGE_TTL_MS: i64 = 60_000;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (CORS origin, cookie `Secure` decision)
    pub frontend_url: String,
    /// Firebase / GCP project ID
    pub project_id: String,
    /// Relying party ID for WebAuthn ceremonies
    pub webauthn_rp_id: String,
    /// OneSignal application ID
    pub onesignal_app_id: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// HS256 key used to sign session cookies (raw bytes)
    pub session_signing_key: Vec<u8>,
    /// OneSignal REST API key
    pub onesignal_api_key: String,
}

impl Config {
    /// Config for tests. Never reads the environment.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            project_id: "test-project".to_string(),
            webauthn_rp_id: "localhost".to_string(),
            onesignal_app_id: "test-onesignal-app".to_string(),
            port: 8080,
            session_signing_key: b"test_session_key_32_bytes_min!!!".to_vec(),
            onesignal_api_key: "test-onesignal-key".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let project_id = env::var("FIREBASE_PROJECT_ID")
            .or_else(|_| env::var("GCP_PROJECT_ID"))
            .unwrap_or_else(|_| "local-dev".to_string());

        let session_signing_key = env::var("SESSION_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if session_signing_key.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SIGNING_KEY",
                "must be at least 32 bytes".to_string(),
            ));
        }

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", format!("not a port number: {raw}")))?,
            Err(_) => 8080,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            project_id,
            webauthn_rp_id: env::var("WEBAUTHN_RP_ID").unwrap_or_else(|_| "localhost".to_string()),
            onesignal_app_id: env::var("ONESIGNAL_APP_ID").unwrap_or_default(),
            port,
            session_signing_key,
            onesignal_api_key: env::var("ONESIGNAL_REST_API_KEY")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
        })
    }

    /// Cookies are marked `Secure` when the frontend is served over https.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
