// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication adapter for the [`IdentityProvider`] port.
//!
//! ID tokens are RS256 JWTs signed by the `securetoken` service account; the
//! public keys are fetched as JWKS and cached per `Cache-Control`. Custom
//! claims are read and written through the Identity Toolkit REST API using
//! the ambient Google credentials.

use crate::models::Role;
use crate::services::identity::{IdentityError, IdentityProvider, VerifiedIdentity};
use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const IDENTITY_TOOLKIT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/identitytoolkit",
];
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;
const MAX_UID_LEN: usize = 128;

#[derive(Clone)]
enum KeySource {
    Jwks,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Firebase Authentication client.
pub struct FirebaseAuth {
    http_client: reqwest::Client,
    project_id: String,
    key_source: KeySource,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
    token_generator: Option<gcloud_sdk::GoogleAuthTokenGenerator>,
}

impl FirebaseAuth {
    /// Create a production client: JWKS verification plus admin REST calls.
    pub async fn new(project_id: &str) -> anyhow::Result<Self> {
        let token_generator = gcloud_sdk::GoogleAuthTokenGenerator::new(
            gcloud_sdk::TokenSourceType::Default,
            IDENTITY_TOOLKIT_SCOPES.iter().map(|s| s.to_string()).collect(),
        )
        .await
        .context("failed initializing Google credentials for Identity Toolkit")?;

        tracing::info!(project = project_id, "Initialized Firebase Auth client");

        Ok(Self {
            http_client: build_http_client()?,
            project_id: project_id.to_string(),
            key_source: KeySource::Jwks,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            token_generator: Some(token_generator),
        })
    }

    /// Create a verifier with a static RSA public key and no admin access.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        project_id: &str,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key kid must not be empty");
        }

        Ok(Self {
            http_client: build_http_client()?,
            project_id: project_id.to_string(),
            key_source: KeySource::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            token_generator: None,
        })
    }

    fn expected_issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        if let KeySource::StaticKey {
            kid: static_kid,
            decoding_key,
        } = &self.key_source
        {
            if kid == static_kid {
                return Ok(decoding_key.clone());
            }
            return Err(IdentityError::InvalidToken(format!(
                "unknown JWT kid for static verifier: {kid}"
            )));
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::InvalidToken(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdentityError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = JWKS_URL, "Refreshing Firebase JWKS cache");

        let response = self
            .http_client
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_rsa_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(IdentityError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Firebase JWKS cache refreshed");
        Ok(())
    }

    async fn admin_authorization(&self) -> Result<String, IdentityError> {
        let generator = self.token_generator.as_ref().ok_or_else(|| {
            IdentityError::Transient("admin API not configured for this client".to_string())
        })?;
        let token = generator
            .create_token()
            .await
            .map_err(|e| IdentityError::Transient(format!("failed to obtain access token: {e}")))?;
        Ok(format!(
            "{} {}",
            token.token_type,
            token.token.as_sensitive_str()
        ))
    }

    async fn admin_call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, IdentityError> {
        let url = format!(
            "{}/projects/{}/accounts:{}",
            IDENTITY_TOOLKIT_URL, self.project_id, method
        );

        self.http_client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                self.admin_authorization().await?,
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("accounts:{method} failed: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        if id_token.is_empty() {
            return Err(IdentityError::InvalidToken("token is empty".to_string()));
        }

        let header = decode_header(id_token)
            .map_err(|e| IdentityError::InvalidToken(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::InvalidToken(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let issuer = self.expected_issuer();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<FirebaseIdTokenClaims>(id_token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::InvalidToken(format!("JWT validation failed: {e}")))?
            .claims;

        validate_time_claims(claims.iat, claims.auth_time)?;

        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(IdentityError::InvalidToken(
                "sub claim must be a non-empty uid of at most 128 characters".to_string(),
            ));
        }

        let role_claim = claims.role.as_deref().and_then(Role::parse);

        tracing::debug!(
            uid = %claims.sub,
            role = ?role_claim,
            "Verified Firebase ID token"
        );

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            role_claim,
        })
    }

    async fn custom_role(&self, uid: &str) -> Result<Option<Role>, IdentityError> {
        let response = self.admin_call("lookup", json!({ "localId": [uid] })).await?;

        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "accounts:lookup returned status {}",
                response.status()
            )));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid lookup JSON: {e}")))?;

        let Some(user) = lookup.users.into_iter().next() else {
            tracing::debug!(uid, "No identity record for uid");
            return Ok(None);
        };

        Ok(user
            .custom_attributes
            .as_deref()
            .and_then(role_from_custom_attributes))
    }

    async fn set_custom_role(&self, uid: &str, role: Role) -> Result<(), IdentityError> {
        let attributes = json!({ "role": role.as_str() }).to_string();
        let response = self
            .admin_call(
                "update",
                json!({ "localId": uid, "customAttributes": attributes }),
            )
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(uid, role = %role, "Updated custom role claim");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if body.contains("USER_NOT_FOUND") {
            return Err(IdentityError::UserNotFound(uid.to_string()));
        }

        Err(IdentityError::Transient(format!(
            "accounts:update returned status {status}"
        )))
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    sub: String,
    iat: Option<usize>,
    auth_time: Option<usize>,
    email: Option<String>,
    /// Custom claim set through the admin API.
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    /// JSON-encoded custom claims object.
    custom_attributes: Option<String>,
}

fn build_http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .context("failed building Firebase HTTP client")
}

fn usable_rsa_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }

        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }

        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn role_from_custom_attributes(raw: &str) -> Option<Role> {
    let claims: serde_json::Value = serde_json::from_str(raw).ok()?;
    claims.get("role")?.as_str().and_then(Role::parse)
}

fn validate_time_claims(iat: Option<usize>, auth_time: Option<usize>) -> Result<(), IdentityError> {
    let now = now_unix_secs();

    let Some(iat) = iat else {
        return Err(IdentityError::InvalidToken("missing iat claim".to_string()));
    };
    if iat as u64 > now + CLOCK_SKEW_SECS {
        return Err(IdentityError::InvalidToken(
            "iat claim is in the future".to_string(),
        ));
    }

    match auth_time {
        Some(t) if t as u64 <= now + CLOCK_SKEW_SECS => Ok(()),
        Some(_) => Err(IdentityError::InvalidToken(
            "auth_time claim is in the future".to_string(),
        )),
        None => Err(IdentityError::InvalidToken(
            "missing auth_time claim".to_string(),
        )),
    }
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
