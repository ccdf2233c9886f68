// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.
//!
//! A request is authenticated by either the `__session` cookie (an HS256 JWT
//! minted by `/api/auth/session`) or an `Authorization: Bearer` identity
//! token verified by the identity provider. The resulting [`AuthUser`] is
//! inserted into request extensions for handlers.

use crate::config::{SESSION_COOKIE_NAME, SESSION_MAX_AGE_SECS};
use crate::error::AppError;
use crate::models::Role;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionClaims {
    /// Subject (identity provider uid)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// The authenticated caller, passed to handlers by value.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub role: Role,
    /// Session expiry (Unix timestamp); `None` for bearer-token requests.
    pub expires_at: Option<usize>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<SessionClaims> for AuthUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
            role: claims.role,
            expires_at: Some(claims.exp),
        }
    }
}

/// Middleware that requires an authenticated caller.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        let claims = decode_session_token(cookie.value(), &state.config.session_signing_key)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected session cookie");
                AppError::Unauthorized
            })?;
        AuthUser::from(claims)
    } else {
        let token = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let identity = state.identity.verify_id_token(token).await?;
        AuthUser {
            uid: identity.uid,
            email: identity.email,
            role: identity.role_claim.unwrap_or_default(),
            expires_at: None,
        }
    };

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware that requires an admin. Must run after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::Unauthorized)?;

    if !user.is_admin() {
        tracing::warn!(uid = %user.uid, "Admin access denied");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

/// Mint a session token. Returns the token and its expiry timestamp.
pub fn create_session_token(
    uid: &str,
    email: Option<&str>,
    role: Role,
    signing_key: &[u8],
) -> anyhow::Result<(String, usize)> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = SessionClaims {
        sub: uid.to_string(),
        email: email.map(str::to_string),
        role,
        iat: now,
        exp: now + SESSION_MAX_AGE_SECS as usize,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?;
    Ok((token, claims.exp))
}

/// Verify a session token's signature and expiry.
pub fn decode_session_token(
    token: &str,
    signing_key: &[u8],
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<SessionClaims>(token, &key, &validation).map(|data| data.claims)
}
