// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider port.
//!
//! Verifies client identity tokens and stores the per-user custom `role`
//! claim. Firebase Authentication implements it in production
//! ([`crate::services::FirebaseAuth`]); [`InMemoryIdentityProvider`] backs
//! tests and local runs.

use crate::error::AppError;
use crate::models::Role;
use async_trait::async_trait;
use dashmap::DashMap;

/// Identity extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    /// Custom `role` claim embedded in the token, if any.
    pub role_claim: Option<Role>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Token missing, malformed, expired, or signed by someone else.
    #[error("invalid identity token: {0}")]
    InvalidToken(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    /// Provider unreachable or returned garbage.
    #[error("identity provider unavailable: {0}")]
    Transient(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidToken(reason) => {
                tracing::debug!(reason = %reason, "Rejected identity token");
                AppError::InvalidToken
            }
            IdentityError::UserNotFound(uid) => AppError::NotFound(format!("user {uid}")),
            IdentityError::Transient(reason) => AppError::Identity(reason),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a client-issued identity token.
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError>;

    /// Custom role claim currently stored for `uid`.
    ///
    /// Unknown users and users without a (valid) role claim yield `None`.
    async fn custom_role(&self, uid: &str) -> Result<Option<Role>, IdentityError>;

    /// Replace the custom role claim for `uid`.
    async fn set_custom_role(&self, uid: &str, role: Role) -> Result<(), IdentityError>;
}

/// Identity provider holding tokens and claims in memory.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    tokens: DashMap<String, VerifiedIdentity>,
    users: DashMap<String, Option<Role>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and a token that verifies as them.
    ///
    /// The token's embedded claim is the user's role claim at issue time.
    pub fn issue_token(&self, token: &str, uid: &str, email: Option<&str>) {
        let role_claim = self.users.get(uid).and_then(|r| *r);
        self.users.entry(uid.to_string()).or_insert(None);
        self.tokens.insert(
            token.to_string(),
            VerifiedIdentity {
                uid: uid.to_string(),
                email: email.map(str::to_string),
                role_claim,
            },
        );
    }

    /// Register a user with a role claim, without issuing a token.
    pub fn add_user(&self, uid: &str, role: Option<Role>) {
        self.users.insert(uid.to_string(), role);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.tokens
            .get(id_token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| IdentityError::InvalidToken("unknown token".to_string()))
    }

    async fn custom_role(&self, uid: &str) -> Result<Option<Role>, IdentityError> {
        Ok(self.users.get(uid).and_then(|r| *r))
    }

    async fn set_custom_role(&self, uid: &str, role: Role) -> Result<(), IdentityError> {
        match self.users.get_mut(uid) {
            Some(mut entry) => {
                *entry = Some(role);
                Ok(())
            }
            None => Err(IdentityError::UserNotFound(uid.to_string())),
        }
    }
}
