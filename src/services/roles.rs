// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role resolution.
//!
//! Precedence, applied everywhere a role is needed:
//! 1. identity provider custom claim (authoritative when present)
//! 2. `admins/{uid}` exists → admin
//! 3. `users/{uid}.role`
//! 4. `members/{uid}` exists → member
//! 5. member
//!
//! Steps 2-4 only matter for accounts whose claim has not been set yet.
//! Reads are independent, so they may observe different snapshots.

use crate::db::{collections, Database, Document};
use crate::error::Result;
use crate::models::{Role, RoleSource};
use crate::services::identity::IdentityProvider;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of resolving a uid's role.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleResolution {
    pub role: Role,
    pub source: RoleSource,
    /// Profile document backing the decision, if any.
    pub profile: Option<Document>,
}

#[derive(Clone)]
pub struct RoleResolver {
    identity: Arc<dyn IdentityProvider>,
    db: Database,
}

impl RoleResolver {
    pub fn new(identity: Arc<dyn IdentityProvider>, db: Database) -> Self {
        Self { identity, db }
    }

    /// Resolve a role, looking the custom claim up through the identity provider.
    pub async fn resolve(&self, uid: &str) -> Result<RoleResolution> {
        let claim = self.identity.custom_role(uid).await?;
        self.resolve_with_claim(uid, claim).await
    }

    /// Resolve a role when the caller already holds the claim (e.g. from a
    /// freshly verified token).
    pub async fn resolve_with_claim(
        &self,
        uid: &str,
        claim: Option<Role>,
    ) -> Result<RoleResolution> {
        if let Some(role) = claim {
            let profile_collection = match role {
                Role::Admin => collections::ADMINS,
                Role::Member => collections::MEMBERS,
            };
            let profile = self.db.get_document(profile_collection, uid).await?;
            return Ok(RoleResolution {
                role,
                source: RoleSource::Claim,
                profile,
            });
        }

        if let Some(profile) = self.db.get_document(collections::ADMINS, uid).await? {
            return Ok(RoleResolution {
                role: Role::Admin,
                source: RoleSource::Admins,
                profile: Some(profile),
            });
        }

        if let Some(user) = self.db.get_document(collections::USERS, uid).await? {
            let role = match user.get("role").and_then(Value::as_str) {
                Some("admin") => Role::Admin,
                _ => Role::Member,
            };
            return Ok(RoleResolution {
                role,
                source: RoleSource::Users,
                profile: Some(user),
            });
        }

        if let Some(profile) = self.db.get_document(collections::MEMBERS, uid).await? {
            return Ok(RoleResolution {
                role: Role::Member,
                source: RoleSource::Members,
                profile: Some(profile),
            });
        }

        tracing::debug!(uid, "No role source found, defaulting to member");
        Ok(RoleResolution {
            role: Role::Member,
            source: RoleSource::Default,
            profile: None,
        })
    }
}
