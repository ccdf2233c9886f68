// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Khedma: backend for a youth-group community.
//!
//! Members, attendance logging, notification templates and push delivery,
//! and admin/member access control. Identity, documents and push are
//! external services reached through the ports in [`services`] and [`db`].

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{IdentityProvider, PushSender, RoleResolver};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub identity: Arc<dyn IdentityProvider>,
    pub push: Arc<dyn PushSender>,
    pub roles: RoleResolver,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Database,
        identity: Arc<dyn IdentityProvider>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        let roles = RoleResolver::new(identity.clone(), db.clone());
        Self {
            config,
            db,
            identity,
            push,
            roles,
        }
    }
}
