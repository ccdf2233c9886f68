// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Khedma API Server
//!
//! Youth-group community backend: sessions, roles, attendance, notifications.

use khedma::{
    config::Config,
    db::{Database, FirestoreStore},
    services::{FirebaseAuth, OneSignalSender},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Khedma API");

    // Initialize Firestore database
    let store = FirestoreStore::new(&config.project_id).await?;
    let db = Database::new(Arc::new(store));

    // Initialize Firebase Auth (token verification + custom claims)
    let identity = Arc::new(FirebaseAuth::new(&config.project_id).await?);

    // Initialize push delivery
    let push = Arc::new(OneSignalSender::new(
        &config.onesignal_app_id,
        &config.onesignal_api_key,
    )?);
    if config.onesignal_app_id.is_empty() {
        tracing::warn!("ONESIGNAL_APP_ID not set, push delivery will fail");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, identity, push));

    // Build router
    let app = khedma::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("khedma=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
