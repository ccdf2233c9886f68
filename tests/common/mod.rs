// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use khedma::config::Config;
use khedma::db::{Database, FirestoreStore, MemoryStore};
use khedma::middleware::auth::create_session_token;
use khedma::models::Role;
use khedma::routes::create_router;
use khedma::services::{InMemoryIdentityProvider, RecordingPushSender};
use khedma::AppState;
use serde_json::Value;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a database backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    let store = FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator");
    Database::new(Arc::new(store))
}

/// Router plus handles on every in-memory port behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub push: Arc<RecordingPushSender>,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Fresh router sharing this app's state.
    #[allow(dead_code)]
    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    /// `Cookie` header value carrying a session for `uid`.
    #[allow(dead_code)]
    pub fn session_cookie(&self, uid: &str, role: Role) -> String {
        let (token, _) = create_session_token(
            uid,
            None,
            role,
            &self.state.config.session_signing_key,
        )
        .unwrap();
        format!("__session={token}")
    }

    #[allow(dead_code)]
    pub fn db(&self) -> &Database {
        &self.state.db
    }
}

/// Create a test app with in-memory ports.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    build_test_app(Config::test_default(), Arc::new(RecordingPushSender::new()))
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> TestApp {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    build_test_app(config, Arc::new(RecordingPushSender::new()))
}

/// Test app whose push sender rejects every delivery.
#[allow(dead_code)]
pub fn create_test_app_with_failing_push() -> TestApp {
    build_test_app(Config::test_default(), Arc::new(RecordingPushSender::failing()))
}

#[allow(dead_code)]
fn build_test_app(config: Config, push: Arc<RecordingPushSender>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let db = Database::new(store.clone());
    let state = Arc::new(AppState::new(config, db, identity.clone(), push.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        identity,
        push,
        store,
    }
}

/// JSON request, optionally with a `Cookie` header.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Body-less request, optionally with a `Cookie` header.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
