// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification templates, schedules, and push delivery.

use axum::http::StatusCode;
use khedma::db::collections;
use khedma::models::Role;
use khedma::services::Audience;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, empty_request, json_request};

#[tokio::test]
async fn test_create_template_applies_defaults() {
    let app = create_test_app();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/notifications/templates",
            json!({"name": "Reminder", "title": "Meeting tonight", "message": "See you at 7"}),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let template_id = body["templateId"].as_str().unwrap();
    assert_eq!(body["template"]["id"], template_id);
    assert_eq!(body["template"]["category"], "custom");
    assert_eq!(body["template"]["targetAudience"], "all");
    assert_eq!(body["template"]["variables"], json!([]));
    assert_eq!(body["template"]["createdBy"], "admin-1");
    assert_eq!(body["template"]["isActive"], true);

    let stored = app
        .db()
        .get_document(collections::NOTIFICATION_TEMPLATES, template_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["name"], "Reminder");
    assert!(stored.get("id").is_none());
}

#[tokio::test]
async fn test_create_template_requires_fields() {
    let app = create_test_app();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    for body in [
        json!({"title": "t", "message": "m"}),
        json!({"name": "n", "message": "m"}),
        json!({"name": "n", "title": "t", "message": ""}),
    ] {
        let response = app
            .router()
            .oneshot(json_request(
                "POST",
                "/api/notifications/templates",
                body.clone(),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
    assert!(app.store.is_empty(collections::NOTIFICATION_TEMPLATES));
}

#[tokio::test]
async fn test_list_templates_newest_first() {
    let app = create_test_app();
    for (id, name, created_at) in [
        ("t-old", "Old", "2025-01-01T00:00:00.000Z"),
        ("t-new", "New", "2025-06-01T00:00:00.000Z"),
    ] {
        app.db()
            .set(
                collections::NOTIFICATION_TEMPLATES,
                id,
                &json!({"name": name, "title": "t", "message": "m", "createdAt": created_at}),
            )
            .await
            .unwrap();
    }
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(empty_request(
            "GET",
            "/api/notifications/templates",
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let templates = body["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0]["id"], "t-new");
    assert_eq!(templates[1]["id"], "t-old");
    assert_eq!(templates[1]["name"], "Old");
}

#[tokio::test]
async fn test_list_templates_tolerates_legacy_documents() {
    let app = create_test_app();
    app.db()
        .set(
            collections::NOTIFICATION_TEMPLATES,
            "t-legacy",
            &json!({"title": "Old style", "body": "no name field", "createdAt": "2024-01-01T00:00:00.000Z"}),
        )
        .await
        .unwrap();
    app.db()
        .set(
            collections::NOTIFICATION_TEMPLATES,
            "t-new",
            &json!({"name": "New", "title": "t", "message": "m", "createdAt": "2025-06-01T00:00:00.000Z"}),
        )
        .await
        .unwrap();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(empty_request(
            "GET",
            "/api/notifications/templates",
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let templates = body["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0]["id"], "t-new");
    assert_eq!(templates[1]["id"], "t-legacy");
    assert_eq!(templates[1]["title"], "Old style");
}

async fn seed_template(app: &common::TestApp, id: &str) {
    app.db()
        .set(
            collections::NOTIFICATION_TEMPLATES,
            id,
            &json!({"name": "Reminder", "title": "t", "message": "m", "createdAt": "2025-01-01T00:00:00.000Z"}),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_schedule_applies_defaults() {
    let app = create_test_app();
    seed_template(&app, "t1").await;
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/notifications/schedules",
            json!({"templateId": "t1", "scheduledTime": "2025-09-05T19:00:00+02:00"}),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let schedule_id = body["scheduleId"].as_str().unwrap();
    let schedule = &body["schedule"];
    assert_eq!(schedule["id"], schedule_id);
    assert_eq!(schedule["scheduledTime"], "2025-09-05T17:00:00.000Z");
    assert_eq!(schedule["nextSend"], "2025-09-05T17:00:00.000Z");
    assert_eq!(schedule["recurringPattern"], json!(null));
    assert_eq!(schedule["targetAudience"], "all");
    assert_eq!(schedule["targetIds"], json!([]));
    assert_eq!(schedule["variables"], json!({}));
    assert_eq!(schedule["isActive"], true);
    assert_eq!(schedule["createdBy"], "admin-1");

    assert!(app
        .db()
        .exists(collections::NOTIFICATION_SCHEDULES, schedule_id)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_create_schedule_validation() {
    let app = create_test_app();
    seed_template(&app, "t1").await;
    let cookie = app.session_cookie("admin-1", Role::Admin);

    for (body, expected) in [
        (json!({"scheduledTime": "2025-09-05T19:00:00Z"}), StatusCode::BAD_REQUEST),
        (json!({"templateId": "t1"}), StatusCode::BAD_REQUEST),
        (
            json!({"templateId": "t1", "scheduledTime": "next friday"}),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({"templateId": "ghost", "scheduledTime": "2025-09-05T19:00:00Z"}),
            StatusCode::NOT_FOUND,
        ),
    ] {
        let response = app
            .router()
            .oneshot(json_request(
                "POST",
                "/api/notifications/schedules",
                body.clone(),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "{body}");
    }

    assert!(app.store.is_empty(collections::NOTIFICATION_SCHEDULES));
}

#[tokio::test]
async fn test_list_schedules_soonest_first() {
    let app = create_test_app();
    seed_template(&app, "t1").await;
    let cookie = app.session_cookie("admin-1", Role::Admin);

    for scheduled in ["2025-12-01T18:00:00Z", "2025-10-01T18:00:00Z"] {
        let response = app
            .router()
            .oneshot(json_request(
                "POST",
                "/api/notifications/schedules",
                json!({"templateId": "t1", "scheduledTime": scheduled, "recurringPattern": "weekly"}),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .router()
        .oneshot(empty_request(
            "GET",
            "/api/notifications/schedules",
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let schedules = body["schedules"].as_array().unwrap();
    assert_eq!(schedules.len(), 2);
    assert_eq!(schedules[0]["scheduledTime"], "2025-10-01T18:00:00.000Z");
    assert_eq!(schedules[1]["scheduledTime"], "2025-12-01T18:00:00.000Z");
    assert_eq!(schedules[0]["recurringPattern"], "weekly");
    assert!(schedules.iter().all(|s| s["id"].is_string()));
}

#[tokio::test]
async fn test_schedules_are_admin_only() {
    let app = create_test_app();
    let cookie = app.session_cookie("u1", Role::Member);

    let response = app
        .router()
        .oneshot(empty_request(
            "GET",
            "/api/notifications/schedules",
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_templates_are_admin_only() {
    let app = create_test_app();
    let cookie = app.session_cookie("u1", Role::Member);

    let response = app
        .router()
        .oneshot(empty_request(
            "GET",
            "/api/notifications/templates",
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_send_to_individuals() {
    let app = create_test_app();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/notifications/send",
            json!({
                "title": "Pickup",
                "message": "Bus leaves at 5",
                "targetAudience": "individuals",
                "targetIds": ["u1", "u2"],
            }),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Pickup");
    assert_eq!(
        sent[0].audience,
        Audience::Individuals(vec!["u1".to_string(), "u2".to_string()])
    );
}

#[tokio::test]
async fn test_send_validation() {
    let app = create_test_app();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    for body in [
        json!({"message": "m"}),
        json!({"title": "t", "message": "m", "targetAudience": "individuals"}),
        json!({"title": "t", "message": "m", "targetAudience": "parents"}),
    ] {
        let response = app
            .router()
            .oneshot(json_request(
                "POST",
                "/api/notifications/send",
                body.clone(),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
    assert!(app.push.sent().is_empty());
}

#[tokio::test]
async fn test_send_provider_failure_is_bad_gateway() {
    let app = common::create_test_app_with_failing_push();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/notifications/send",
            json!({"title": "t", "message": "m"}),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "push_error");
}
