// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role resolution, role assignment, and permissions over HTTP.

use axum::http::StatusCode;
use khedma::db::collections;
use khedma::models::Role;
use khedma::services::IdentityProvider;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, empty_request, json_request};

const ROLE_ENDPOINTS: [&str; 4] = [
    "/api/admin/check-role",
    "/api/admin/check-role-safe",
    "/api/admin/check-role-simple",
    "/api/member/check-role",
];

#[tokio::test]
async fn test_unknown_uid_is_member_on_every_endpoint() {
    let app = create_test_app();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    for endpoint in ROLE_ENDPOINTS {
        let response = app
            .router()
            .oneshot(empty_request(
                "GET",
                &format!("{endpoint}?uid=nobody"),
                Some(&cookie),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{endpoint}");
        let body = body_json(response).await;
        assert_eq!(body["role"], "member", "{endpoint}");
        assert_eq!(body["source"], "default", "{endpoint}");
        assert!(body["profile"].is_null(), "{endpoint}");
    }
}

#[tokio::test]
async fn test_every_endpoint_agrees_on_admin() {
    let app = create_test_app();
    app.db()
        .set(collections::ADMINS, "a1", &json!({"name": "Mariam"}))
        .await
        .unwrap();
    let cookie = app.session_cookie("a1", Role::Admin);

    for endpoint in ROLE_ENDPOINTS {
        let response = app
            .router()
            .oneshot(empty_request(
                "GET",
                &format!("{endpoint}?uid=a1"),
                Some(&cookie),
            ))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["role"], "admin", "{endpoint}");
        assert_eq!(body["source"], "admins", "{endpoint}");
        assert_eq!(body["profile"]["name"], "Mariam", "{endpoint}");
    }
}

#[tokio::test]
async fn test_missing_uid_is_bad_request() {
    let app = create_test_app();
    let cookie = app.session_cookie("u1", Role::Member);

    let response = app
        .router()
        .oneshot(empty_request("GET", "/api/member/check-role", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_member_cannot_look_up_others() {
    let app = create_test_app();
    let cookie = app.session_cookie("u1", Role::Member);

    let own = app
        .router()
        .oneshot(empty_request(
            "GET",
            "/api/member/check-role?uid=u1",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);

    let other = app
        .router()
        .oneshot(empty_request(
            "GET",
            "/api/member/check-role?uid=u2",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_check_role_requires_authentication() {
    let app = create_test_app();

    for path in [
        "/api/admin/check-role",
        "/api/admin/check-role-safe",
        "/api/admin/check-role-simple",
        "/api/member/check-role",
    ] {
        let response = app
            .router()
            .oneshot(empty_request("GET", &format!("{path}?uid=u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn test_set_user_role_updates_claim_and_users_doc() {
    let app = create_test_app();
    app.identity.add_user("u1", None);
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/admin/set-user-role",
            json!({"uid": "u1", "role": "admin"}),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.identity.custom_role("u1").await.unwrap(),
        Some(Role::Admin)
    );
    let user = app
        .db()
        .get_document(collections::USERS, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user["role"], "admin");
    assert!(user["updatedAt"].is_string());
}

#[tokio::test]
async fn test_set_user_role_validation() {
    let app = create_test_app();
    app.identity.add_user("u1", None);
    let cookie = app.session_cookie("admin-1", Role::Admin);

    for body in [
        json!({"uid": "u1", "role": "owner"}),
        json!({"uid": "", "role": "admin"}),
        json!({"role": "admin"}),
    ] {
        let response = app
            .router()
            .oneshot(json_request(
                "POST",
                "/api/admin/set-user-role",
                body.clone(),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
    assert!(app.store.is_empty(collections::USERS));
}

#[tokio::test]
async fn test_set_user_role_unknown_user_is_not_found() {
    let app = create_test_app();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/admin/set-user-role",
            json!({"uid": "ghost", "role": "member"}),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_user_role_is_admin_only() {
    let app = create_test_app();
    app.identity.add_user("u1", None);
    let cookie = app.session_cookie("u1", Role::Member);

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/admin/set-user-role",
            json!({"uid": "u1", "role": "admin"}),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.identity.custom_role("u1").await.unwrap(), None);
}

#[tokio::test]
async fn test_permissions_follow_resolved_role() {
    let app = create_test_app();
    app.db()
        .set(collections::USERS, "u1", &json!({"role": "admin"}))
        .await
        .unwrap();

    // Session still says member; permissions use the resolved role.
    let cookie = app.session_cookie("u1", Role::Member);
    let response = app
        .router()
        .oneshot(empty_request("GET", "/api/user/permissions", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["permissions"]["role"], "admin");
    assert_eq!(body["permissions"]["canExportData"], true);
    assert_eq!(body["permissions"]["canEditProfile"], true);

    let cookie = app.session_cookie("u2", Role::Member);
    let body = body_json(
        app.router()
            .oneshot(empty_request("GET", "/api/user/permissions", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["permissions"]["role"], "member");
    assert_eq!(body["permissions"]["canManageMembers"], false);
    assert_eq!(body["permissions"]["canEditProfile"], true);
}
