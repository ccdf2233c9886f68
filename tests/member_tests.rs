// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Member directory: lookup, listing, registration, edits, and QR data.

use axum::http::StatusCode;
use khedma::db::collections;
use khedma::ids::obfuscate_id;
use khedma::models::Role;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, empty_request, json_request};

#[tokio::test]
async fn test_member_found_by_raw_and_obfuscated_id() {
    let app = create_test_app();
    app.db()
        .set(collections::MEMBERS, "m-42", &json!({"name": "Karim", "grade": 9}))
        .await
        .unwrap();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    for id in ["m-42".to_string(), obfuscate_id("m-42")] {
        let response = app
            .router()
            .oneshot(empty_request(
                "GET",
                &format!("/api/members/{id}"),
                Some(&cookie),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{id}");
        let body = body_json(response).await;
        assert_eq!(body["id"], "m-42");
        assert_eq!(body["publicId"], obfuscate_id("m-42"));
        assert_eq!(body["name"], "Karim");
    }
}

#[tokio::test]
async fn test_unknown_member_is_not_found() {
    let app = create_test_app();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    for id in ["nobody".to_string(), obfuscate_id("nobody")] {
        let response = app
            .router()
            .oneshot(empty_request(
                "GET",
                &format!("/api/members/{id}"),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{id}");
    }
}

#[tokio::test]
async fn test_member_lookup_is_admin_only() {
    let app = create_test_app();
    app.db()
        .set(collections::MEMBERS, "m1", &json!({"name": "Karim"}))
        .await
        .unwrap();
    let cookie = app.session_cookie("m1", Role::Member);

    let response = app
        .router()
        .oneshot(empty_request("GET", "/api/members/m1", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_members_includes_ids() {
    let app = create_test_app();
    for (id, name) in [("m1", "Karim"), ("m2", "Mina")] {
        app.db()
            .set(collections::MEMBERS, id, &json!({"fullName": name}))
            .await
            .unwrap();
    }
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(empty_request("GET", "/api/members", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let members = body.as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert!(members
        .iter()
        .any(|m| m["id"] == "m2" && m["fullName"] == "Mina"));

    let response = app
        .router()
        .oneshot(empty_request("GET", "/api/members?id=m1", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["fullName"], "Karim");

    let response = app
        .router()
        .oneshot(empty_request("GET", "/api/members?id=ghost", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_member_requires_name_and_phone() {
    let app = create_test_app();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/members/add",
            json!({"fullName": "Karim"}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.is_empty(collections::MEMBERS));

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/members/add",
            json!({"fullName": "Karim", "phonePrimary": "0100", "grade": 9}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let id = body["id"].as_str().unwrap();
    assert_eq!(body["grade"], 9);
    assert!(body["createdAt"].is_string());

    let stored = app
        .db()
        .get_document(collections::MEMBERS, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["fullName"], "Karim");
    assert!(stored.get("id").is_none());
}

#[tokio::test]
async fn test_update_member_keeps_other_fields() {
    let app = create_test_app();
    app.db()
        .set(
            collections::MEMBERS,
            "m1",
            &json!({"fullName": "Karim", "phonePrimary": "0100", "createdAt": "2025-01-01T00:00:00.000Z"}),
        )
        .await
        .unwrap();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(json_request(
            "PUT",
            "/api/members/m1/update",
            json!({"phonePrimary": "0199", "createdAt": "1999-01-01T00:00:00.000Z"}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], "m1");
    assert_eq!(body["fullName"], "Karim");
    assert_eq!(body["phonePrimary"], "0199");
    assert_eq!(body["createdAt"], "2025-01-01T00:00:00.000Z");
    assert!(body["updatedAt"].is_string());

    let response = app
        .router()
        .oneshot(json_request(
            "PUT",
            "/api/members/ghost/update",
            json!({"phonePrimary": "0199"}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!app.db().exists(collections::MEMBERS, "ghost").await.unwrap());
}

#[tokio::test]
async fn test_member_qr_carries_name_and_phone() {
    let app = create_test_app();
    app.db()
        .set(
            collections::MEMBERS,
            "m1",
            &json!({"fullName": "Karim", "phonePrimary": "0100", "grade": 9}),
        )
        .await
        .unwrap();
    let cookie = app.session_cookie("admin-1", Role::Admin);

    let response = app
        .router()
        .oneshot(empty_request("GET", "/api/members/m1/qr", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"id": "m1", "name": "Karim", "phone": "0100"})
    );

    let response = app
        .router()
        .oneshot(empty_request("GET", "/api/members/ghost/qr", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_management_is_admin_only() {
    let app = create_test_app();
    let cookie = app.session_cookie("m1", Role::Member);

    let requests = [
        empty_request("GET", "/api/members", Some(&cookie)),
        json_request(
            "POST",
            "/api/members/add",
            json!({"fullName": "Karim", "phonePrimary": "0100"}),
            Some(&cookie),
        ),
        json_request("PUT", "/api/members/m1/update", json!({}), Some(&cookie)),
        empty_request("GET", "/api/members/m1/qr", Some(&cookie)),
    ];
    for request in requests {
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
