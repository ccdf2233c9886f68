// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Member directory: listing, profile lookup by raw or obfuscated id,
//! registration, profile edits, and QR badge data.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::{self, collections, Document};
use crate::error::{AppError, Result};
use crate::ids::{deobfuscate_id, obfuscate_id};
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/members", get(list_members))
        .route("/api/members/add", post(add_member))
        .route("/api/members/{id}", get(get_member))
        .route("/api/members/{id}/update", put(update_member))
        .route("/api/members/{id}/qr", get(member_qr))
}

/// Document body with its id folded in.
fn with_id(id: String, mut doc: Document) -> Document {
    doc.insert("id".to_string(), Value::String(id));
    doc
}

/// Strip keys a client may not write directly.
fn writable_fields(mut body: Document) -> Document {
    body.remove("id");
    body.remove("createdAt");
    body
}

fn non_empty_str<'a>(body: &'a Document, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|v| !v.trim().is_empty())
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    id: Option<String>,
}

/// Every member, or the one named by `?id=`.
async fn list_members(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>> {
    if let Some(id) = params.id.filter(|id| !id.is_empty()) {
        let member = state
            .db
            .get_document(collections::MEMBERS, &id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("member {id}")))?;
        return Ok(Json(Value::Object(with_id(id, member))));
    }

    let members: Vec<Value> = state
        .db
        .query::<Document>(collections::MEMBERS, &db::Query::new())
        .await?
        .into_iter()
        .map(|(id, doc)| Value::Object(with_id(id, doc)))
        .collect();

    Ok(Json(Value::Array(members)))
}

async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>> {
    let (member_id, mut member) = match state.db.get_document(collections::MEMBERS, &id).await? {
        Some(doc) => (id, doc),
        None => {
            let decoded = deobfuscate_id(&id);
            if decoded == id {
                return Err(AppError::NotFound(format!("member {id}")));
            }
            let doc = state
                .db
                .get_document(collections::MEMBERS, &decoded)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("member {id}")))?;
            (decoded, doc)
        }
    };

    member.insert("publicId".to_string(), Value::String(obfuscate_id(&member_id)));
    member.insert("id".to_string(), Value::String(member_id));
    Ok(Json(member))
}

/// Register a member. Any extra profile fields are stored as sent.
async fn add_member(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Document>,
) -> Result<Json<Document>> {
    if non_empty_str(&body, "fullName").is_none() || non_empty_str(&body, "phonePrimary").is_none()
    {
        return Err(AppError::BadRequest(
            "Full name and primary phone are required".to_string(),
        ));
    }

    let now = now_rfc3339();
    let mut member = writable_fields(body);
    member.insert("createdAt".to_string(), json!(now));
    member.insert("updatedAt".to_string(), json!(now));

    let id = state.db.create(collections::MEMBERS, &member).await?;

    tracing::info!(member_id = %id, "Member added");

    Ok(Json(with_id(id, member)))
}

/// Apply a partial profile edit and return the stored result.
async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Document>,
) -> Result<Json<Document>> {
    let mut fields = writable_fields(body);
    fields.insert("updatedAt".to_string(), json!(now_rfc3339()));

    state
        .db
        .update(collections::MEMBERS, &id, fields)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound(format!("member {id}")),
            other => other,
        })?;

    let member = state
        .db
        .get_document(collections::MEMBERS, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("member {id}")))?;

    tracing::info!(member_id = %id, "Member updated");

    Ok(Json(with_id(id, member)))
}

/// What a member's QR badge encodes.
#[derive(Serialize)]
pub struct MemberQr {
    pub id: String,
    pub name: Value,
    pub phone: Value,
}

async fn member_qr(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MemberQr>> {
    let member = state
        .db
        .get_document(collections::MEMBERS, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("member {id}")))?;

    Ok(Json(MemberQr {
        name: member.get("fullName").cloned().unwrap_or(Value::Null),
        phone: member.get("phonePrimary").cloned().unwrap_or(Value::Null),
        id,
    }))
}
