// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore backend for the [`DocumentStore`] port.
//!
//! Documents are read and written as JSON maps. Firestore adds bookkeeping
//! fields (`_firestore_id` and friends) when deserializing; they are stripped
//! before documents leave this module.

use super::{Direction, Document, DocumentStore, Filter, Query};
use crate::error::AppError;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;

const FIRESTORE_ID_FIELD: &str = "_firestore_id";
const FIRESTORE_META_PREFIX: &str = "_firestore";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_offline() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn backend_tag(&self) -> &'static str {
        "firestore"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let doc: Option<Document> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(doc.map(strip_metadata))
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), AppError> {
        let _: Document = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), AppError> {
        let _: Document = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields.keys().map(|key| field_path(key)))
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(&fields)
            .execute()
            .await
            .map_err(|e| match e {
                FirestoreError::DataNotFoundError(_) => {
                    AppError::NotFound(format!("{collection}/{id}"))
                }
                other => AppError::Database(other.to_string()),
            })?;
        Ok(())
    }

    async fn merge_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), AppError> {
        let _: Document = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields.keys().map(|key| field_path(key)))
            .in_col(collection)
            .document_id(id)
            .object(&fields)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, Document)>, AppError> {
        let mut select = self.get_client()?.fluent().select().from(collection);

        if !query.filters.is_empty() {
            let filters = query.filters.clone();
            select = select.filter(move |q| {
                q.for_all(filters.iter().map(|filter| match filter {
                    Filter::Eq(field, value) => q.field(field.as_str()).eq(value.clone()),
                    Filter::Gte(field, value) => q
                        .field(field.as_str())
                        .greater_than_or_equal(value.clone()),
                    Filter::Lte(field, value) => {
                        q.field(field.as_str()).less_than_or_equal(value.clone())
                    }
                }))
            });
        }

        if let Some((field, direction)) = &query.order_by {
            let direction = match direction {
                Direction::Ascending => firestore::FirestoreQueryDirection::Ascending,
                Direction::Descending => firestore::FirestoreQueryDirection::Descending,
            };
            select = select.order_by([(field.as_str(), direction)]);
        }

        let docs: Vec<Document> = select
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        docs.into_iter()
            .map(|mut doc| {
                let id = doc
                    .get(FIRESTORE_ID_FIELD)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        AppError::Database(format!("query on {collection} returned a document without id"))
                    })?;
                doc = strip_metadata(doc);
                Ok((id, doc))
            })
            .collect()
    }
}

/// Top-level key as an update-mask field path. Keys that are not plain
/// identifiers are backquoted.
fn field_path(key: &str) -> String {
    let mut chars = key.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn strip_metadata(mut doc: Document) -> Document {
    doc.retain(|key, _| !key.starts_with(FIRESTORE_META_PREFIX));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_metadata_removes_bookkeeping_fields() {
        let doc = json!({
            "_firestore_id": "abc",
            "_firestore_created": "2025-01-01T00:00:00Z",
            "name": "Mina"
        })
        .as_object()
        .cloned()
        .unwrap();

        let stripped = strip_metadata(doc);
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped["name"], "Mina");
    }

    #[test]
    fn field_paths_quote_non_identifier_keys() {
        assert_eq!(field_path("checkOutTimestamp"), "checkOutTimestamp");
        assert_eq!(field_path("_private"), "_private");
        assert_eq!(field_path("phone-2"), "`phone-2`");
        assert_eq!(field_path("a.b"), "`a.b`");
        assert_eq!(field_path("2nd"), "`2nd`");
        assert_eq!(field_path("it`s"), "`it\\`s`");
    }

    #[tokio::test]
    async fn offline_store_reports_database_errors() {
        let store = FirestoreStore::new_offline();
        let err = store.get("users", "u1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let err = store
            .update_fields("users", "u1", Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
